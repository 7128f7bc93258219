//! Decoding, filtering and suppression of raw model output.
//!
//! The model emits fixed-length records, one per detection slot:
//! `cx, cy, w, h` in input-grid units, an objectness score, then one score
//! per class. Decoding maps the boxes back to native frame pixels; the
//! remaining steps narrow the candidates down to one for the click.

use serde::Serialize;

use super::classes::{NUM_CLASSES, class_name};
use super::error::DetectionError;
use crate::geometry::{BoundingBox, Point, Size};

/// Floats per output record: 4 box values, objectness, class scores.
pub const RECORD_LEN: usize = 5 + NUM_CLASSES;

/// Class reported for heuristic fallback detections.
pub const FALLBACK_CLASS: &str = "unknown";

/// An object proposal in native frame pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionCandidate {
    /// Class label
    pub class: String,
    /// Combined score (objectness x best class score)
    pub confidence: f32,
    /// Axis-aligned box
    pub bbox: BoundingBox,
    /// Box center
    pub center: Point,
    /// Box outline: top-left, top-right, bottom-right, bottom-left
    pub polygon: Vec<Point>,
}

impl DetectionCandidate {
    pub fn from_bbox(class: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class: class.into(),
            confidence,
            center: bbox.center(),
            polygon: bbox.to_quad(),
            bbox,
        }
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Decode raw model output into candidates in native frame pixels.
///
/// Records whose objectness or combined score is below `score_threshold` are
/// dropped. Trailing floats that do not form a complete record are ignored.
pub fn decode_predictions(
    output: &[f32],
    input_size: u32,
    frame: Size,
    score_threshold: f32,
) -> Vec<DetectionCandidate> {
    let trailing = output.len() % RECORD_LEN;
    if trailing != 0 {
        log::warn!(
            "Model output length {} is not a multiple of {}, ignoring {} trailing values",
            output.len(),
            RECORD_LEN,
            trailing
        );
    }

    let scale_x = frame.width / input_size as f32;
    let scale_y = frame.height / input_size as f32;

    let mut candidates = Vec::new();
    for record in output.chunks_exact(RECORD_LEN) {
        let objectness = record[4];
        if objectness < score_threshold {
            continue;
        }

        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for (class_id, class_score) in record[5..].iter().enumerate() {
            let score = class_score * objectness;
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if best_score < score_threshold {
            continue;
        }

        let Some(name) = class_name(best_class) else {
            continue;
        };

        let center = Point::new(record[0] * scale_x, record[1] * scale_y);
        let bbox = BoundingBox::from_center(center, record[2] * scale_x, record[3] * scale_y);
        candidates.push(DetectionCandidate::from_bbox(name, best_score, bbox));
    }

    log::debug!(
        "Decoded {} candidates from {} records",
        candidates.len(),
        output.len() / RECORD_LEN
    );
    candidates
}

// ============================================================================
// Filter / NMS
// ============================================================================

/// Keep allow-listed classes scoring at least `score_threshold`.
pub fn filter_classes(
    candidates: Vec<DetectionCandidate>,
    allowed: &[String],
    score_threshold: f32,
) -> Vec<DetectionCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.confidence >= score_threshold && allowed.iter().any(|a| a == &c.class))
        .collect()
}

/// Greedy non-maximum suppression.
///
/// Candidates are ranked by descending confidence (ties keep their input
/// order); a candidate survives only if its IOU with every kept candidate
/// is below `iou_threshold`.
pub fn non_max_suppression(
    mut candidates: Vec<DetectionCandidate>,
    iou_threshold: f32,
) -> Vec<DetectionCandidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<DetectionCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| k.bbox.iou(&candidate.bbox) < iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

// ============================================================================
// Click resolution
// ============================================================================

/// Pick the candidate for a click in native frame pixels.
///
/// The first candidate whose box contains the click wins. Otherwise the
/// candidate with the nearest center is returned if it lies strictly within
/// `max_distance`.
pub fn resolve_click<'a>(
    candidates: &'a [DetectionCandidate],
    click: Point,
    max_distance: f32,
) -> Result<&'a DetectionCandidate, DetectionError> {
    if let Some(hit) = candidates.iter().find(|c| c.bbox.contains(&click)) {
        return Ok(hit);
    }

    let mut nearest: Option<(&DetectionCandidate, f32)> = None;
    for candidate in candidates {
        let distance = candidate.center.distance_to(&click);
        if distance < max_distance && nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((candidate, distance));
        }
    }

    nearest
        .map(|(candidate, distance)| {
            log::debug!(
                "Nearest {} at {:.1}px from click",
                candidate.class,
                distance
            );
            candidate
        })
        .ok_or(DetectionError::NoObjectAtClick)
}

/// Square fallback centered on the click, in native frame pixels.
pub fn fallback_candidate(click: Point, half_size: f32, confidence: f32) -> DetectionCandidate {
    let bbox = BoundingBox::from_center(click, half_size * 2.0, half_size * 2.0);
    DetectionCandidate::from_bbox(FALLBACK_CLASS, confidence, bbox)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::classes::default_road_classes;

    fn candidate(class: &str, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> DetectionCandidate {
        DetectionCandidate::from_bbox(class, confidence, BoundingBox::new(x, y, w, h))
    }

    /// One raw record with a single non-zero class score.
    fn record(cx: f32, cy: f32, w: f32, h: f32, objectness: f32, class_id: usize, score: f32) -> Vec<f32> {
        let mut record = vec![0.0; RECORD_LEN];
        record[0] = cx;
        record[1] = cy;
        record[2] = w;
        record[3] = h;
        record[4] = objectness;
        record[5 + class_id] = score;
        record
    }

    #[test]
    fn test_decode_scales_to_native_pixels() {
        // Car centered in the 640 grid, 64x32 grid units
        let output = record(320.0, 320.0, 64.0, 32.0, 0.9, 2, 0.9);
        let candidates = decode_predictions(&output, 640, Size::new(1280.0, 720.0), 0.5);

        assert_eq!(candidates.len(), 1);
        let car = &candidates[0];
        assert_eq!(car.class, "car");
        assert!((car.confidence - 0.81).abs() < 1e-5);
        assert!((car.center.x - 640.0).abs() < 1e-3);
        assert!((car.center.y - 360.0).abs() < 1e-3);
        assert!((car.bbox.width - 128.0).abs() < 1e-3);
        assert!((car.bbox.height - 36.0).abs() < 1e-3);
        assert_eq!(car.polygon, car.bbox.to_quad());
    }

    #[test]
    fn test_decode_drops_low_scores() {
        let mut output = record(100.0, 100.0, 10.0, 10.0, 0.4, 2, 1.0);
        // Objectness passes but the product does not
        output.extend(record(100.0, 100.0, 10.0, 10.0, 0.9, 2, 0.5));
        let candidates = decode_predictions(&output, 640, Size::new(640.0, 640.0), 0.5);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_decode_ignores_trailing_values() {
        let mut output = record(100.0, 100.0, 10.0, 10.0, 1.0, 0, 1.0);
        output.extend([1.0, 2.0, 3.0]);
        let candidates = decode_predictions(&output, 640, Size::new(640.0, 640.0), 0.5);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].class, "person");
    }

    #[test]
    fn test_filter_keeps_road_classes() {
        let candidates = vec![
            candidate("car", 0.9, 0.0, 0.0, 10.0, 10.0),
            candidate("dog", 0.9, 0.0, 0.0, 10.0, 10.0),
            candidate("truck", 0.4, 0.0, 0.0, 10.0, 10.0),
            candidate("stop sign", 0.5, 0.0, 0.0, 10.0, 10.0),
        ];
        let kept = filter_classes(candidates, &default_road_classes(), 0.5);
        let classes: Vec<&str> = kept.iter().map(|c| c.class.as_str()).collect();
        assert_eq!(classes, vec!["car", "stop sign"]);
    }

    #[test]
    fn test_nms_keeps_higher_confidence_of_overlapping_pair() {
        let a = candidate("car", 0.9, 10.0, 10.0, 20.0, 20.0);
        let b = candidate("car", 0.8, 12.0, 12.0, 20.0, 20.0);
        assert!(a.bbox.iou(&b.bbox) > 0.5);

        let kept = non_max_suppression(vec![b, a.clone()], 0.5);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn test_nms_keeps_disjoint_candidates_in_score_order() {
        let low = candidate("car", 0.6, 0.0, 0.0, 10.0, 10.0);
        let high = candidate("bus", 0.95, 100.0, 100.0, 10.0, 10.0);
        let kept = non_max_suppression(vec![low, high], 0.5);
        let classes: Vec<&str> = kept.iter().map(|c| c.class.as_str()).collect();
        assert_eq!(classes, vec!["bus", "car"]);
    }

    #[test]
    fn test_resolve_click_inside_box() {
        let a = candidate("car", 0.9, 10.0, 10.0, 20.0, 20.0);
        let candidates = vec![a.clone()];
        assert_eq!(resolve_click(&candidates, Point::new(15.0, 15.0), 100.0), Ok(&a));
    }

    #[test]
    fn test_resolve_click_first_containing_wins() {
        let first = candidate("truck", 0.7, 0.0, 0.0, 100.0, 100.0);
        let second = candidate("car", 0.9, 10.0, 10.0, 20.0, 20.0);
        let candidates = vec![first.clone(), second];
        assert_eq!(
            resolve_click(&candidates, Point::new(15.0, 15.0), 100.0).map(|c| c.class.as_str()),
            Ok("truck")
        );
    }

    #[test]
    fn test_resolve_click_nearest_center() {
        // Centers at (20,20) and (200,20); click at (60,20) is 40px from the first
        let near = candidate("car", 0.6, 10.0, 10.0, 20.0, 20.0);
        let far = candidate("bus", 0.9, 190.0, 10.0, 20.0, 20.0);
        let candidates = vec![far, near];
        assert_eq!(
            resolve_click(&candidates, Point::new(60.0, 20.0), 100.0).map(|c| c.class.as_str()),
            Ok("car")
        );
    }

    #[test]
    fn test_resolve_click_distance_is_strict() {
        // Center at (20,20), click exactly 100px away
        let candidates = vec![candidate("car", 0.9, 10.0, 10.0, 20.0, 20.0)];
        assert_eq!(
            resolve_click(&candidates, Point::new(120.0, 20.0), 100.0),
            Err(DetectionError::NoObjectAtClick)
        );
        assert_eq!(
            resolve_click(&[], Point::new(0.0, 0.0), 100.0),
            Err(DetectionError::NoObjectAtClick)
        );
    }

    #[test]
    fn test_fallback_square() {
        let fallback = fallback_candidate(Point::new(100.0, 50.0), 40.0, 0.5);
        assert_eq!(fallback.class, FALLBACK_CLASS);
        assert_eq!(fallback.confidence, 0.5);
        assert_eq!(fallback.bbox, BoundingBox::new(60.0, 10.0, 80.0, 80.0));
        assert_eq!(fallback.center, Point::new(100.0, 50.0));
        assert_eq!(fallback.polygon.len(), 4);
    }
}
