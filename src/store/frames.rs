//! Frame-indexed annotation storage.
//!
//! Per-frame buckets are the single source of truth. The flattened global
//! view is a derived insertion-order index updated inside the same call as
//! the bucket, so the two can never diverge.

use std::collections::{BTreeMap, HashMap};

use crate::model::{Annotation, AnnotationId, AnnotationPatch};

/// Annotations keyed by frame number, plus the derived global order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameIndex {
    /// Frame number -> annotations on that frame, in insertion order
    frames: BTreeMap<u64, Vec<Annotation>>,
    /// Every annotation id in global insertion order
    order: Vec<AnnotationId>,
    /// Annotation id -> frame number
    locations: HashMap<AnnotationId, u64>,
}

impl FrameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an annotation into its frame bucket and the global order.
    ///
    /// Returns false (and changes nothing) if the id is already present.
    pub fn insert(&mut self, annotation: Annotation) -> bool {
        if self.locations.contains_key(&annotation.id) {
            return false;
        }

        self.locations
            .insert(annotation.id.clone(), annotation.frame_number);
        self.order.push(annotation.id.clone());
        self.frames
            .entry(annotation.frame_number)
            .or_default()
            .push(annotation);
        true
    }

    /// Remove an annotation from both views.
    pub fn remove(&mut self, id: &AnnotationId) -> Option<Annotation> {
        let frame = self.locations.remove(id)?;
        self.order.retain(|other| other != id);

        let bucket = self.frames.get_mut(&frame)?;
        let position = bucket.iter().position(|ann| &ann.id == id)?;
        let removed = bucket.remove(position);
        if bucket.is_empty() {
            self.frames.remove(&frame);
        }
        Some(removed)
    }

    /// Apply a patch in place. Returns the updated annotation.
    pub fn patch(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> Option<&Annotation> {
        let ann = self.get_mut(id)?;
        ann.apply(patch);
        Some(ann)
    }

    /// Get an annotation by ID.
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        let frame = self.locations.get(id)?;
        self.frames.get(frame)?.iter().find(|ann| &ann.id == id)
    }

    fn get_mut(&mut self, id: &AnnotationId) -> Option<&mut Annotation> {
        let frame = self.locations.get(id)?;
        self.frames
            .get_mut(frame)?
            .iter_mut()
            .find(|ann| &ann.id == id)
    }

    /// Annotations on one frame, in insertion order.
    pub fn frame(&self, frame_number: u64) -> &[Annotation] {
        self.frames
            .get(&frame_number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every annotation in global insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Annotation> {
        self.order.iter().filter_map(|id| self.get(id))
    }

    /// Frame numbers that carry at least one annotation, ascending.
    pub fn annotated_frames(&self) -> impl Iterator<Item = u64> + '_ {
        self.frames.keys().copied()
    }

    /// Number of frames carrying annotations.
    pub fn annotated_frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total number of annotations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if there are no annotations.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if an annotation exists.
    pub fn contains(&self, id: &AnnotationId) -> bool {
        self.locations.contains_key(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
