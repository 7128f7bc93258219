//! Request/response plumbing between the editor and the detection service.

use std::collections::VecDeque;

use super::frame::CapturedFrame;
use super::runtime::ModelStatus;
use super::service::{DetectionService, SmartDetection};
use crate::geometry::{Point, Size};

/// Identifies a detection request.
///
/// `generation` is the editor generation at submit time; a response whose
/// generation no longer matches is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionTicket {
    pub id: u64,
    pub generation: u64,
}

/// A detection to run on an already captured frame.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub ticket: DetectionTicket,
    pub frame: CapturedFrame,
    /// Click in drawing-surface coordinates
    pub click: Point,
    /// Drawing surface dimensions at submit time
    pub surface: Size,
}

/// The outcome of a request.
#[derive(Debug, Clone)]
pub struct DetectionResponse {
    pub ticket: DetectionTicket,
    pub detection: SmartDetection,
}

/// Runs detection requests and hands back their responses.
pub trait DetectionBackend {
    /// Queue a request.
    fn submit(&mut self, request: DetectionRequest);

    /// Take one finished response, oldest first. Non-blocking.
    fn poll(&mut self) -> Option<DetectionResponse>;

    /// Number of submitted requests without a polled response.
    fn pending_count(&self) -> usize;

    fn model_status(&self) -> ModelStatus;

    /// Start loading the model ahead of the first request.
    fn preload(&mut self);

    /// Release the model.
    fn shutdown(&mut self);
}

/// Runs every request on the caller's thread during `submit`.
#[derive(Debug)]
pub struct InlineDetector {
    service: DetectionService,
    finished: VecDeque<DetectionResponse>,
}

impl InlineDetector {
    pub fn new(service: DetectionService) -> Self {
        Self {
            service,
            finished: VecDeque::new(),
        }
    }

    pub fn service(&self) -> &DetectionService {
        &self.service
    }
}

impl DetectionBackend for InlineDetector {
    fn submit(&mut self, request: DetectionRequest) {
        let detection = self
            .service
            .detect_in_frame(&request.frame, request.click, request.surface);
        self.finished.push_back(DetectionResponse {
            ticket: request.ticket,
            detection,
        });
    }

    fn poll(&mut self) -> Option<DetectionResponse> {
        self.finished.pop_front()
    }

    fn pending_count(&self) -> usize {
        self.finished.len()
    }

    fn model_status(&self) -> ModelStatus {
        self.service.model_status()
    }

    fn preload(&mut self) {
        // Failure is kept in the status and retried on the next request
        let _ = self.service.init();
    }

    fn shutdown(&mut self) {
        self.finished.clear();
        self.service.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::runtime::UnavailableRuntime;
    use crate::detection::service::DetectionConfig;

    #[test]
    fn test_inline_detector_answers_in_order() {
        let service = DetectionService::new(UnavailableRuntime::default(), DetectionConfig::default());
        let mut backend = InlineDetector::new(service);

        for id in 0..2 {
            backend.submit(DetectionRequest {
                ticket: DetectionTicket { id, generation: 7 },
                frame: CapturedFrame::solid(100, 100, [0, 0, 0]),
                click: Point::new(50.0, 50.0),
                surface: Size::new(100.0, 100.0),
            });
        }

        assert_eq!(backend.pending_count(), 2);
        assert_eq!(backend.poll().map(|r| r.ticket.id), Some(0));
        assert_eq!(backend.poll().map(|r| r.ticket.id), Some(1));
        assert!(backend.poll().is_none());
    }

    #[test]
    fn test_inline_preload_reports_status() {
        let service = DetectionService::new(UnavailableRuntime::default(), DetectionConfig::default());
        let mut backend = InlineDetector::new(service);
        assert_eq!(backend.model_status(), ModelStatus::Unloaded);
        backend.preload();
        assert!(matches!(backend.model_status(), ModelStatus::Failed(_)));
    }
}
