//! Background thread for smart detection (native only).
//!
//! `DetectionWorker` owns a thread that runs the detection service so
//! inference never blocks the event loop. Requests and responses travel
//! over channels; results are picked up with `poll`.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::backend::{DetectionBackend, DetectionRequest, DetectionResponse};
use super::runtime::ModelStatus;
use super::service::DetectionService;

/// Message sent to the worker thread.
enum WorkerMessage {
    /// Run a detection
    Detect(Box<DetectionRequest>),
    /// Load the model now
    Preload,
    /// Unload the model and keep running
    Unload,
    /// Exit the thread
    Shutdown,
}

/// Runs detection requests on a background thread.
pub struct DetectionWorker {
    request_tx: Sender<WorkerMessage>,
    result_rx: Receiver<DetectionResponse>,
    thread_handle: Option<JoinHandle<()>>,
    /// Shared with the thread for status queries
    service: Arc<DetectionService>,
    pending: usize,
}

impl DetectionWorker {
    /// Spawn the worker thread.
    ///
    /// Returns `Err` if the thread fails to spawn.
    pub fn spawn(service: DetectionService) -> Result<Self, String> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (result_tx, result_rx) = mpsc::channel::<DetectionResponse>();
        let service = Arc::new(service);
        let thread_service = Arc::clone(&service);

        let thread_handle = thread::Builder::new()
            .name("smart-detection".to_string())
            .spawn(move || {
                log::info!("Detection worker thread started");
                Self::thread_loop(&thread_service, request_rx, result_tx);
                thread_service.shutdown();
                log::info!("Detection worker thread exiting");
            })
            .map_err(|e| format!("Failed to spawn detection thread: {}", e))?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            service,
            pending: 0,
        })
    }

    fn thread_loop(
        service: &DetectionService,
        request_rx: Receiver<WorkerMessage>,
        result_tx: Sender<DetectionResponse>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(WorkerMessage::Detect(request)) => {
                    let detection =
                        service.detect_in_frame(&request.frame, request.click, request.surface);
                    let response = DetectionResponse {
                        ticket: request.ticket,
                        detection,
                    };
                    if result_tx.send(response).is_err() {
                        log::warn!("Result channel closed, detection thread exiting");
                        break;
                    }
                }
                Ok(WorkerMessage::Preload) => {
                    if let Err(e) = service.init() {
                        log::debug!("Preload failed: {}", e);
                    }
                }
                Ok(WorkerMessage::Unload) => service.shutdown(),
                Ok(WorkerMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, detection thread exiting");
                    break;
                }
            }
        }
    }

    fn send(&self, message: WorkerMessage) -> bool {
        if self.request_tx.send(message).is_err() {
            log::error!("Failed to send to detection thread: channel closed");
            false
        } else {
            true
        }
    }
}

impl DetectionBackend for DetectionWorker {
    fn submit(&mut self, request: DetectionRequest) {
        let id = request.ticket.id;
        if self.send(WorkerMessage::Detect(Box::new(request))) {
            self.pending += 1;
            log::debug!("Sent detection request {}", id);
        }
    }

    fn poll(&mut self) -> Option<DetectionResponse> {
        match self.result_rx.try_recv() {
            Ok(response) => {
                self.pending = self.pending.saturating_sub(1);
                Some(response)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Detection thread disconnected");
                self.pending = 0;
                None
            }
        }
    }

    fn pending_count(&self) -> usize {
        self.pending
    }

    fn model_status(&self) -> ModelStatus {
        self.service.model_status()
    }

    fn preload(&mut self) {
        self.send(WorkerMessage::Preload);
    }

    fn shutdown(&mut self) {
        self.send(WorkerMessage::Unload);
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down detection worker");

        let _ = self.request_tx.send(WorkerMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Detection thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::detection::backend::DetectionTicket;
    use crate::detection::frame::CapturedFrame;
    use crate::detection::runtime::{ScriptedRuntime, UnavailableRuntime};
    use crate::detection::service::{DetectionConfig, DetectionSource};
    use crate::geometry::{BoundingBox, Point, Size};

    fn wait_for(worker: &mut DetectionWorker) -> Option<DetectionResponse> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if let Some(response) = worker.poll() {
                return Some(response);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    fn request(id: u64) -> DetectionRequest {
        DetectionRequest {
            ticket: DetectionTicket { id, generation: 1 },
            frame: CapturedFrame::solid(64, 64, [0, 0, 0]),
            click: Point::new(32.0, 32.0),
            surface: Size::new(64.0, 64.0),
        }
    }

    #[test]
    fn test_worker_round_trip() {
        let runtime = ScriptedRuntime::with_boxes(&[(
            BoundingBox::new(200.0, 200.0, 240.0, 240.0),
            "bus",
            0.9,
        )]);
        let service = DetectionService::new(runtime, DetectionConfig::default());
        let mut worker = DetectionWorker::spawn(service).unwrap();

        worker.submit(request(3));
        assert_eq!(worker.pending_count(), 1);

        let response = wait_for(&mut worker).expect("no response from worker");
        assert_eq!(response.ticket.id, 3);
        assert_eq!(response.detection.source, DetectionSource::Model);
        assert_eq!(response.detection.object_class, "bus");
        assert_eq!(worker.pending_count(), 0);
        assert!(worker.model_status().is_ready());
    }

    #[test]
    fn test_worker_fallback_and_drop() {
        let service = DetectionService::new(UnavailableRuntime::default(), DetectionConfig::default());
        let mut worker = DetectionWorker::spawn(service).unwrap();

        worker.submit(request(1));
        let response = wait_for(&mut worker).expect("no response from worker");
        assert!(response.detection.is_fallback());
        drop(worker);
    }
}
