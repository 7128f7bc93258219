//! Annotation store with linear undo/redo.
//!
//! `AnnotationStore` is the only owner of annotation state. Every mutation
//! goes through `add`, `delete` or `update`, which change the frame index
//! and then record a post-mutation snapshot in the history.

mod frames;
mod history;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub use frames::FrameIndex;
pub use history::{
    DEFAULT_MAX_DEPTH, History, HistoryAction, HistoryConfig, HistorySnapshot,
};

use crate::model::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch};

/// Errors returned by store commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No annotation with this id
    #[error("Annotation not found: {0}")]
    NotFound(AnnotationId),

    /// An annotation with this id already exists
    #[error("Annotation id already in use: {0}")]
    DuplicateId(AnnotationId),
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub total_annotations: usize,
    pub annotated_frames: usize,
    pub by_category: BTreeMap<String, usize>,
    pub polygons: usize,
    pub rectangles: usize,
}

/// Frame-indexed annotations plus their snapshot history.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    index: FrameIndex,
    history: History,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl AnnotationStore {
    /// Create an empty store.
    pub fn new(config: HistoryConfig) -> Self {
        let index = FrameIndex::new();
        let history = History::new(index.clone(), config);
        Self { index, history }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Add an annotation to its frame.
    pub fn add(&mut self, annotation: Annotation) -> Result<AnnotationId, StoreError> {
        let id = annotation.id.clone();
        let frame = annotation.frame_number;
        if !self.index.insert(annotation) {
            return Err(StoreError::DuplicateId(id));
        }

        self.history.record(self.index.clone(), HistoryAction::Add);
        log::info!(
            "Added annotation {} on frame {} (total: {})",
            id,
            frame,
            self.index.len()
        );
        Ok(id)
    }

    /// Delete an annotation by id.
    pub fn delete(&mut self, id: &AnnotationId) -> Result<Annotation, StoreError> {
        let removed = self
            .index
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        self.history
            .record(self.index.clone(), HistoryAction::Delete);
        log::info!(
            "Deleted annotation {} from frame {} (total: {})",
            id,
            removed.frame_number,
            self.index.len()
        );
        Ok(removed)
    }

    /// Apply a partial update to an annotation.
    pub fn update(
        &mut self,
        id: &AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<&Annotation, StoreError> {
        if !self.index.contains(id) {
            return Err(StoreError::NotFound(id.clone()));
        }

        self.index.patch(id, patch);
        self.history
            .record(self.index.clone(), HistoryAction::Update);
        log::info!("Updated annotation {}", id);

        self.index
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Remove every annotation and forget the history.
    pub fn clear_all(&mut self) {
        let count = self.index.len();
        self.index = FrameIndex::new();
        self.history.reset(self.index.clone());
        log::info!("Cleared all {} annotations", count);
    }

    /// Restore the previous snapshot. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.index = snapshot.state.clone();
                true
            }
            None => false,
        }
    }

    /// Restore the next snapshot. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.index = snapshot.state.clone();
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Annotations on one frame, in insertion order.
    pub fn frame(&self, frame_number: u64) -> &[Annotation] {
        self.index.frame(frame_number)
    }

    /// Flattened global view in insertion order.
    pub fn all(&self) -> Vec<&Annotation> {
        self.index.all().collect()
    }

    /// Get an annotation by ID.
    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.index.get(id)
    }

    /// Get the number of annotations.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if there are no annotations.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Frame numbers carrying annotations, ascending.
    pub fn annotated_frames(&self) -> Vec<u64> {
        self.index.annotated_frames().collect()
    }

    /// The live state (what the current history snapshot holds).
    pub fn state(&self) -> &FrameIndex {
        &self.index
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<&'static str> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<&'static str> {
        self.history.redo_description()
    }

    /// Counts per category and per kind.
    pub fn summary(&self) -> StoreSummary {
        let mut summary = StoreSummary {
            total_annotations: self.index.len(),
            annotated_frames: self.index.annotated_frame_count(),
            ..Default::default()
        };

        for ann in self.index.all() {
            *summary.by_category.entry(ann.category.clone()).or_insert(0) += 1;
            match ann.kind {
                AnnotationKind::Polygon => summary.polygons += 1,
                AnnotationKind::Rectangle => summary.rectangles += 1,
            }
        }

        summary
    }
}

// ============================================================================
// Tests
// ============================================================================
