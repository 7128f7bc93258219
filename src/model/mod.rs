//! Data models for RVAT.

mod annotation;
mod category;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, AnnotationPatch, unix_millis};
pub use category::{DEFAULT_CATEGORY, default_categories};
