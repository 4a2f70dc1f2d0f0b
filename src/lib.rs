//! Per-thread annotation cache for conversational assistants.
//!
//! A capacity-bounded, write-through table of structured annotations
//! (components, technical description, pricing) keyed by thread id, with
//! two secondary indices that follow it: the marker of the message that last
//! produced each annotation, and the set of accepted message ids per thread.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use annotation_cache::cache::{AnnotationSession, CacheConfig};
//! use annotation_cache::infra::storage::MemoryStore;
//!
//! let session = AnnotationSession::open(Arc::new(MemoryStore::new()), &CacheConfig::default());
//! session.record_classified("thread-1", "msg-1", "Components:\nPump A\nPrice: 120 EUR");
//! assert!(session.is_current_marker("thread-1", "msg-1"));
//! ```

pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

pub use cache::{AcceptOutcome, AnnotationSession};
pub use domain::annotation::{AnnotationPatch, AnnotationRecord};
pub use domain::sections::{Sections, classify};
