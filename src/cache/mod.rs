//! Annotation cache
//!
//! Three persisted tables keyed by conversation thread:
//!
//! - **Records**: capacity-bounded primary table of annotations, FIFO eviction
//! - **Markers**: the message that last produced each thread's annotation
//! - **Memberships**: the set of accepted message ids per thread
//!
//! [`AnnotationSession`] owns all three and cascades record removal into the
//! indices. Each table is snapshotted to a [`DurableStore`] under a fixed key.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! capacity = 12
//! scope = "default"
//! ```
//!
//! [`DurableStore`]: crate::infra::storage::DurableStore

mod clock;
mod config;
mod keys;
pub(crate) mod lock;
mod markers;
mod membership;
pub mod metrics;
mod session;
mod snapshot;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_CAPACITY};
pub use keys::Table;
pub use markers::MarkerIndex;
pub use membership::MembershipIndex;
pub use session::{AcceptOutcome, AnnotationSession};
pub use store::AnnotationCache;
