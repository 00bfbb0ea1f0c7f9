//! REST API implementation
//!
//! - types: shared state and response types
//! - extractors: JSON bodies and the current user
//! - handlers: page and settings endpoints
//! - router: router creation and the tracking hook layer
//! - tests: unit tests for the components

mod extractors;
mod handlers;
mod router;
mod tests;
pub mod types;

// Re-export public API
pub use extractors::JsonExtractor;
pub use router::create_router;
pub use types::{AppState, HealthResponse, SaveResponse};
