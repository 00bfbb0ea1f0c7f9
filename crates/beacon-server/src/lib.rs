//! Beacon site server library
//!
//! Reference host for the tracking engine: site pages, the settings form
//! and the page-render hook, exposed for testing and reuse.

pub mod api;
pub mod config;
pub mod error;
pub mod hook;
pub mod pages;
pub mod session;
