//! # causerie-shared
//!
//! Domain types shared by every Causerie crate: message and conversation
//! models, the size constants governing media uploads, and the common
//! error taxonomy.
//!
//! This crate is deliberately leaf-level — it knows nothing about the
//! transport, the store gateway, or the compression pipeline.

pub mod constants;
pub mod time;
pub mod types;

mod error;

pub use error::ValidationError;
pub use types::*;
