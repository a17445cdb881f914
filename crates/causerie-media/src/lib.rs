//! # causerie-media
//!
//! Adaptive image compression for message attachments and profile
//! pictures.
//!
//! User-selected images are validated, resized and re-encoded until they
//! fit a hard 1 MiB payload ceiling, trading quality for size through a
//! bounded two-pass escalation policy.  Successful output is encoded as a
//! `data:` URL so it can travel inside the same send payload as text.
//!
//! Compression runs on a blocking worker via [`Compressor::spawn`]; a new
//! job supersedes any job still in flight so a stale result never reaches
//! the UI.

pub mod compress;
pub mod encode;
pub mod job;

mod error;

pub use compress::{compress, validate, CompressedImage, PassSettings};
pub use encode::{prepare_attachment, to_data_url};
pub use error::{MediaError, Result};
pub use job::{CompressionJob, Compressor, JobStatus};
