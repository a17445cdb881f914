//! Supersession-aware compression jobs.
//!
//! Compression is CPU-bound, so it runs on tokio's blocking pool and the
//! interactive side merely awaits the handle.  A [`Compressor`] owns one
//! logical input control: starting a new job bumps a generation counter,
//! and any job from an older generation reports [`MediaError::Superseded`]
//! instead of delivering a stale payload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::encode::prepare_attachment;
use crate::error::{MediaError, Result};

/// Where the current compression job stands, for UI consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    Idle,
    Compressing,
    Done,
    Failed,
}

/// Job runner for a single input control.
///
/// At most one job is relevant at a time; a second selection before the
/// first completes supersedes it rather than queueing behind it.
#[derive(Clone)]
pub struct Compressor {
    generation: Arc<AtomicU64>,
    status: Arc<Mutex<JobStatus>>,
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            status: Arc::new(Mutex::new(JobStatus::Idle)),
        }
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start compressing a freshly selected image.  Any job still in
    /// flight is superseded from this moment on.
    pub fn spawn(&self, mime: impl Into<String>, bytes: Vec<u8>) -> CompressionJob {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = JobStatus::Compressing;

        let mime = mime.into();
        let handle = tokio::task::spawn_blocking(move || prepare_attachment(&mime, &bytes));

        CompressionJob {
            generation,
            counter: Arc::clone(&self.generation),
            status: Arc::clone(&self.status),
            handle,
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one in-flight compression.
pub struct CompressionJob {
    generation: u64,
    counter: Arc<AtomicU64>,
    status: Arc<Mutex<JobStatus>>,
    handle: JoinHandle<Result<String>>,
}

impl CompressionJob {
    /// Whether a newer job has been started since this one.
    pub fn is_superseded(&self) -> bool {
        self.counter.load(Ordering::SeqCst) != self.generation
    }

    /// Wait for the job and return the `data:` URL payload.
    ///
    /// If a newer job was started in the meantime the result is discarded
    /// and [`MediaError::Superseded`] is returned; the job's outcome never
    /// touches the shared status in that case.
    pub async fn finish(self) -> Result<String> {
        let result = match self.handle.await {
            Ok(inner) => inner,
            Err(e) => Err(MediaError::Task(e.to_string())),
        };

        // The generation is re-checked under the status lock: a spawn
        // landing after the await must not have its `Compressing` status
        // overwritten by this job's outcome.
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if self.counter.load(Ordering::SeqCst) != self.generation {
            debug!(generation = self.generation, "Discarding superseded compression result");
            return Err(MediaError::Superseded);
        }
        *status = match result {
            Ok(_) => JobStatus::Done,
            Err(_) => JobStatus::Failed,
        };
        drop(status);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, 128])
        });
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn job_produces_data_url_and_status_done() {
        let compressor = Compressor::new();
        assert_eq!(compressor.status(), JobStatus::Idle);

        let job = compressor.spawn("image/png", tiny_png());
        let url = job.finish().await.unwrap();

        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(compressor.status(), JobStatus::Done);
    }

    #[tokio::test]
    async fn newer_selection_supersedes_older_job() {
        let compressor = Compressor::new();

        let first = compressor.spawn("image/png", tiny_png());
        let second = compressor.spawn("image/png", tiny_png());
        assert!(first.is_superseded());

        let first_result = first.finish().await;
        assert!(matches!(first_result, Err(MediaError::Superseded)));

        // The surviving job is unaffected.
        assert!(second.finish().await.is_ok());
        assert_eq!(compressor.status(), JobStatus::Done);
    }

    #[tokio::test]
    async fn stale_job_outcome_never_touches_the_newer_job_status() {
        let compressor = Compressor::new();
        let first = compressor.spawn("image/png", tiny_png());
        let second = compressor.spawn("image/png", tiny_png());

        assert!(matches!(first.finish().await, Err(MediaError::Superseded)));
        // The live job still owns the status; the stale outcome must not
        // have flipped it to Done or Failed.
        assert_eq!(compressor.status(), JobStatus::Compressing);

        second.finish().await.unwrap();
        assert_eq!(compressor.status(), JobStatus::Done);
    }

    #[tokio::test]
    async fn undecodable_input_marks_job_failed() {
        let compressor = Compressor::new();
        let job = compressor.spawn("image/png", b"definitely not a png".to_vec());

        assert!(job.finish().await.is_err());
        assert_eq!(compressor.status(), JobStatus::Failed);
    }
}
