use thiserror::Error;

/// Errors produced by the media pipeline.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The selected file is not an image at all.
    #[error("Not an image: {mime}")]
    NotAnImage { mime: String },

    /// Raw input exceeds the pre-compression ceiling (5 MiB).
    #[error("Image is too large ({size} bytes), limit is 5 MiB before compression")]
    InputTooLarge { size: usize },

    /// Decoding or re-encoding failed inside the `image` crate.
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Both passes ran and the output still exceeds the 1 MiB ceiling.
    /// There is no third attempt; the user must pick a different image.
    #[error("Image is still too large after compression ({size} bytes)")]
    StillTooLarge { size: usize },

    /// A newer job was started before this one finished; its result has
    /// been discarded.
    #[error("Compression job superseded by a newer selection")]
    Superseded,

    /// The blocking worker panicked or was cancelled.
    #[error("Compression task failed: {0}")]
    Task(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MediaError>;
