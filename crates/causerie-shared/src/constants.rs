/// Maximum raw size of a user-selected image before compression (5 MiB).
/// Anything larger is rejected outright rather than fed to the pipeline.
pub const MAX_INPUT_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Absolute ceiling on a compressed image payload (1 MiB).  Output above
/// this after both passes is a hard failure, never sent.
pub const MAX_OUTPUT_IMAGE_SIZE: usize = 1024 * 1024;

/// Primary compression pass: target output size (0.5 MiB).
pub const PRIMARY_TARGET_SIZE: usize = 512 * 1024;

/// Primary compression pass: initial JPEG quality factor.
pub const PRIMARY_INITIAL_QUALITY: f32 = 0.7;

/// Output size above which the stricter second pass is triggered (500 KiB).
pub const SECOND_PASS_THRESHOLD: usize = 500 * 1024;

/// Second compression pass: target output size (0.3 MiB).
pub const SECONDARY_TARGET_SIZE: usize = 307 * 1024;

/// Second compression pass: initial JPEG quality factor.
pub const SECONDARY_INITIAL_QUALITY: f32 = 0.6;

/// Maximum bounding-box dimension after resize, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 1280;

/// Maximum refinement iterations within a single compression pass.
pub const MAX_COMPRESSION_ITERATIONS: u32 = 4;

/// Capacity of the live-event broadcast channel.
pub const LIVE_FEED_CAPACITY: usize = 256;

/// Capacity of the engine-update broadcast channel.
pub const UPDATE_FEED_CAPACITY: usize = 64;
