use thiserror::Error;

/// User-correctable input problems, surfaced immediately and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message must contain text or an image")]
    EmptyMessage,
}
