//! Library error types.

use thiserror::Error;

/// Errors that can occur while resolving a tile through the fetch pipeline.
///
/// All of these are terminal for the attempt in progress: the cache entry
/// for the key becomes `Invalid` and stays that way until it is evicted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The tile server answered with a non-success status code.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The request failed before a response arrived (timeout, DNS, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Reading or writing the disk cache failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded or cached bytes could not be decoded into an image.
    #[error("decode error: {0}")]
    Decode(#[from] crate::render::DecodeError),

    /// The source has no URL for this key, so it can never be fetched.
    #[error("source has no url for tile")]
    Unaddressable,
}
