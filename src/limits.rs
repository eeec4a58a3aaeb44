//! Buffering limits for response bodies.
//!
//! A response body buffers chunks between its producers and its consumer. The limit below bounds
//! how many bytes may sit in that buffer before producers are suspended; a producer blocked on a
//! full buffer resumes once the consumer drains it.
//!
//! The limit is read when a [`Response`][crate::Response] is created, so it should be set before
//! the responses it is meant to affect are constructed.
//!
//! # Examples
//!
//! **Changing the maximum buffered body size**
//!
//! ```no_run
//! use relay_http::limits::BodyLimits;
//! use relay_http::Response;
//!
//! BodyLimits::set_max_buffered_bytes(Some(4096));
//! let resp = Response::new();
//! ```
use lazy_static::lazy_static;
use std::sync::RwLock;

/// The default buffered body size limit for [`BodyLimits`].
pub const DEFAULT_BODY_CAPACITY_BYTES: usize = 16384;

lazy_static! {
    pub(crate) static ref BODY_LIMITS: RwLock<BodyLimits> = RwLock::new(BodyLimits::default());
}

/// The buffering limits for response bodies.
///
/// # Default values
///
/// | Limit              | Default value                  |
/// |--------------------|--------------------------------|
/// | Buffered body size | [`DEFAULT_BODY_CAPACITY_BYTES`] |
#[derive(Clone, Copy, Debug)]
pub struct BodyLimits {
    pub(crate) max_buffered_bytes: Option<usize>,
}

impl BodyLimits {
    const fn default() -> Self {
        BodyLimits {
            max_buffered_bytes: Some(DEFAULT_BODY_CAPACITY_BYTES),
        }
    }

    /// Set all body limits to their default values.
    pub fn set_all_default() {
        *BODY_LIMITS.write().unwrap() = BodyLimits::default();
    }

    /// Disable all body limits.
    ///
    /// Note that the body buffer then grows without bound if producers outpace the consumer.
    pub fn set_all_disabled() {
        *BODY_LIMITS.write().unwrap() = BodyLimits {
            max_buffered_bytes: None,
        };
    }

    /// Get the current buffered body size limit.
    pub fn get_max_buffered_bytes() -> Option<usize> {
        BODY_LIMITS.read().unwrap().max_buffered_bytes
    }

    /// Set the buffered body size limit.
    pub fn set_max_buffered_bytes(max: Option<usize>) {
        BODY_LIMITS.write().unwrap().max_buffered_bytes = max;
    }
}
