//! HTTP vocabulary types and the response primitives built on them.
//!
//! This module re-exports the parts of the [`http`] crate that appear in this crate's public API,
//! so that programs do not need to add their own dependency on [`http`].
pub mod body;
pub mod response;

pub use self::body::{Body, BodyReader, BodySource, BodyWriter, SendError};
pub use self::response::Response;

pub use http::header::{self, HeaderMap, HeaderName, HeaderValue};
pub use http::{StatusCode, Version};
