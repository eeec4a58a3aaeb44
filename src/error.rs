//! Error-handling utilities.

pub use anyhow::{anyhow, bail, ensure, Context, Error};

/// A malformed argument was supplied to a [`Response`][crate::Response] mutator.
///
/// The message text of each variant is part of the response-building contract: callers match on
/// the rendered message as well as the variant.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The value given for the status code was not a usable HTTP status number.
    #[error("statusCode must be a number.")]
    StatusCode,
    /// The value given for a header key was not a usable header name.
    #[error("First argument: key must be a string.")]
    HeaderKey,
    /// The value given for a header value was not a usable header value.
    #[error("Second argument: value must be a string.")]
    HeaderValue,
}

/// A [`Response`][crate::Response] mutation was attempted after the body started flowing.
///
/// Once the first chunk of the body has been forwarded to a downstream consumer, the response
/// metadata is permanently immutable. These errors indicate a pipeline-ordering bug: correct
/// middleware finishes setting the status and headers before anything consumes the body.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LockedError {
    /// The status code was assigned after the body started flowing.
    #[error("Cannot set statusCode after writing to the response.")]
    StatusCode,
    /// A header was set or removed after the body started flowing.
    #[error("Cannot set headers after writing to the response.")]
    Headers,
}

/// The error type returned by fallible [`Response`][crate::Response] methods.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// A mutator was given a malformed argument.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A mutator was called after the response metadata was locked.
    #[error(transparent)]
    Locked(#[from] LockedError),
    /// Serializing a JSON body failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// Serializing a form-encoded body failed.
    #[error("form serialization failed: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
}
