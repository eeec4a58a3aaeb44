// Warnings (other than unused variables) in doctests are promoted to errors.
#![doc(test(attr(deny(warnings))))]
#![doc(test(attr(allow(dead_code))))]
#![doc(test(attr(allow(unused_variables))))]
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::invalid_codeblock_attributes)]

//! # HTTP response primitives for Relay.
//!
//! This crate provides the [`Response`] type that Relay middleware builds up during a
//! request/response cycle, along with the streaming [`Body`][crate::http::Body] it carries.
//!
//! A response starts out with status `200 OK`, no headers, and an empty body. Middleware may
//! freely adjust the status code and headers until the body starts flowing to a downstream
//! consumer; from that moment on the metadata is locked and every further mutation fails with
//! [`LockedError`][crate::error::LockedError]. The body itself is a pass-through byte stream:
//! producers write into it (directly or by piping another stream in), and the transport layer
//! reads it out unchanged.
//!
//! ```no_run
//! use relay_http::error::ResponseError;
//! use relay_http::Response;
//!
//! # fn build() -> Result<Response, ResponseError> {
//! let resp = Response::new()
//!     .with_status(404)?
//!     .with_header("content-type", "text/plain")?
//!     .with_body("not found");
//! # Ok(resp)
//! # }
//! ```

pub mod convert;
pub mod error;
pub mod http;
pub mod limits;
pub mod mime;

#[doc(inline)]
pub use crate::error::Error;
#[doc(inline)]
pub use crate::http::{Body, Response};
