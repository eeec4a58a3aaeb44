//! HTTP responses.

use super::body::{Body, BodySource};
use crate::convert::{Borrowable, ToHeaderKey, ToHeaderValue, ToStatusCode};
use crate::error::{LockedError, ResponseError};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use mime::Mime;
use serde::Serialize;

/// An HTTP response under construction: status code, headers, and a streamed body.
///
/// A response is created fresh for each request/response cycle, built up by middleware, and
/// finally handed to a transport layer that serializes the status and headers and drains the
/// body.
///
/// # The metadata lock
///
/// The status code and headers are mutable only until the body starts flowing: the instant the
/// first chunk is forwarded to a body reader, the metadata is permanently locked and every
/// further call to a mutator fails with [`LockedError`]. Reads remain valid forever, and
/// [`set_body()`][`Self::set_body()`] may still replace the body's upstream source. Writing into
/// the body does not lock by itself; the transition happens exactly when a chunk exits toward a
/// consumer.
///
/// # Builder-style methods
///
/// Methods with the `with_` name prefix, such as [`with_header()`][`Self::with_header()`], return
/// `Self` to allow chaining. The builder style is typically most useful when constructing and
/// using a response in a single expression. For example:
///
/// ```no_run
/// # use relay_http::error::ResponseError;
/// # use relay_http::Response;
/// # fn build() -> Result<Response, ResponseError> {
/// let resp = Response::new()
///     .with_status(201)?
///     .with_header("my-header", "hello!")?;
/// # Ok(resp)
/// # }
/// ```
///
/// # Setter methods
///
/// Setter methods, such as [`set_header()`][`Self::set_header()`], are prefixed by `set_`, and
/// can be used interchangeably with the builder-style methods. Setter methods tend to work better
/// when constructing a response involves conditional branches or loops.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// Create a new [`Response`].
    ///
    /// The new response is created with status code `200 OK`, no headers, an empty unlocked
    /// body, and the buffering watermark currently configured in
    /// [`BodyLimits`][crate::limits::BodyLimits].
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Body::new(),
        }
    }

    /// Create a new [`Response`] with the given value as the body.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// let resp = Response::from_body("hello");
    /// ```
    pub fn from_body(body: impl Into<BodySource>) -> Self {
        Self::new().with_body(body)
    }

    /// Create a new response with the given status code.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// use relay_http::http::StatusCode;
    /// let resp = Response::from_status(StatusCode::NOT_FOUND).unwrap();
    /// assert_eq!(resp.get_status().as_u16(), 404);
    /// ```
    pub fn from_status(status: impl ToStatusCode) -> Result<Self, ResponseError> {
        Self::new().with_status(status)
    }

    /// Create a 303 See Other response with the given value as the `Location` header.
    pub fn see_other(destination: impl ToHeaderValue) -> Result<Self, ResponseError> {
        Self::new()
            .with_status(StatusCode::SEE_OTHER)?
            .with_header(header::LOCATION, destination)
    }

    /// Create a 308 Permanent Redirect response with the given value as the `Location` header.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// # use http::{header, StatusCode};
    /// let resp = Response::redirect("https://example.org/").unwrap();
    /// assert_eq!(resp.get_status(), StatusCode::PERMANENT_REDIRECT);
    /// assert_eq!(resp.get_header_str(header::LOCATION).unwrap(), "https://example.org/");
    /// ```
    pub fn redirect(destination: impl ToHeaderValue) -> Result<Self, ResponseError> {
        Self::new()
            .with_status(StatusCode::PERMANENT_REDIRECT)?
            .with_header(header::LOCATION, destination)
    }

    /// Create a 307 Temporary Redirect response with the given value as the `Location` header.
    pub fn temporary_redirect(destination: impl ToHeaderValue) -> Result<Self, ResponseError> {
        Self::new()
            .with_status(StatusCode::TEMPORARY_REDIRECT)?
            .with_header(header::LOCATION, destination)
    }

    /// Get the status code of the response.
    ///
    /// Reading the status remains valid before and after the metadata lock.
    pub fn get_status(&self) -> StatusCode {
        self.status
    }

    /// Set the status code of the response.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::StatusCode`][crate::error::ValidationError::StatusCode] if the
    /// argument is not a usable HTTP status number, regardless of lock state, and
    /// [`LockedError::StatusCode`] if the body has already started flowing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// let mut resp = Response::new();
    /// resp.set_status(404).unwrap();
    /// assert_eq!(resp.get_status().as_u16(), 404);
    /// ```
    pub fn set_status(&mut self, status: impl ToStatusCode) -> Result<(), ResponseError> {
        let status = status.into_status_code()?;
        if self.body.is_locked() {
            return Err(LockedError::StatusCode.into());
        }
        self.status = status;
        Ok(())
    }

    /// Builder-style equivalent of [`set_status()`][`Self::set_status()`].
    pub fn with_status(mut self, status: impl ToStatusCode) -> Result<Self, ResponseError> {
        self.set_status(status)?;
        Ok(self)
    }

    /// Return whether the response metadata has been locked by the body starting to flow.
    pub fn is_locked(&self) -> bool {
        self.body.is_locked()
    }

    /// Get the value of a header, or `None` if the header is not present.
    ///
    /// This is read-only and side-effect free; it never errors, and a key that is not a usable
    /// header name is simply absent.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// # use relay_http::http::HeaderValue;
    /// # fn build() -> Result<(), relay_http::error::ResponseError> {
    /// let resp = Response::new().with_header("hello", "world!")?;
    /// assert_eq!(resp.get_header("hello"), Some(&HeaderValue::from_static("world!")));
    /// assert!(resp.get_header("not-present").is_none());
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_header(&self, name: impl ToHeaderKey) -> Option<&HeaderValue> {
        let name = name.into_borrowable().ok()?;
        self.headers.get(name.as_ref())
    }

    /// Get the value of a header as a string, or `None` if the header is not present.
    ///
    /// # Panics
    ///
    /// Panics if the value of the header is not valid UTF-8.
    pub fn get_header_str(&self, name: impl ToHeaderKey) -> Option<&str> {
        let name = name.into_borrowable().ok()?;
        if let Some(hdr) = self.get_header(name.as_ref()) {
            Some(
                hdr.to_str().unwrap_or_else(|_| {
                    panic!("invalid UTF-8 HTTP header value for header: {}", name)
                }),
            )
        } else {
            None
        }
    }

    /// Returns whether the given header name is present in the response.
    pub fn contains_header(&self, name: impl ToHeaderKey) -> bool {
        match name.into_borrowable() {
            Ok(name) => self.headers.contains_key(name.as_ref()),
            Err(_) => false,
        }
    }

    /// Get an iterator of all the response's header names and values.
    ///
    /// This is how a transport layer reads the headers out for serialization.
    pub fn get_headers(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter()
    }

    /// Set a response header to the given value, discarding any previous value for the given
    /// header name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::HeaderKey`][crate::error::ValidationError::HeaderKey] if the
    /// key is not a usable header name,
    /// [`ValidationError::HeaderValue`][crate::error::ValidationError::HeaderValue] if the value
    /// is not a usable header value, and [`LockedError::Headers`] if the body has already started
    /// flowing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// let mut resp = Response::new();
    /// resp.set_header("hello", "world!").unwrap();
    /// assert_eq!(resp.get_header_str("hello"), Some("world!"));
    /// ```
    pub fn set_header(
        &mut self,
        name: impl ToHeaderKey,
        value: impl ToHeaderValue,
    ) -> Result<(), ResponseError> {
        let name = name.into_owned()?;
        let value = value.into_owned()?;
        if self.body.is_locked() {
            return Err(LockedError::Headers.into());
        }
        self.headers.insert(name, value);
        Ok(())
    }

    /// Builder-style equivalent of [`set_header()`][`Self::set_header()`].
    pub fn with_header(
        mut self,
        name: impl ToHeaderKey,
        value: impl ToHeaderValue,
    ) -> Result<Self, ResponseError> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Remove a header from the response, returning its value if it was present.
    ///
    /// Removing a header that is absent is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`LockedError::Headers`] if the body has already started flowing.
    pub fn remove_header(
        &mut self,
        name: impl ToHeaderKey,
    ) -> Result<Option<HeaderValue>, ResponseError> {
        if self.body.is_locked() {
            return Err(LockedError::Headers.into());
        }
        let name = match name.into_borrowable() {
            Ok(name) => name,
            Err(_) => return Ok(None),
        };
        Ok(self.headers.remove(name.as_ref()))
    }

    /// Get a reference to the body of this response.
    ///
    /// The body value never changes identity: there is no way to replace this field, only to
    /// redirect its upstream data source with [`set_body()`][`Self::set_body()`]. I/O happens
    /// through handles obtained from the returned reference.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Replace the body's upstream data source.
    ///
    /// If the source is a stream (built with [`BodySource::stream()`]), it is attached so its
    /// output flows into the body. Anything else is a complete in-memory payload, written as a
    /// single chunk followed immediately by end-of-input.
    ///
    /// In both cases, any previously connected source is disconnected entirely: bytes already
    /// queued from it are discarded, and producer handles created before this call are detached
    /// so their subsequent writes fail. This is permitted in any lock state.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// let mut resp = Response::new();
    /// resp.set_body("goodbye cruel world");
    /// ```
    pub fn set_body(&mut self, body: impl Into<BodySource>) {
        self.body.replace_source(body.into());
    }

    /// Builder-style equivalent of [`set_body()`][`Self::set_body()`].
    pub fn with_body(mut self, body: impl Into<BodySource>) -> Self {
        self.set_body(body);
        self
    }

    /// Builder-style equivalent of [`set_body_text_plain()`][`Self::set_body_text_plain()`].
    pub fn with_body_text_plain(mut self, body: &str) -> Result<Self, ResponseError> {
        self.set_body_text_plain(body)?;
        Ok(self)
    }

    /// Set the given string as the response's body with content type `text/plain; charset=UTF-8`.
    pub fn set_body_text_plain(&mut self, body: &str) -> Result<(), ResponseError> {
        if self.body.is_locked() {
            return Err(LockedError::Headers.into());
        }
        self.set_body(body);
        self.set_content_type(mime::TEXT_PLAIN_UTF_8)
    }

    /// Builder-style equivalent of [`set_body_text_html()`][`Self::set_body_text_html()`].
    pub fn with_body_text_html(mut self, body: &str) -> Result<Self, ResponseError> {
        self.set_body_text_html(body)?;
        Ok(self)
    }

    /// Set the given string as the response's body with content type `text/html; charset=UTF-8`.
    pub fn set_body_text_html(&mut self, body: &str) -> Result<(), ResponseError> {
        if self.body.is_locked() {
            return Err(LockedError::Headers.into());
        }
        self.set_body(body);
        self.set_content_type(mime::TEXT_HTML_UTF_8)
    }

    /// Builder-style equivalent of [`set_body_json()`][`Self::set_body_json()`].
    pub fn with_body_json(mut self, value: &impl Serialize) -> Result<Self, ResponseError> {
        self.set_body_json(value)?;
        Ok(self)
    }

    /// Convert the given value to JSON and set that JSON as the response's body, with content
    /// type `application/json`.
    ///
    /// The given value must implement [`serde::Serialize`]. You can either implement that trait
    /// for your own custom type, or use [`serde_json::Value`] to create untyped JSON values.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Json`] if serialization fails, and [`LockedError::Headers`] if
    /// the body has already started flowing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use relay_http::Response;
    /// #[derive(serde::Serialize)]
    /// struct MyData {
    ///     name: String,
    ///     count: u64,
    /// }
    /// let my_data = MyData { name: "Computers".to_string(), count: 1024 };
    /// let mut resp = Response::new();
    /// resp.set_body_json(&my_data).unwrap();
    /// assert_eq!(resp.get_content_type(), Some(relay_http::mime::APPLICATION_JSON));
    /// ```
    pub fn set_body_json(&mut self, value: &impl Serialize) -> Result<(), ResponseError> {
        if self.body.is_locked() {
            return Err(LockedError::Headers.into());
        }
        let json = serde_json::to_vec(value)?;
        self.set_body(json);
        self.set_content_type(mime::APPLICATION_JSON)
    }

    /// Builder-style equivalent of [`set_body_form()`][`Self::set_body_form()`].
    pub fn with_body_form(mut self, value: &impl Serialize) -> Result<Self, ResponseError> {
        self.set_body_form(value)?;
        Ok(self)
    }

    /// Convert the given value to `application/x-www-form-urlencoded` format and set that data as
    /// the response's body.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Form`] if serialization fails, and [`LockedError::Headers`] if
    /// the body has already started flowing.
    pub fn set_body_form(&mut self, value: &impl Serialize) -> Result<(), ResponseError> {
        if self.body.is_locked() {
            return Err(LockedError::Headers.into());
        }
        let form = serde_urlencoded::to_string(value)?;
        self.set_body(form);
        self.set_content_type(mime::APPLICATION_WWW_FORM_URLENCODED)
    }

    /// Get the MIME type described by the response's
    /// [`Content-Type`](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Type)
    /// header, or `None` if that header is not present or contains an invalid MIME type.
    pub fn get_content_type(&self) -> Option<Mime> {
        self.get_header_str(header::CONTENT_TYPE)
            .and_then(|v| v.parse().ok())
    }

    /// Set the MIME type described by the response's
    /// [`Content-Type`](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Type)
    /// header.
    pub fn set_content_type(&mut self, mime: Mime) -> Result<(), ResponseError> {
        self.set_header(header::CONTENT_TYPE, mime.as_ref())
    }

    /// Get the value of the response's
    /// [`Content-Length`](https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Content-Length)
    /// header, if it exists.
    pub fn get_content_length(&self) -> Option<usize> {
        self.get_header(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod response_contract_tests {
    use super::*;
    use crate::error::ValidationError;
    use bytes::Bytes;

    #[test]
    fn status_defaults_to_200() {
        assert_eq!(Response::new().get_status(), StatusCode::OK);
    }

    #[test]
    fn status_is_assignable_while_unlocked() {
        let mut resp = Response::new();
        resp.set_status(500).unwrap();
        assert_eq!(resp.get_status().as_u16(), 500);
    }

    #[test]
    fn non_numeric_status_yields_validation_error() {
        let mut resp = Response::new();
        match resp.set_status("asdf") {
            Err(ResponseError::Validation(ValidationError::StatusCode)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        let err = resp.set_status("asdf").unwrap_err();
        assert_eq!(err.to_string(), "statusCode must be a number.");
    }

    #[test]
    fn unset_header_reads_as_absent() {
        assert!(Response::new().get_header("asdf").is_none());
    }

    #[test]
    fn invalid_header_key_yields_key_validation_error() {
        let mut resp = Response::new();
        match resp.set_header("bad key\n", "value") {
            Err(ResponseError::Validation(ValidationError::HeaderKey)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        let err = resp.set_header("bad key\n", "value").unwrap_err();
        assert_eq!(err.to_string(), "First argument: key must be a string.");
    }

    #[test]
    fn invalid_header_value_yields_value_validation_error() {
        let mut resp = Response::new();
        match resp.set_header("content-type", "bad\nvalue") {
            Err(ResponseError::Validation(ValidationError::HeaderValue)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        let err = resp.set_header("content-type", "bad\nvalue").unwrap_err();
        assert_eq!(err.to_string(), "Second argument: value must be a string.");
    }

    #[test]
    fn headers_are_settable_and_removable() {
        let mut resp = Response::new();
        resp.set_header("content-type", "application/json").unwrap();
        assert_eq!(resp.get_header_str("content-type"), Some("application/json"));
        assert!(resp.contains_header("content-type"));

        let removed = resp.remove_header("content-type").unwrap();
        assert_eq!(removed, Some(HeaderValue::from_static("application/json")));
        assert!(resp.get_header("content-type").is_none());

        // Removing an absent header is not an error.
        assert!(resp.remove_header("content-type").unwrap().is_none());
    }

    #[test]
    fn set_header_overwrites_prior_value() {
        let mut resp = Response::new();
        resp.set_header("hello", "world!").unwrap();
        resp.set_header("hello", "universe!").unwrap();
        assert_eq!(resp.get_header_str("hello"), Some("universe!"));
    }

    #[test]
    fn redirect_constructors_set_status_and_location() {
        let resp = Response::see_other("https://example.org/next").unwrap();
        assert_eq!(resp.get_status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.get_header_str(header::LOCATION),
            Some("https://example.org/next")
        );

        let resp = Response::redirect("https://example.org/moved").unwrap();
        assert_eq!(resp.get_status(), StatusCode::PERMANENT_REDIRECT);

        let resp = Response::temporary_redirect("https://example.org/tmp").unwrap();
        assert_eq!(resp.get_status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[test]
    fn content_type_round_trips_through_mime() {
        let mut resp = Response::new();
        resp.set_content_type(mime::APPLICATION_JSON).unwrap();
        assert_eq!(resp.get_content_type(), Some(mime::APPLICATION_JSON));
    }

    #[tokio::test]
    async fn mutations_before_any_forwarded_chunk_do_not_lock() {
        let mut resp = Response::new();
        let mut writer = resp.body().writer();

        // Writing alone must not trip the lock; only forwarding to a reader does.
        writer.write_str("queued but unread").await.unwrap();
        assert!(!resp.is_locked());

        resp.set_status(404).unwrap();
        resp.set_header("content-type", "application/json").unwrap();
        resp.remove_header("content-type").unwrap();
        assert!(!resp.is_locked());
    }

    #[tokio::test]
    async fn first_forwarded_chunk_locks_status_and_headers() {
        let mut resp = Response::new();
        resp.set_header("content-type", "application/json").unwrap();
        resp.set_status(404).unwrap();

        let mut writer = resp.body().writer();
        let mut reader = resp.body().reader();
        writer.write_str("chunk").await.unwrap();
        reader.read_chunk().await.unwrap();
        assert!(resp.is_locked());

        match resp.set_header("content-type", "application/xml") {
            Err(ResponseError::Locked(LockedError::Headers)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        assert_eq!(
            resp.set_header("content-type", "application/xml")
                .unwrap_err()
                .to_string(),
            "Cannot set headers after writing to the response."
        );

        match resp.remove_header("content-type") {
            Err(ResponseError::Locked(LockedError::Headers)) => {}
            x => panic!("unexpected result: {:?}", x),
        }

        match resp.set_status(405) {
            Err(ResponseError::Locked(LockedError::StatusCode)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
        assert_eq!(
            resp.set_status(405).unwrap_err().to_string(),
            "Cannot set statusCode after writing to the response."
        );

        // The earlier metadata survives untouched and remains readable.
        assert_eq!(resp.get_status().as_u16(), 404);
        assert_eq!(resp.get_header_str("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn status_validation_applies_regardless_of_lock_state() {
        let mut resp = Response::new();
        let mut writer = resp.body().writer();
        let mut reader = resp.body().reader();
        writer.write_str("chunk").await.unwrap();
        reader.read_chunk().await.unwrap();
        assert!(resp.is_locked());

        match resp.set_status("asdf") {
            Err(ResponseError::Validation(ValidationError::StatusCode)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
    }

    #[tokio::test]
    async fn set_body_with_stream_source_emits_its_payload() {
        let mut resp = Response::new();
        let upstream = futures::stream::iter(vec![Bytes::from_static(b"hello world")]);
        resp.set_body(BodySource::stream(upstream));

        let text = resp.body().reader().into_string().await;
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn set_body_with_plain_value_emits_exactly_that_value() {
        let mut resp = Response::new();
        resp.set_body("goodbye cruel world");

        let text = resp.body().reader().into_string().await;
        assert_eq!(text, "goodbye cruel world");
    }

    #[tokio::test]
    async fn set_body_supersedes_a_connected_producer() {
        let mut resp = Response::new();
        let mut writer = resp.body().writer();
        writer.write_str("hello world").await.unwrap();

        resp.set_body("goodbye cruel world");

        // None of the old producer's data reaches the output, and it is now detached.
        assert!(writer.write_str("more").await.is_err());
        let text = resp.body().reader().into_string().await;
        assert_eq!(text, "goodbye cruel world");
    }

    #[tokio::test]
    async fn set_body_remains_permitted_after_lock() {
        let mut resp = Response::new();
        let mut writer = resp.body().writer();
        let mut reader = resp.body().reader();
        writer.write_str("first").await.unwrap();
        reader.read_chunk().await.unwrap();
        assert!(resp.is_locked());

        resp.set_body("second");
        let text = resp.body().reader().into_string().await;
        assert_eq!(text, "second");
        assert!(resp.is_locked());
    }

    #[test]
    fn set_body_json_sets_payload_and_content_type() {
        #[derive(serde::Serialize)]
        struct MyData {
            name: String,
            count: u64,
        }

        let mut resp = Response::new();
        let my_data = MyData {
            name: "Computers".to_string(),
            count: 1024,
        };
        resp.set_body_json(&my_data).unwrap();
        assert_eq!(resp.get_content_type(), Some(mime::APPLICATION_JSON));
    }

    #[tokio::test]
    async fn set_body_form_sets_payload_and_content_type() {
        #[derive(serde::Serialize)]
        struct Query {
            q: String,
        }

        let mut resp = Response::new();
        resp.set_body_form(&Query { q: "hello".to_string() }).unwrap();
        assert_eq!(
            resp.get_content_type(),
            Some(mime::APPLICATION_WWW_FORM_URLENCODED)
        );
        assert_eq!(resp.body().reader().into_string().await, "q=hello");
    }

    #[tokio::test]
    async fn typed_body_setters_fail_once_locked() {
        let mut resp = Response::new();
        let mut writer = resp.body().writer();
        let mut reader = resp.body().reader();
        writer.write_str("chunk").await.unwrap();
        reader.read_chunk().await.unwrap();

        match resp.set_body_text_plain("too late") {
            Err(ResponseError::Locked(LockedError::Headers)) => {}
            x => panic!("unexpected result: {:?}", x),
        }
    }
}
