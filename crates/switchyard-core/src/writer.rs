//! Buffered response sink.
//!
//! A [`ResponseWriter`] accumulates status, headers and body for one
//! request. The first body write latches the status; later status changes
//! are ignored.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

use crate::types::Response;

/// Outbound response sink for a single request.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    written: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    /// Creates an empty writer with status 200.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            written: false,
        }
    }

    /// Returns the current status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code unless the header has already been written.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.written {
            if status != self.status {
                warn!(
                    current = self.status.as_u16(),
                    ignored = status.as_u16(),
                    "status change ignored, response already written"
                );
            }
            return;
        }
        self.status = status;
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing existing values.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.written {
            warn!(header = %name, "header change ignored, response already written");
            return;
        }
        self.headers.insert(name, value);
    }

    /// Appends a header value, keeping existing values.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.written {
            warn!(header = %name, "header change ignored, response already written");
            return;
        }
        self.headers.append(name, value);
    }

    /// Latches the status and headers without writing a body.
    pub fn write_header_now(&mut self) {
        self.written = true;
    }

    /// Appends bytes to the body, latching the header on first write.
    pub fn write(&mut self, data: &[u8]) {
        self.written = true;
        self.body.extend_from_slice(data);
    }

    /// Returns true once the header has been latched.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Returns the body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the number of body bytes written.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Copies another writer's buffered output onto this one.
    ///
    /// Status and headers are taken only if this writer is not yet written.
    /// The body is appended.
    pub fn absorb(&mut self, other: ResponseWriter) {
        if !self.written {
            self.status = other.status;
            let mut last_name = None;
            for (name, value) in other.headers {
                if let Some(name) = name {
                    self.headers.remove(&name);
                    last_name = Some(name);
                }
                if let Some(name) = &last_name {
                    self.headers.append(name.clone(), value);
                }
            }
        }
        if other.written {
            self.write(&other.body);
        }
    }

    /// Clears all state so the writer can be reused.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.written = false;
    }

    /// Moves the buffered output into an HTTP response, leaving the
    /// writer empty.
    pub fn take_response(&mut self) -> Response {
        let body: Bytes = self.body.split().freeze();
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        self.reset();
        response
    }

    /// Converts the writer into an HTTP response.
    #[must_use]
    pub fn into_response(mut self) -> Response {
        self.take_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http_body_util::BodyExt;

    #[test]
    fn test_first_write_latches_status() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::CREATED);
        writer.write(b"hello");
        writer.set_status(StatusCode::INTERNAL_SERVER_ERROR);

        assert!(writer.is_written());
        assert_eq!(writer.status(), StatusCode::CREATED);
        assert_eq!(writer.body(), b"hello");
    }

    #[test]
    fn test_write_header_now_latches_without_body() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::NO_CONTENT);
        writer.write_header_now();
        writer.set_status(StatusCode::OK);

        assert!(writer.is_written());
        assert_eq!(writer.status(), StatusCode::NO_CONTENT);
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn test_headers_ignored_after_write() {
        let mut writer = ResponseWriter::new();
        writer.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write(b"x");
        writer.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        assert_eq!(writer.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_absorb_copies_buffered_output() {
        let mut real = ResponseWriter::new();
        let mut buffer = ResponseWriter::new();
        buffer.set_status(StatusCode::ACCEPTED);
        buffer.append_header(
            HeaderName::from_static("x-trace"),
            HeaderValue::from_static("a"),
        );
        buffer.append_header(
            HeaderName::from_static("x-trace"),
            HeaderValue::from_static("b"),
        );
        buffer.write(b"done");

        real.absorb(buffer);

        assert!(real.is_written());
        assert_eq!(real.status(), StatusCode::ACCEPTED);
        assert_eq!(real.headers().get_all("x-trace").iter().count(), 2);
        assert_eq!(real.body(), b"done");
    }

    #[test]
    fn test_absorb_unwritten_buffer_keeps_real_unwritten() {
        let mut real = ResponseWriter::new();
        let mut buffer = ResponseWriter::new();
        buffer.set_status(StatusCode::ACCEPTED);

        real.absorb(buffer);

        assert!(!real.is_written());
        assert_eq!(real.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_take_response_resets_writer() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::NOT_FOUND);
        writer.write(b"missing");

        let response = writer.take_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"missing");

        assert!(!writer.is_written());
        assert_eq!(writer.status(), StatusCode::OK);
    }
}
