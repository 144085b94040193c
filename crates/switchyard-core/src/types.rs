//! Request and response types used by the dispatch core.

use bytes::Bytes;
use http_body_util::Full;

/// Inbound request with a fully collected body.
pub type Request = http::Request<Bytes>;

/// Outbound response produced from a [`ResponseWriter`](crate::ResponseWriter).
pub type Response = http::Response<Full<Bytes>>;

/// Clones a request's method, URI, version, headers and body.
///
/// Extensions are not cloned.
#[must_use]
pub fn clone_request(request: &Request) -> Request {
    let mut clone = Request::new(request.body().clone());
    *clone.method_mut() = request.method().clone();
    *clone.uri_mut() = request.uri().clone();
    *clone.version_mut() = request.version();
    *clone.headers_mut() = request.headers().clone();
    clone
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_clone_request() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/users?page=2")
            .header("x-token", "abc")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let clone = clone_request(&request);
        assert_eq!(clone.method(), Method::POST);
        assert_eq!(clone.uri(), "/users?page=2");
        assert_eq!(clone.headers()["x-token"], "abc");
        assert_eq!(clone.body(), &Bytes::from_static(b"{}"));
    }
}
