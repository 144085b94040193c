//! Per-request execution context.
//!
//! A [`Context`] owns everything one request needs while its chain runs:
//! the inbound request, the response sink, path parameters, a typed
//! key/value store, the resolved step list and the cursor into it.
//! Contexts are pooled by the engine and [`reset`](Context::reset) between
//! requests.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::Serialize;
use switchyard_router::Params;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::hooks::{HookPoint, Hooks};
use crate::middleware::{BoxFuture, Step};
use crate::mode::Mode;
use crate::types::{clone_request, Request, Response};
use crate::writer::ResponseWriter;

/// Cursor value after [`Context::abort`]; past the end of any real chain.
pub const ABORT_INDEX: usize = usize::MAX / 2;

/// Arbitrary typed values attached to a request.
pub type Keys = HashMap<String, Box<dyn Any + Send + Sync>>;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

/// Per-request state and continuation chain.
pub struct Context {
    request: Request,
    writer: ResponseWriter,
    params: Params,
    keys: Keys,
    handlers: Vec<Step>,
    index: usize,
    aborted: bool,
    error: Option<DispatchError>,
    full_path: Option<String>,
    mode: Mode,
    hooks: Arc<Hooks>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Mode::default(), Arc::new(Hooks::default()))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("params", &self.params)
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .field("steps", &self.handlers.len())
            .field("index", &self.index)
            .field("aborted", &self.aborted)
            .field("error", &self.error)
            .field("full_path", &self.full_path)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates an empty context bound to an engine's mode and hooks.
    #[must_use]
    pub fn new(mode: Mode, hooks: Arc<Hooks>) -> Self {
        Self {
            request: Request::default(),
            writer: ResponseWriter::new(),
            params: Params::new(),
            keys: Keys::new(),
            handlers: Vec::new(),
            index: 0,
            aborted: false,
            error: None,
            full_path: None,
            mode,
            hooks,
        }
    }

    /// Creates a standalone context for `request` with default mode and no hooks.
    #[must_use]
    pub fn for_request(request: Request) -> Self {
        let mut ctx = Self::default();
        ctx.request = request;
        ctx
    }

    /// Clears per-request state, keeping allocated capacity.
    pub fn reset(&mut self) {
        self.request = Request::default();
        self.writer.reset();
        self.params.clear();
        self.keys.clear();
        self.handlers.clear();
        self.index = 0;
        self.aborted = false;
        self.error = None;
        self.full_path = None;
    }

    // ------------------------------------------------------------------
    // Chain control
    // ------------------------------------------------------------------

    /// Runs the remaining steps.
    ///
    /// Each iteration takes the step at the cursor, advances the cursor and
    /// awaits the step. A step that itself awaits `next()` consumes the
    /// steps after it, so the outer loop finds nothing left on return.
    /// A step returning `Err` has its error recorded and aborts the chain.
    pub fn next(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            while self.index < self.handlers.len() && !self.aborted {
                let step = Arc::clone(&self.handlers[self.index]);
                self.index += 1;
                if let Err(err) = step.handle(self).await {
                    debug!(step = step.name(), error = %err, "step returned error, aborting chain");
                    self.error = Some(err);
                    self.abort();
                }
            }
        })
    }

    /// Stops the chain. Steps already past their own `next()` still run
    /// their remaining code.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.index = ABORT_INDEX;
    }

    /// Returns true once the chain has been aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Splices `steps` right after the current step and continues the chain.
    pub fn insert_and_continue(&mut self, steps: Vec<Step>) -> BoxFuture<'_, ()> {
        let at = self.index.min(self.handlers.len());
        self.handlers.splice(at..at, steps);
        self.next()
    }

    /// Appends steps to the chain.
    pub fn push_steps(&mut self, steps: impl IntoIterator<Item = Step>) {
        self.handlers.extend(steps);
    }

    /// Returns the number of steps entered so far.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.index
    }

    /// Returns the number of steps in the chain.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.handlers.len()
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Attaches an error without aborting. A later error replaces it.
    pub fn set_error(&mut self, err: DispatchError) {
        self.error = Some(err);
    }

    /// Returns the attached error.
    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Removes and returns the attached error.
    pub fn take_error(&mut self) -> Option<DispatchError> {
        self.error.take()
    }

    /// Writes the JSON error envelope for `err`, attaches it and aborts.
    pub fn abort_with_error(&mut self, err: DispatchError) {
        self.write_error(&err);
        self.error = Some(err);
        self.abort();
    }

    /// Writes `status` with an empty body and aborts.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.writer.set_status(status);
        self.writer.write_header_now();
        self.abort();
    }

    /// Writes the JSON error envelope for `err` unless a response was
    /// already written.
    pub fn write_error(&mut self, err: &DispatchError) {
        let envelope = err.to_response(self.mode);
        self.json(err.status_code(), &envelope);
    }

    /// Fires the hooks registered for `point`.
    ///
    /// For `Request` and `Route`, an abort stops the remaining hooks.
    pub fn fire_hooks(&mut self, point: HookPoint) {
        let hooks = Arc::clone(&self.hooks);
        let stop_on_abort = matches!(point, HookPoint::Request | HookPoint::Route);
        for hook in hooks.list(point) {
            (**hook)(self);
            if stop_on_abort && self.aborted {
                break;
            }
        }
    }

    /// Fires the `on_error` hooks.
    pub fn fire_error_hooks(&mut self) {
        self.fire_hooks(HookPoint::Error);
    }

    // ------------------------------------------------------------------
    // Request access
    // ------------------------------------------------------------------

    /// Returns the inbound request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the inbound request mutably.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Replaces the inbound request.
    pub fn set_request(&mut self, request: Request) {
        self.request = request;
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Returns a path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns all path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces the path parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Returns the matched route pattern.
    #[must_use]
    pub fn full_path(&self) -> Option<&str> {
        self.full_path.as_deref()
    }

    /// Sets the matched route pattern.
    pub fn set_full_path(&mut self, pattern: impl Into<String>) {
        self.full_path = Some(pattern.into());
    }

    /// Returns the first decoded value of query parameter `name`.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns all decoded query pairs in order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.request
            .uri()
            .query()
            .and_then(|query| serde_urlencoded::from_str(query).ok())
            .unwrap_or_default()
    }

    /// Returns a request header as a string.
    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name)?.to_str().ok()
    }

    /// Returns the engine mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Stores a typed value under `key`.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.keys.insert(key.into(), Box::new(value));
    }

    /// Returns the value under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.keys.get(key)?.downcast_ref()
    }

    /// Returns the value under `key` mutably if it has type `T`.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.keys.get_mut(key)?.downcast_mut()
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let boxed = self.keys.remove(key)?;
        match boxed.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(boxed) => {
                self.keys.insert(key.to_string(), boxed);
                None
            }
        }
    }

    /// Returns true if a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Returns the response sink.
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Returns the response sink mutably.
    pub fn writer_mut(&mut self) -> &mut ResponseWriter {
        &mut self.writer
    }

    /// Returns true once a response has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.writer.is_written()
    }

    /// Sets the response status.
    pub fn status(&mut self, status: StatusCode) {
        self.writer.set_status(status);
    }

    /// Sets a response header. Invalid names or values are logged and dropped.
    pub fn header(&mut self, name: &str, value: &str) {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!(header = name, "invalid header name, ignoring");
            return;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            warn!(header = %name, "invalid header value, ignoring");
            return;
        };
        self.writer.insert_header(name, value);
    }

    /// Writes a plain-text response.
    pub fn string(&mut self, status: StatusCode, body: impl AsRef<str>) {
        self.data(status, TEXT_PLAIN, body.as_ref().as_bytes());
    }

    /// Writes a JSON response.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => self.data(status, APPLICATION_JSON, &body),
            Err(err) => {
                warn!(error = %err, "failed to serialize JSON response");
                self.error = Some(DispatchError::internal_with_source(
                    "failed to serialize response",
                    err,
                ));
                if !self.writer.is_written() {
                    self.writer.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                    self.writer.write_header_now();
                }
            }
        }
    }

    /// Writes raw bytes with the given content type.
    ///
    /// The first writer wins: if a response was already written this logs
    /// and does nothing.
    pub fn data(&mut self, status: StatusCode, content_type: &str, body: &[u8]) {
        if self.writer.is_written() {
            warn!(
                path = self.request.uri().path(),
                status = status.as_u16(),
                "response already written, skipping render"
            );
            return;
        }
        self.writer.set_status(status);
        if let Ok(value) = HeaderValue::from_str(content_type) {
            if !self.writer.headers().contains_key(CONTENT_TYPE) {
                self.writer.insert_header(CONTENT_TYPE, value);
            }
        }
        self.writer.write(body);
    }

    /// Moves the written output into an HTTP response.
    pub fn take_response(&mut self) -> Response {
        self.writer.take_response()
    }

    // ------------------------------------------------------------------
    // Detached execution
    // ------------------------------------------------------------------

    /// Moves the remaining chain into a new owned context.
    ///
    /// The detached context takes the request, keys, step list and cursor
    /// and gets a fresh response buffer. This context keeps a copy of the
    /// request (without extensions) and the parameters so it can still
    /// answer after the detached chain is abandoned.
    pub fn detach(&mut self) -> Context {
        let copy = clone_request(&self.request);
        let request = std::mem::replace(&mut self.request, copy);
        Context {
            request,
            writer: ResponseWriter::new(),
            params: self.params.clone(),
            keys: std::mem::take(&mut self.keys),
            handlers: std::mem::take(&mut self.handlers),
            index: self.index,
            aborted: self.aborted,
            error: None,
            full_path: self.full_path.clone(),
            mode: self.mode,
            hooks: Arc::clone(&self.hooks),
        }
    }

    /// Restores state from a detached context that ran to completion.
    ///
    /// Buffered output is copied onto this sink; keys, step list, cursor
    /// and abort flag are taken back. An error recorded by the detached
    /// chain replaces this context's error.
    pub fn reattach(&mut self, detached: Context) {
        self.writer.absorb(detached.writer);
        self.keys = detached.keys;
        self.handlers = detached.handlers;
        self.index = detached.index;
        self.aborted = detached.aborted;
        if detached.error.is_some() {
            self.error = detached.error;
        }
    }
}
