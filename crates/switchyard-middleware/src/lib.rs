//! # Switchyard Middleware
//!
//! Built-in steps and combinators for Switchyard chains.
//!
//! | Step / function      | Purpose                                              |
//! |----------------------|------------------------------------------------------|
//! | [`recovery()`]       | Convert panics into 500 responses                    |
//! | [`logger()`]         | Structured access log and request metrics            |
//! | [`request_id()`]     | Assign a UUID v7 request ID                          |
//! | [`error_handler()`]  | Fire `on_error` hooks and render recorded errors     |
//! | [`Timeout`]          | Run the rest of the chain under a deadline           |
//! | [`combinators`]      | `when`, `unless`, `and`, `or`, `not`, `combine`, ... |
//!
//! A typical global stack:
//!
//! ```text
//! recovery → logger → request_id → error_handler → [route steps] → handler
//! ```

pub mod combinators;
pub mod error_handler;
pub mod logger;
pub mod recovery;
pub mod request_id;
pub mod timeout;

pub use combinators::{
    and, combine, header_present, method_is, not, only, or, path_prefix, predicate, skip, unless,
    when, Predicate,
};
pub use error_handler::{error_handler, ErrorHandler};
pub use logger::{logger, Logger};
pub use recovery::{recovery, Recovery};
pub use request_id::{request_id, RequestId, REQUEST_ID_HEADER, REQUEST_ID_KEY};
pub use timeout::{format_duration, Timeout};
