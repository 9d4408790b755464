//! Middleware for observability.
//!
//! Request logging with latency tracking; auth middleware lives in the
//! auth module next to the token validator it depends on.

pub mod logging;

pub use logging::request_logging;
