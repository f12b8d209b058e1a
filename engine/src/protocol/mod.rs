//! Line protocol for hosting a game over stdin/stdout.
//!
//! Each input line is a JSON [`Request`]; each output line is a JSON
//! [`Response`]. Accepted commands are followed by a driver run, and every
//! update carries the log entries appended since the previous one.

pub mod session;

pub use session::{parse_request, Request, Response, Session};
