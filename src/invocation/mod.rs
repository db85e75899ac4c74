//! Invocation entry point.
//!
//! Shared by the HTTP `/invoke` route and the one-shot `invoke` subcommand.

pub mod event;
pub mod handler;

pub use event::{failure_type_for_alarm, parse_event, InvocationRequest};
pub use handler::{InvocationHandler, InvocationResponse};
