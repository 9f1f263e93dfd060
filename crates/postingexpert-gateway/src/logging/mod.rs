//! Centralized logging helpers
//!
//! Trace ids for request correlation and consolidated entry/exit lines.

mod trace_context;

pub use trace_context::{generate_trace_id, RouteKind, TraceContext};
