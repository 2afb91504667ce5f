//! Span helpers shared by the crates of the bridge, on top of OpenTelemetry.

mod request;
mod setup;
mod traceable;
mod tracer;

pub use request::get_trace_headers;
pub use setup::{initialize_tracing, shutdown_tracer};
pub use traceable::{ErrorVisibility, Successful, Traceable, TraceableError};
pub use tracer::{
    add_event_on_active_span, global_tracer, set_attribute_on_active_span, AttributeVisibility,
    SpanVisibility, Tracer,
};

// re-exported so that users do not need their own, possibly mismatched, OpenTelemetry
pub use opentelemetry::trace::TraceError;
