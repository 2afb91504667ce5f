use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{
    get_active_span, FutureExt, SpanRef, Status, TraceContextExt, Tracer as _,
};
use opentelemetry::{Key, KeyValue};

use crate::traceable::{ErrorVisibility, Traceable, TraceableError};

/// Who a span is meant for: users looking at the traces of their own requests, or the
/// operators of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanVisibility {
    Internal,
    User,
}

impl fmt::Display for SpanVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Internal => "internal",
            Self::User => "user",
        })
    }
}

/// `Internal` attributes are recorded under an `internal.` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeVisibility {
    Default,
    Internal,
}

fn attribute(
    visibility: AttributeVisibility,
    key: &'static str,
    value: impl Into<opentelemetry::Value>,
) -> KeyValue {
    let key: Key = match visibility {
        AttributeVisibility::Default => Key::from_static_str(key),
        AttributeVisibility::Internal => Key::new(format!("internal.{key}")),
    };
    KeyValue::new(key, value)
}

/// Records how the work wrapped by a span went: its display name and visibility, and for
/// failures the span status plus an `error` event with the description and details.
fn record_outcome<R: Traceable>(
    span: &SpanRef<'_>,
    display_name: Cow<'static, str>,
    visibility: SpanVisibility,
    result: &R,
) {
    span.set_attribute(attribute(AttributeVisibility::Default, "display.name", display_name));
    span.set_attribute(attribute(
        AttributeVisibility::Internal,
        "visibility",
        visibility.to_string(),
    ));

    let Some(error) = result.get_error() else {
        return;
    };
    let description = error.description();
    // users do not get to see why internal work failed
    let status = match (visibility, error.visibility()) {
        (SpanVisibility::User, ErrorVisibility::Internal) => "Internal error".to_string(),
        _ => description.clone(),
    };
    span.set_status(Status::error(status));
    span.add_event(
        "error",
        vec![
            attribute(AttributeVisibility::Internal, "error_description", description),
            attribute(AttributeVisibility::Internal, "error_details", error.details()),
        ],
    );
}

/// Sets an attribute on the active span, prefixing the `key` with `internal.` if `visibility` is `Internal`.
pub fn set_attribute_on_active_span<V>(visibility: AttributeVisibility, key: &'static str, value: V)
where
    V: Into<opentelemetry::Value>,
{
    get_active_span(|span| span.set_attribute(attribute(visibility, key, value)));
}

/// Adds an event with the given `name` on the active span.
pub fn add_event_on_active_span(name: String) {
    get_active_span(|span| span.add_event(name, Vec::new()));
}

/// The global OpenTelemetry tracer, with helpers to run work inside spans.
pub struct Tracer {
    inner: BoxedTracer,
}

impl Tracer {
    /// Runs `f` in a new span called `name`. The span records `display_name`, its visibility,
    /// and the error carried by the result, if any.
    pub fn in_span<R, F>(
        &self,
        name: &'static str,
        display_name: impl Into<Cow<'static, str>>,
        visibility: SpanVisibility,
        f: F,
    ) -> R
    where
        F: FnOnce() -> R,
        R: Traceable,
    {
        let display_name = display_name.into();
        self.inner.in_span(name, move |cx| {
            let result = f();
            record_outcome(&cx.span(), display_name, visibility, &result);
            result
        })
    }

    /// Asynchronous version of [`Tracer::in_span`]. The span stays the active one for the
    /// whole lifetime of the future returned by `f`.
    pub async fn in_span_async<'a, R, F>(
        &'a self,
        name: &'static str,
        display_name: impl Into<Cow<'static, str>>,
        visibility: SpanVisibility,
        f: F,
    ) -> R
    where
        // boxed so that every caller shares one instantiation of the span plumbing
        F: FnOnce() -> Pin<Box<dyn Future<Output = R> + 'a + Send>>,
        R: Traceable,
    {
        let display_name = display_name.into();
        let cx = opentelemetry::Context::current_with_span(self.inner.start(name));
        let span_cx = cx.clone();
        let result = f().with_context(cx).await;
        record_outcome(&span_cx.span(), display_name, visibility, &result);
        result
    }
}

/// The tracer installed by [`crate::initialize_tracing`], or a no-op one before that.
pub fn global_tracer() -> Tracer {
    Tracer {
        inner: global::tracer("odata-graphql-tracing-util"),
    }
}
