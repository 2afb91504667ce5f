use opentelemetry::{global, trace::TraceError, KeyValue};
use opentelemetry_otlp::{WithExportConfig, OTEL_EXPORTER_OTLP_ENDPOINT_DEFAULT};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_semantic_conventions as semcov;
use tracing_subscriber::EnvFilter;

/// Initialize logging and the global tracer.
///
/// Log output goes to stdout, filtered by `RUST_LOG`. Spans are exported in batches over OTLP to
/// `endpoint` (or the OTLP default endpoint), and the W3C `traceparent` header is used to
/// propagate the trace context to the OData services that are called.
///
/// Calling this twice keeps the first log subscriber.
pub fn initialize_tracing(
    endpoint: Option<&str>,
    service_name: String,
    service_version: Option<&'static str>,
) -> Result<(), TraceError> {
    // a subscriber may already be installed by the host application
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    global::set_text_map_propagator(TraceContextPropagator::new());

    let mut resource_entries = vec![KeyValue::new(semcov::resource::SERVICE_NAME, service_name)];
    if let Some(service_version) = service_version {
        resource_entries.push(KeyValue::new(
            semcov::resource::SERVICE_VERSION,
            service_version,
        ));
    }

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint.unwrap_or(OTEL_EXPORTER_OTLP_ENDPOINT_DEFAULT)),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::config()
                .with_resource(opentelemetry_sdk::Resource::new(resource_entries)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;
    Ok(())
}

pub fn shutdown_tracer() {
    global::shutdown_tracer_provider();
}
