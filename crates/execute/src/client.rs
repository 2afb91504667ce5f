//! Data requests to OData services and classification of their responses.

use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_util::{
    add_event_on_active_span, set_attribute_on_active_span, AttributeVisibility, SpanVisibility,
};

use crate::error::FieldError;
use crate::hooks::{Hooks, ODataRequest, RequestContext};

/// OData error code of requests rejected for lack of permissions.
const REQUEST_DENIED: &str = "Authorization_RequestDenied";

/// The body of a successful response. JSON bodies are kept as text; anything else is carried
/// as a base64 `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(pub String);

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
}

/// Issues a GET for `url`. Returns `None` when the pre-request hook dropped the request.
pub(crate) async fn entity_get(
    client: &reqwest::Client,
    hooks: &Hooks,
    cancellation: &CancellationToken,
    context: RequestContext<'_>,
    url: String,
) -> Result<Option<Payload>, FieldError> {
    let tracer = tracing_util::global_tracer();
    tracer
        .in_span_async(
            "entity_get",
            format!("Get {}", context.field_name),
            SpanVisibility::Internal,
            || {
                Box::pin(async {
                    let mut request = ODataRequest {
                        url,
                        headers: tracing_util::get_trace_headers(),
                    };
                    if let Some(pre_request) = &hooks.pre_request {
                        let Some(decorated) = pre_request.pre_request(context, request).await?
                        else {
                            tracing::debug!(
                                field = context.field_name,
                                "request dropped by the pre-request hook"
                            );
                            add_event_on_active_span("request dropped".to_string());
                            return Ok(None);
                        };
                        request = decorated;
                    }
                    set_attribute_on_active_span(
                        AttributeVisibility::Default,
                        "url",
                        request.url.clone(),
                    );

                    let parsed = reqwest::Url::parse(&request.url).map_err(|_| {
                        FieldError::InvalidUrl {
                            url: request.url.clone(),
                        }
                    })?;
                    let send = client.get(parsed).headers(request.headers).send();
                    let response = tokio::select! {
                        biased;
                        () = cancellation.cancelled() => return Err(FieldError::Cancelled),
                        response = send => response?,
                    };
                    classify(request.url, response, cancellation).await.map(Some)
                })
            },
        )
        .await
}

async fn classify(
    url: String,
    response: reqwest::Response,
    cancellation: &CancellationToken,
) -> Result<Payload, FieldError> {
    let status = response.status();
    set_attribute_on_active_span(
        AttributeVisibility::Default,
        "status",
        i64::from(status.as_u16()),
    );
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    let body = tokio::select! {
        biased;
        () = cancellation.cancelled() => return Err(FieldError::Cancelled),
        body = response.bytes() => body?,
    };

    if status.is_success() {
        return Ok(match content_type {
            Some(content_type) if !is_json(&content_type) => Payload(format!(
                "data:{content_type};base64,{}",
                base64::engine::general_purpose::STANDARD.encode(&body)
            )),
            _ => Payload(String::from_utf8_lossy(&body).into_owned()),
        });
    }

    let details = serde_json::from_slice::<serde_json::Value>(&body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&body).into_owned()));
    let code = serde_json::from_value::<ErrorEnvelope>(details.clone())
        .ok()
        .and_then(|envelope| envelope.error.code);
    tracing::warn!(url = %url, status = %status, code = ?code, "OData request failed");

    if code.as_deref() == Some(REQUEST_DENIED) {
        Err(FieldError::Unauthorized { url, details })
    } else {
        Err(FieldError::Remote {
            url,
            status,
            details,
        })
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().ends_with("json"))
}
