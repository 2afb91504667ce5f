use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;
use tracing_util::{set_attribute_on_active_span, AttributeVisibility, SpanVisibility};

use crate::error::Error;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Per-key single-flight slots: concurrent first callers for a key share one initialization.
/// A failed initialization leaves the slot empty, so the next caller tries again.
pub(crate) struct Slots<T> {
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Slots<T> {
    pub fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.to_string()).or_default().clone()
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    pub fn remove(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
    }
}

/// Fetches and caches the metadata document of each OData service, keyed by base URL.
pub struct MetadataFetcher {
    client: reqwest::Client,
    documents: Slots<edm::EdmDocument>,
}

impl MetadataFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            documents: Slots::default(),
        }
    }

    /// The metadata document of the service at `base_url`, fetched on first use.
    pub async fn get_schema(&self, base_url: &str) -> Result<Arc<edm::EdmDocument>, Error> {
        let slot = self.documents.slot(base_url);
        slot.get_or_try_init(|| metadata_get(&self.client, base_url))
            .await
            .cloned()
    }

    /// Forgets the cached document; the next [`MetadataFetcher::get_schema`] fetches it again.
    pub fn invalidate(&self, base_url: &str) {
        self.documents.remove(base_url);
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// GET on the `$metadata` endpoint of a service
async fn metadata_get(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Arc<edm::EdmDocument>, Error> {
    let url = format!("{}/$metadata", base_url.trim_end_matches('/'));
    let tracer = tracing_util::global_tracer();
    tracer
        .in_span_async(
            "metadata_get",
            format!("Get metadata of {base_url}"),
            SpanVisibility::Internal,
            || {
                Box::pin(async {
                    set_attribute_on_active_span(AttributeVisibility::Default, "url", url.clone());
                    let response = client
                        .get(&url)
                        .headers(tracing_util::get_trace_headers())
                        .send()
                        .await
                        .map_err(|source| Error::MetadataFetch {
                            url: url.clone(),
                            source,
                        })?;

                    let status = response.status();
                    set_attribute_on_active_span(
                        AttributeVisibility::Default,
                        "status",
                        i64::from(status.as_u16()),
                    );
                    if !status.is_success() {
                        tracing::warn!(url = %url, status = %status, "metadata request failed");
                        return Err(Error::MetadataStatus {
                            url: url.clone(),
                            status,
                        });
                    }

                    let text = response
                        .text()
                        .await
                        .map_err(|source| Error::MetadataFetch {
                            url: url.clone(),
                            source,
                        })?;
                    let document = edm::EdmDocument::parse(&text).map_err(|source| {
                        Error::MetadataParse {
                            url: url.clone(),
                            source,
                        }
                    })?;
                    tracing::debug!(url = %url, "fetched metadata");
                    Ok(Arc::new(document))
                })
            },
        )
        .await
}
