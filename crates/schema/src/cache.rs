use std::sync::Arc;

use tracing_util::{SpanVisibility, Successful};

use crate::augment::AugmentTypes;
use crate::error::Error;
use crate::metadata::{MetadataFetcher, Slots};
use crate::registry::TypeRegistry;
use crate::stages;

/// Process-wide cache of type registries, keyed by service base URL.
///
/// Concurrent first requests for the same base URL share a single metadata fetch and a single
/// build. Failed builds are not cached.
pub struct RegistryCache {
    metadata: MetadataFetcher,
    registries: Slots<TypeRegistry>,
}

impl RegistryCache {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            metadata: MetadataFetcher::new(client),
            registries: Slots::default(),
        }
    }

    /// The registry of the service at `base_url`, built on first use. `prefix` and `augment`
    /// only matter for that first build.
    pub async fn get_or_build(
        &self,
        prefix: &str,
        base_url: &str,
        augment: Option<&dyn AugmentTypes>,
    ) -> Result<Arc<TypeRegistry>, Error> {
        let slot = self.registries.slot(base_url);
        slot.get_or_try_init(|| async {
            let edm = self.metadata.get_schema(base_url).await?;
            let tracer = tracing_util::global_tracer();
            tracer
                .in_span(
                    "build_types",
                    format!("Build types of {base_url}"),
                    SpanVisibility::Internal,
                    || stages::build(prefix, base_url, &edm, augment),
                )
                .map(Arc::new)
        })
        .await
        .cloned()
    }

    /// The registry of the service at `base_url`, if it has been built.
    pub fn get(&self, base_url: &str) -> Option<Arc<TypeRegistry>> {
        self.registries.get(base_url)
    }

    /// Like [`RegistryCache::get`], failing with a configuration error for unknown services.
    pub fn require(&self, base_url: &str) -> Result<Arc<TypeRegistry>, Error> {
        self.get(base_url).ok_or_else(|| Error::UnknownBaseUrl {
            base_url: base_url.to_string(),
        })
    }

    /// Drops the registry and the metadata document of the service at `base_url`. Holders of the
    /// old registry keep using it; the next [`RegistryCache::get_or_build`] starts over.
    pub fn invalidate(&self, base_url: &str) {
        let tracer = tracing_util::global_tracer();
        tracer
            .in_span(
                "invalidate_types",
                format!("Invalidate types of {base_url}"),
                SpanVisibility::Internal,
                || {
                    self.registries.remove(base_url);
                    self.metadata.invalidate(base_url);
                    Successful::new(())
                },
            )
            .into_inner();
        tracing::debug!(base_url, "invalidated type registry");
    }

    pub fn client(&self) -> &reqwest::Client {
        self.metadata.client()
    }
}
