use crate::types::{TaxResolver, TaxValue, TaxValueMap};
use futures::stream::{self, StreamExt};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, instrument};

/// Drives the tax resolver across a whole batch of addresses with bounded
/// concurrency. The engine owns the fan-out for exactly one `enrich` call and
/// returns only once every address has a result; individual lookups degrade
/// to `TaxValue::Unresolved` without affecting the rest of the batch.
pub struct EnrichmentEngine {
    resolver: Arc<dyn TaxResolver>,
    concurrency: usize,
}

impl EnrichmentEngine {
    pub fn new(resolver: Arc<dyn TaxResolver>, concurrency: usize) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve every address in the batch. The returned map holds exactly one
    /// entry per distinct input address. Duplicate addresses are each resolved
    /// independently and collapse to whichever result lands last — a known
    /// limitation, kept for parity with how the raw table is keyed.
    #[instrument(skip(self, addresses), fields(batch_size = addresses.len()))]
    pub async fn enrich(&self, addresses: &[String]) -> TaxValueMap {
        let results: TaxValueMap = stream::iter(addresses.iter().cloned())
            .map(|address| {
                let resolver = Arc::clone(&self.resolver);
                async move {
                    let value = resolver.resolve(&address).await;
                    (address, value)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let resolved = results.values().filter(|v| !v.is_unresolved()).count();
        let unresolved = results.len() - resolved;
        info!(
            "Enriched {} addresses: {} resolved, {} unresolved",
            results.len(),
            resolved,
            unresolved
        );
        counter!("listing_tax_resolved_total").increment(resolved as u64);
        counter!("listing_tax_unresolved_total").increment(unresolved as u64);

        results
    }
}
