//! Hosted zone DNS provider
//!
//! Publishes `A` records for one cluster into the hosted zone of its base
//! domain.

use super::names::ClusterDomain;
use super::find_unique_zone;
use crate::error::{Error, Result};
use crate::traits::{ChangeAction, DnsBackend, DnsProvider, RecordChange, RecordSet};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Default TTL of published records (in seconds)
pub const DEFAULT_TTL: i64 = 3600;

/// DNS provider for one cluster
///
/// # Zone Cache
///
/// `zone_id` holds the base domain's zone identifier after the first
/// successful resolution and is reused for the lifetime of this instance.
/// Instances are created per profile run and never shared across domains.
pub struct HostedZoneProvider {
    backend: Arc<dyn DnsBackend>,
    domain: ClusterDomain,
    ttl: i64,
    zone_id: OnceCell<String>,
}

impl std::fmt::Debug for HostedZoneProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedZoneProvider")
            .field("backend", &self.backend.backend_name())
            .field("domain", &self.domain)
            .field("ttl", &self.ttl)
            .field("zone_id", &self.zone_id.get())
            .finish()
    }
}

impl HostedZoneProvider {
    /// Create a provider for `domain` with the given record TTL
    pub fn new(backend: Arc<dyn DnsBackend>, domain: ClusterDomain, ttl: i64) -> Self {
        Self {
            backend,
            domain,
            ttl,
            zone_id: OnceCell::new(),
        }
    }

    /// Cluster naming this provider publishes for
    pub fn domain(&self) -> &ClusterDomain {
        &self.domain
    }

    /// Zone identifier, if already resolved
    pub fn cached_zone_id(&self) -> Option<&str> {
        self.zone_id.get().map(String::as_str)
    }

    async fn execute(&self, prefix: &str, action: ChangeAction, address: IpAddr) -> Result<()> {
        let zone_id = self.resolve_zone().await?;
        let record = RecordSet::a(self.domain.record_name(prefix), self.ttl, address.to_string());

        debug!(
            zone = %zone_id,
            record = %record.name,
            action = action.as_str(),
            "Submitting DNS change"
        );

        let change = RecordChange { action, record };
        self.backend.change_records(&zone_id, vec![change]).await
    }
}

#[async_trait]
impl DnsProvider for HostedZoneProvider {
    async fn resolve_zone(&self) -> Result<String> {
        let base_zone = self.domain.base_zone();
        let zone_id = self
            .zone_id
            .get_or_try_init(|| async {
                let zone = find_unique_zone(self.backend.as_ref(), &base_zone)
                    .await?
                    .ok_or_else(|| Error::zone_not_found(base_zone.clone()))?;
                debug!(zone = %zone.name, id = %zone.id, "Resolved hosted zone");
                Ok::<_, Error>(zone.id)
            })
            .await?;

        Ok(zone_id.clone())
    }

    async fn publish(&self, prefix: &str, address: IpAddr) -> Result<()> {
        self.execute(prefix, ChangeAction::Create, address).await?;
        info!(
            record = %self.domain.record_name(prefix),
            address = %address,
            "Published DNS record"
        );
        Ok(())
    }

    async fn withdraw(&self, prefix: &str, address: IpAddr) -> Result<()> {
        self.execute(prefix, ChangeAction::Delete, address).await?;
        info!(
            record = %self.domain.record_name(prefix),
            address = %address,
            "Withdrew DNS record"
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        self.backend.backend_name()
    }
}
