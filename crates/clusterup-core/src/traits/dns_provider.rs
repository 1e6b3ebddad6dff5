// # DNS Provider Trait
//
// Defines the interface the orchestrator uses to publish one cluster's
// records.
//
// A provider is parameterized by cluster name and base domain at
// construction and manages two record classes in the base domain's zone:
// `api.<cluster>.<domain>` and `*.apps.<cluster>.<domain>`, each a single
// `A` record.
//
// ## Usage
//
// ```rust,ignore
// use clusterup_core::dns::{HostedZoneProvider, API_PREFIX};
// use clusterup_core::DnsProvider;
//
// let provider = HostedZoneProvider::new(backend, domain, 3600);
// provider.publish(API_PREFIX, "10.0.0.1".parse()?).await?;
// provider.withdraw(API_PREFIX, "10.0.0.1".parse()?).await?;
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for DNS provider implementations
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the identifier of the base domain's hosted zone
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The zone identifier
    /// - `Err(Error::ZoneNotFound)`: No zone carries the base domain
    /// - `Err(Error::AmbiguousZone)`: More than one zone carries it
    async fn resolve_zone(&self) -> Result<String, crate::Error>;

    /// Publish `<prefix>.<cluster>.<domain>.` as an `A` record
    async fn publish(&self, prefix: &str, address: IpAddr) -> Result<(), crate::Error>;

    /// Withdraw a record published by [`DnsProvider::publish`]
    ///
    /// `address` must be the exact published value: the change is matched
    /// on value, not only on name.
    async fn withdraw(&self, prefix: &str, address: IpAddr) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
