// # DNS
//
// Cluster-scoped DNS built on a [`DnsBackend`](crate::traits::DnsBackend):
//
// - [`HostedZoneProvider`]: publishes and withdraws the API and wildcard
//   ingress records of one cluster in its base domain's zone
// - [`ZoneReaper`]: deletes whole zones and stray records, idempotently,
//   used as the pre-install sweep and on uninstall
// - [`MemoryDnsBackend`]: in-process hosted zone store

pub mod memory;
pub mod names;
pub mod provider;
pub mod reaper;

pub use memory::{DnsMutation, MemoryDnsBackend};
pub use names::{canonical, fqdn, ClusterDomain, RecordRole, API_PREFIX, APPS_PREFIX, ESCAPED_WILDCARD};
pub use provider::HostedZoneProvider;
pub use reaper::{RecordDeletion, ZoneDeletion, ZoneReaper};

use crate::error::{Error, Result};
use crate::traits::{DnsBackend, HostedZone};

/// Look up the single zone named `name`
///
/// Zero matches is `Ok(None)`; more than one is `Error::AmbiguousZone`.
pub(crate) async fn find_unique_zone(
    backend: &dyn DnsBackend,
    name: &str,
) -> Result<Option<HostedZone>> {
    let name = fqdn(name);
    let mut zones = backend.find_zones(&name).await?;

    match zones.len() {
        0 => Ok(None),
        1 => Ok(zones.pop()),
        count => Err(Error::AmbiguousZone { name, count }),
    }
}
