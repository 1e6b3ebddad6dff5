//! Legacy zone reaper
//!
//! An external cluster reaper destroys compute resources but leaves DNS
//! behind: the per-cluster subzone, plus the API and wildcard ingress records
//! in the parent zone. A reinstall then fails on the leftovers. The reaper
//! removes them.
//!
//! Every operation is safe to repeat against partially cleaned-up state.

use super::find_unique_zone;
use super::names::{canonical, fqdn, ClusterDomain};
use crate::error::{Error, Result};
use crate::traits::{DnsBackend, RecordChange, RecordType};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of [`ZoneReaper::delete_zone`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneDeletion {
    /// No zone had the name; nothing was done
    Absent,
    /// The zone was emptied and deleted
    Deleted {
        /// Number of record sets removed before deleting the zone
        records_removed: usize,
    },
}

/// Outcome of [`ZoneReaper::delete_record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordDeletion {
    /// The zone exists but holds no such `A` record
    Absent,
    /// The record was deleted
    Deleted,
}

/// Deletes hosted zones and stray records
///
/// Unlike [`super::HostedZoneProvider`] the reaper can delete whole zones,
/// and it deletes records by what the zone currently holds rather than by a
/// remembered value.
pub struct ZoneReaper {
    backend: Arc<dyn DnsBackend>,
}

impl ZoneReaper {
    /// Create a reaper on top of a backend
    pub fn new(backend: Arc<dyn DnsBackend>) -> Self {
        Self { backend }
    }

    /// Delete a zone and every record it holds except `NS`/`SOA`
    ///
    /// An absent zone is a no-op, so repeated calls are safe.
    pub async fn delete_zone(&self, zone_name: &str) -> Result<ZoneDeletion> {
        let Some(zone) = find_unique_zone(self.backend.as_ref(), zone_name).await? else {
            debug!(zone = %fqdn(zone_name), "Could not find zone");
            return Ok(ZoneDeletion::Absent);
        };

        info!(zone = %zone.name, "Deleting zone");

        let changes: Vec<RecordChange> = self
            .backend
            .list_records(&zone.id)
            .await?
            .into_iter()
            .filter(|record| !record.record_type.is_zone_owned())
            .map(RecordChange::delete)
            .collect();

        let records_removed = changes.len();
        if !changes.is_empty() {
            for change in &changes {
                debug!(zone = %zone.name, record = %change.record.name, "Deleting record");
            }
            self.backend.change_records(&zone.id, changes).await?;
        }

        self.backend.delete_zone(&zone.id).await?;
        info!(zone = %zone.name, records_removed, "Zone has been deleted");

        Ok(ZoneDeletion::Deleted { records_removed })
    }

    /// Delete the `A` record `record_name` from zone `zone_name`
    ///
    /// Both names are accepted with or without the trailing dot.
    ///
    /// # Returns
    ///
    /// - `Ok(RecordDeletion::Absent)`: the zone has no such record
    /// - `Err(Error::ZoneNotFound)`: the zone itself is absent
    pub async fn delete_record(&self, zone_name: &str, record_name: &str) -> Result<RecordDeletion> {
        let zone_name = fqdn(zone_name);
        let record_name = fqdn(record_name);

        let zone = find_unique_zone(self.backend.as_ref(), &zone_name)
            .await?
            .ok_or_else(|| Error::zone_not_found(format!("Could not find zone for {}", zone_name)))?;

        let wanted = canonical(&record_name);
        let record = self
            .backend
            .list_records(&zone.id)
            .await?
            .into_iter()
            .find(|r| r.record_type == RecordType::A && canonical(&r.name) == wanted);

        let Some(record) = record else {
            debug!(zone = %zone_name, record = %record_name, "Could not find record");
            return Ok(RecordDeletion::Absent);
        };

        let name = record.name.clone();
        self.backend
            .change_records(&zone.id, vec![RecordChange::delete(record)])
            .await?;
        info!(zone = %zone_name, record = %name, "Record has been deleted");

        Ok(RecordDeletion::Deleted)
    }

    /// Remove everything a reaped cluster may have left in DNS
    ///
    /// Deletes the cluster subzone, then the API and wildcard ingress records
    /// from the base domain's zone. An absent base zone is logged and
    /// swallowed; any other failure propagates.
    pub async fn cleanup_cluster(&self, domain: &ClusterDomain) -> Result<()> {
        info!(zone = %domain, "Cleaning old DNS names");

        self.delete_zone(&domain.zone_name()).await?;

        for record in [domain.stray_api_record(), domain.stray_apps_record()] {
            match self.delete_record(domain.base_domain(), &record).await {
                Ok(_) => {}
                Err(e) if e.is_zone_not_found() => {
                    warn!(zone = %domain.base_zone(), record = %record, "Base zone not found, skipping record cleanup");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}
