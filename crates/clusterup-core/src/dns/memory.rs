// # Memory DNS Backend
//
// In-memory implementation of DnsBackend.
//
// ## Purpose
//
// Provides a hosted zone store that behaves like the real API where it
// matters to the lifecycle, without a cloud account:
//
// - New zones start with an `NS` and an `SOA` record
// - `CREATE` of an existing record set fails
// - `DELETE` must match name, type, TTL and values exactly
// - A change batch applies atomically
// - A zone can only be deleted once it holds nothing but `NS`/`SOA`
// - Wildcard labels are listed in escaped form (`\052`)
//
// Several zones may share a name, which is how an ambiguous lookup is
// reproduced.
//
// Every successful mutation is journaled so callers can assert what was
// (or was not) changed.

use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use super::names::canonical;
use crate::traits::{ChangeAction, DnsBackend, HostedZone, RecordChange, RecordSet, RecordType};
use crate::{Error, Result};

const BACKEND_NAME: &str = "memory";

/// One successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsMutation {
    /// A record set change
    Change {
        /// Zone name
        zone: String,
        /// Action applied
        action: ChangeAction,
        /// Record name as stored
        name: String,
        /// Record type
        record_type: RecordType,
        /// Record values
        values: Vec<String>,
    },
    /// A zone deletion
    DeleteZone {
        /// Zone name
        zone: String,
    },
}

#[derive(Debug, Clone)]
struct MemoryZone {
    id: String,
    name: String,
    records: Vec<RecordSet>,
}

#[derive(Debug, Default)]
struct MemoryState {
    zones: Vec<MemoryZone>,
    next_id: u64,
    journal: Vec<DnsMutation>,
}

/// In-memory DNS backend
///
/// Clones share the same store.
///
/// # Example
///
/// ```rust,no_run
/// use clusterup_core::dns::MemoryDnsBackend;
///
/// #[tokio::main]
/// async fn main() {
///     let backend = MemoryDnsBackend::new();
///     backend.add_zone("example.com").await;
///     assert!(backend.zone_exists("example.com.").await);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDnsBackend {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryDnsBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zone and return its identifier
    ///
    /// Adding a name twice creates two zones with that name.
    pub async fn add_zone(&self, name: &str) -> String {
        let mut state = self.inner.write().await;
        state.next_id += 1;
        let id = format!("/hostedzone/Z{:06}", state.next_id);
        let name = canonical(name);

        let records = vec![
            RecordSet {
                name: name.clone(),
                record_type: RecordType::Ns,
                ttl: Some(172800),
                values: vec!["ns-1.awsdns-00.com.".to_string()],
                alias: None,
            },
            RecordSet {
                name: name.clone(),
                record_type: RecordType::Soa,
                ttl: Some(900),
                values: vec![
                    "ns-1.awsdns-00.com. awsdns-hostmaster.amazon.com. 1 7200 900 1209600 86400"
                        .to_string(),
                ],
                alias: None,
            },
        ];

        state.zones.push(MemoryZone {
            id: id.clone(),
            name,
            records,
        });
        id
    }

    /// Insert a record set directly, bypassing the journal
    pub async fn insert_record(&self, zone_name: &str, mut record: RecordSet) {
        let wanted = canonical(zone_name);
        record.name = canonical(&record.name);
        let mut state = self.inner.write().await;
        if let Some(zone) = state.zones.iter_mut().find(|z| z.name == wanted) {
            zone.records.push(record);
        }
    }

    /// Drop every zone with this name, bypassing every check and the journal
    pub async fn remove_zone_unchecked(&self, zone_name: &str) {
        let wanted = canonical(zone_name);
        self.inner.write().await.zones.retain(|z| z.name != wanted);
    }

    /// Record sets of the first zone with this name
    pub async fn records(&self, zone_name: &str) -> Option<Vec<RecordSet>> {
        let wanted = canonical(zone_name);
        let state = self.inner.read().await;
        state
            .zones
            .iter()
            .find(|z| z.name == wanted)
            .map(|z| z.records.clone())
    }

    /// Whether a zone with this name exists
    pub async fn zone_exists(&self, zone_name: &str) -> bool {
        let wanted = canonical(zone_name);
        self.inner.read().await.zones.iter().any(|z| z.name == wanted)
    }

    /// Every successful mutation, oldest first
    pub async fn mutations(&self) -> Vec<DnsMutation> {
        self.inner.read().await.journal.clone()
    }

    fn apply(zone: &mut MemoryZone, change: &RecordChange) -> Result<()> {
        let mut record = change.record.clone();
        record.name = canonical(&record.name);

        if record.name != zone.name && !record.name.ends_with(&format!(".{}", zone.name)) {
            return Err(Error::dns(
                BACKEND_NAME,
                format!("{} is not in zone {}", record.name, zone.name),
            ));
        }

        match change.action {
            ChangeAction::Create => {
                let exists = zone
                    .records
                    .iter()
                    .any(|r| r.name == record.name && r.record_type == record.record_type);
                if exists {
                    return Err(Error::dns(
                        BACKEND_NAME,
                        format!(
                            "Tried to create resource record set {} type {} but it already exists",
                            record.name, record.record_type
                        ),
                    ));
                }
                zone.records.push(record);
            }
            ChangeAction::Delete => {
                let position = zone.records.iter().position(|r| *r == record).ok_or_else(|| {
                    Error::dns(
                        BACKEND_NAME,
                        format!(
                            "Tried to delete resource record set {} type {} but it was not found",
                            record.name, record.record_type
                        ),
                    )
                })?;
                zone.records.remove(position);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DnsBackend for MemoryDnsBackend {
    async fn find_zones(&self, name: &str) -> Result<Vec<HostedZone>> {
        let wanted = canonical(name);
        let state = self.inner.read().await;
        Ok(state
            .zones
            .iter()
            .filter(|z| z.name == wanted)
            .map(|z| HostedZone {
                id: z.id.clone(),
                name: z.name.clone(),
            })
            .collect())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        let state = self.inner.read().await;
        state
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .map(|z| z.records.clone())
            .ok_or_else(|| Error::dns(BACKEND_NAME, format!("No hosted zone found with ID: {}", zone_id)))
    }

    async fn change_records(&self, zone_id: &str, changes: Vec<RecordChange>) -> Result<()> {
        let mut state = self.inner.write().await;
        let zone = state
            .zones
            .iter_mut()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| Error::dns(BACKEND_NAME, format!("No hosted zone found with ID: {}", zone_id)))?;

        // Apply to a copy so a failing batch leaves the zone untouched
        let mut staged = zone.clone();
        for change in &changes {
            Self::apply(&mut staged, change)?;
        }
        let zone_name = staged.name.clone();
        *zone = staged;

        for change in changes {
            state.journal.push(DnsMutation::Change {
                zone: zone_name.clone(),
                action: change.action,
                name: canonical(&change.record.name),
                record_type: change.record.record_type,
                values: change.record.values,
            });
        }

        Ok(())
    }

    async fn delete_zone(&self, zone_id: &str) -> Result<()> {
        let mut state = self.inner.write().await;
        let position = state
            .zones
            .iter()
            .position(|z| z.id == zone_id)
            .ok_or_else(|| Error::dns(BACKEND_NAME, format!("No hosted zone found with ID: {}", zone_id)))?;

        if state.zones[position]
            .records
            .iter()
            .any(|r| !r.record_type.is_zone_owned())
        {
            return Err(Error::dns(
                BACKEND_NAME,
                format!("The specified hosted zone {} contains non-required resource record sets", zone_id),
            ));
        }

        let zone = state.zones.remove(position);
        state.journal.push(DnsMutation::DeleteZone { zone: zone.name });
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}
