// # DNS Backend Trait
//
// Defines the hosted zone API the DNS provider and the zone reaper are built on.
//
// ## Implementations
//
// - Route 53: `clusterup-provider-route53` crate
// - In-memory: `clusterup_core::dns::MemoryDnsBackend` (tests)
//
// ## Change Semantics
//
// Changes are `CREATE` and `DELETE` actions against a zone's record sets,
// matched by (name, type, TTL, values). A change batch is applied atomically:
// either every change lands or none does.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A hosted zone as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedZone {
    /// Backend zone identifier
    pub id: String,
    /// Fully-qualified zone name
    pub name: String,
}

/// DNS record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
    /// CNAME record
    Cname,
    /// Name server delegation
    Ns,
    /// Start of authority
    Soa,
    /// TXT record
    Txt,
    /// Any other type, kept verbatim
    Other(String),
}

impl RecordType {
    /// Wire spelling of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
            RecordType::Soa => "SOA",
            RecordType::Txt => "TXT",
            RecordType::Other(other) => other,
        }
    }

    /// Parse a wire spelling
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "NS" => RecordType::Ns,
            "SOA" => RecordType::Soa,
            "TXT" => RecordType::Txt,
            _ => RecordType::Other(value.to_string()),
        }
    }

    /// Whether the zone itself owns records of this type
    ///
    /// `NS` and `SOA` records are never deleted by this crate.
    pub fn is_zone_owned(&self) -> bool {
        matches!(self, RecordType::Ns | RecordType::Soa)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record set (name, type, TTL and its values)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Fully-qualified record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time-to-live, absent for alias records
    pub ttl: Option<i64>,
    /// Record values, empty for alias records
    pub values: Vec<String>,
    /// Alias target, for provider alias records
    pub alias: Option<AliasTarget>,
}

/// Target of an alias record set
///
/// Alias records are never published here; they are carried so cleanup can
/// delete them before deleting their zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    /// Hosted zone of the target
    pub hosted_zone_id: String,
    /// DNS name of the target
    pub dns_name: String,
    /// Whether the target's health is evaluated
    pub evaluate_target_health: bool,
}

impl RecordSet {
    /// Create a single-value `A` record set
    pub fn a(name: impl Into<String>, ttl: i64, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            ttl: Some(ttl),
            values: vec![value.into()],
            alias: None,
        }
    }
}

/// Change action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create a record set that does not exist yet
    Create,
    /// Delete an existing record set, matched on every field
    Delete,
}

impl ChangeAction {
    /// Wire spelling of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
        }
    }
}

/// One entry of a change batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChange {
    /// What to do
    pub action: ChangeAction,
    /// Record set the action applies to
    pub record: RecordSet,
}

impl RecordChange {
    /// Create a `CREATE` change
    pub fn create(record: RecordSet) -> Self {
        Self {
            action: ChangeAction::Create,
            record,
        }
    }

    /// Create a `DELETE` change
    pub fn delete(record: RecordSet) -> Self {
        Self {
            action: ChangeAction::Delete,
            record,
        }
    }
}

/// Trait for hosted zone API implementations
///
/// Backends are thin: one API operation per call, no caching, no retries.
/// Zone resolution, ambiguity checks and idempotent cleanup live in
/// [`crate::dns::HostedZoneProvider`] and [`crate::dns::ZoneReaper`].
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// List every hosted zone whose name equals `name`
    ///
    /// `name` is fully qualified. An empty list means no such zone; more
    /// than one entry is a provider-side inconsistency the caller reports.
    async fn find_zones(&self, name: &str) -> Result<Vec<HostedZone>, crate::Error>;

    /// List all record sets of a zone
    async fn list_records(&self, zone_id: &str) -> Result<Vec<RecordSet>, crate::Error>;

    /// Apply a change batch to a zone
    async fn change_records(
        &self,
        zone_id: &str,
        changes: Vec<RecordChange>,
    ) -> Result<(), crate::Error>;

    /// Delete an empty hosted zone
    async fn delete_zone(&self, zone_id: &str) -> Result<(), crate::Error>;

    /// Backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}
