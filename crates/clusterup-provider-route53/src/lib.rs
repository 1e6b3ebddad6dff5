// # Route 53 DNS Backend
//
// AWS Route 53 implementation of `clusterup_core::traits::DnsBackend`.
//
// ## Scope
//
// - Hosted zone lookup by exact name (`ListHostedZonesByName`)
// - Record set enumeration, following pagination (`ListResourceRecordSets`)
// - `CREATE` / `DELETE` change batches (`ChangeResourceRecordSets`)
// - Zone deletion (`DeleteHostedZone`)
//
// Zone caching, name normalization and the cleanup policy live in
// `clusterup-core`; this crate is a thin translation layer.
//
// ## Credentials
//
// Loaded through the standard AWS provider chain (`AWS_PROFILE`,
// `AWS_SHARED_CREDENTIALS_FILE`, environment keys, instance metadata).
// Credentials never appear in logs or `Debug` output.
//
// ## Alias Records
//
// Alias record sets are listed with their target and no values, so zone
// cleanup can delete them like any other record set.

use async_trait::async_trait;
use aws_sdk_route53::error::DisplayErrorContext;
use aws_sdk_route53::types::{
    AliasTarget as SdkAliasTarget, Change, ChangeAction as SdkChangeAction, ChangeBatch,
    ResourceRecord, ResourceRecordSet, RrType,
};
use aws_sdk_route53::Client;
use clusterup_core::dns::fqdn;
use clusterup_core::traits::{
    AliasTarget, ChangeAction, DnsBackend, HostedZone, RecordChange, RecordSet, RecordType,
};
use clusterup_core::{Error, Result};
use tracing::debug;

/// Backend name used in errors and logs
const PROVIDER: &str = "route53";

/// Route 53 DNS backend
pub struct Route53Backend {
    client: Client,
}

impl std::fmt::Debug for Route53Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Backend")
            .field("region", &self.client.config().region())
            .finish()
    }
}

impl Route53Backend {
    /// Wrap an existing SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build from shared AWS configuration
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }

    /// Build from the default AWS provider chain
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::from_config(&config)
    }
}

#[async_trait]
impl DnsBackend for Route53Backend {
    async fn find_zones(&self, name: &str) -> Result<Vec<HostedZone>> {
        let wanted = fqdn(name).to_ascii_lowercase();
        debug!(zone = %wanted, "Looking up hosted zone");

        let mut zones = Vec::new();
        let mut next_name = Some(wanted.clone());
        let mut next_id: Option<String> = None;

        // Results are sorted by name, so equal names are contiguous
        while let Some(dns_name) = next_name.take() {
            let output = self
                .client
                .list_hosted_zones_by_name()
                .dns_name(dns_name)
                .set_hosted_zone_id(next_id.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListHostedZonesByName", e))?;

            let mut past_wanted = false;
            for zone in output.hosted_zones() {
                if zone.name().eq_ignore_ascii_case(&wanted) {
                    zones.push(HostedZone {
                        id: zone.id().to_string(),
                        name: zone.name().to_string(),
                    });
                } else {
                    past_wanted = true;
                }
            }

            if output.is_truncated() && !past_wanted {
                next_name = output.next_dns_name().map(str::to_string);
                next_id = output.next_hosted_zone_id().map(str::to_string);
            }
        }

        debug!(zone = %wanted, count = zones.len(), "Hosted zone lookup done");
        Ok(zones)
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        let mut records = Vec::new();
        let mut start_name: Option<String> = None;
        let mut start_type: Option<RrType> = None;

        loop {
            let output = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id)
                .set_start_record_name(start_name.take())
                .set_start_record_type(start_type.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListResourceRecordSets", e))?;

            records.extend(output.resource_record_sets().iter().map(from_sdk_record));

            if !output.is_truncated() {
                break;
            }
            start_name = output.next_record_name().map(str::to_string);
            start_type = output.next_record_type().cloned();
            if start_name.is_none() {
                break;
            }
        }

        Ok(records)
    }

    async fn change_records(&self, zone_id: &str, changes: Vec<RecordChange>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let changes = changes
            .iter()
            .map(to_sdk_change)
            .collect::<Result<Vec<_>>>()?;
        let batch = ChangeBatch::builder()
            .set_changes(Some(changes))
            .build()
            .map_err(|e| Error::dns(PROVIDER, format!("Invalid change batch: {}", e)))?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| sdk_error("ChangeResourceRecordSets", e))?;

        debug!(zone = %zone_id, "Change batch submitted");
        Ok(())
    }

    async fn delete_zone(&self, zone_id: &str) -> Result<()> {
        self.client
            .delete_hosted_zone()
            .id(zone_id)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteHostedZone", e))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        PROVIDER
    }
}

fn sdk_error<E>(operation: &str, err: E) -> Error
where
    E: std::error::Error,
{
    Error::dns(PROVIDER, format!("{} failed: {}", operation, DisplayErrorContext(err)))
}

fn to_sdk_type(record_type: &RecordType) -> RrType {
    RrType::from(record_type.as_str())
}

fn to_sdk_change(change: &RecordChange) -> Result<Change> {
    let action = match change.action {
        ChangeAction::Create => SdkChangeAction::Create,
        ChangeAction::Delete => SdkChangeAction::Delete,
    };

    Change::builder()
        .action(action)
        .resource_record_set(to_sdk_record(&change.record)?)
        .build()
        .map_err(|e| Error::dns(PROVIDER, format!("Invalid change: {}", e)))
}

fn to_sdk_record(record: &RecordSet) -> Result<ResourceRecordSet> {
    let builder = ResourceRecordSet::builder()
        .name(fqdn(&record.name))
        .r#type(to_sdk_type(&record.record_type));

    if let Some(alias) = &record.alias {
        let target = SdkAliasTarget::builder()
            .hosted_zone_id(&alias.hosted_zone_id)
            .dns_name(&alias.dns_name)
            .evaluate_target_health(alias.evaluate_target_health)
            .build()
            .map_err(|e| Error::dns(PROVIDER, format!("Invalid alias target: {}", e)))?;

        return builder
            .alias_target(target)
            .build()
            .map_err(|e| Error::dns(PROVIDER, format!("Invalid record set: {}", e)));
    }

    let values = record
        .values
        .iter()
        .map(|value| {
            ResourceRecord::builder()
                .value(value)
                .build()
                .map_err(|e| Error::dns(PROVIDER, format!("Invalid record value: {}", e)))
        })
        .collect::<Result<Vec<_>>>()?;

    builder
        .set_ttl(record.ttl)
        .set_resource_records(Some(values))
        .build()
        .map_err(|e| Error::dns(PROVIDER, format!("Invalid record set: {}", e)))
}

fn from_sdk_record(set: &ResourceRecordSet) -> RecordSet {
    RecordSet {
        name: set.name().to_string(),
        record_type: RecordType::parse(set.r#type().as_str()),
        ttl: set.ttl(),
        values: set
            .resource_records()
            .iter()
            .map(|r| r.value().to_string())
            .collect(),
        alias: set.alias_target().map(|target| AliasTarget {
            hosted_zone_id: target.hosted_zone_id().to_string(),
            dns_name: target.dns_name().to_string(),
            evaluate_target_health: target.evaluate_target_health(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sdk_record_is_fully_qualified() {
        let record = RecordSet::a("api.foo.example.com", 3600, "10.0.0.1");
        let set = to_sdk_record(&record).unwrap();

        assert_eq!(set.name(), "api.foo.example.com.");
        assert_eq!(set.r#type(), &RrType::A);
        assert_eq!(set.ttl(), Some(3600));
        assert_eq!(set.resource_records().len(), 1);
        assert_eq!(set.resource_records()[0].value(), "10.0.0.1");
    }

    #[test]
    fn test_to_sdk_change_actions() {
        let record = RecordSet::a("*.apps.foo.example.com.", 3600, "10.0.0.2");

        let create = to_sdk_change(&RecordChange::create(record.clone())).unwrap();
        assert_eq!(create.action(), &SdkChangeAction::Create);

        let delete = to_sdk_change(&RecordChange::delete(record)).unwrap();
        assert_eq!(delete.action(), &SdkChangeAction::Delete);
    }

    #[test]
    fn test_from_sdk_record() {
        let set = ResourceRecordSet::builder()
            .name("\\052.apps.foo.example.com.")
            .r#type(RrType::A)
            .ttl(60)
            .resource_records(ResourceRecord::builder().value("10.0.0.2").build().unwrap())
            .build()
            .unwrap();

        let record = from_sdk_record(&set);
        assert_eq!(record.name, "\\052.apps.foo.example.com.");
        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.ttl, Some(60));
        assert_eq!(record.values, vec!["10.0.0.2".to_string()]);
    }

    #[test]
    fn test_zone_owned_types_survive_conversion() {
        let set = ResourceRecordSet::builder()
            .name("foo.example.com.")
            .r#type(RrType::Soa)
            .ttl(900)
            .resource_records(
                ResourceRecord::builder()
                    .value("ns-1.awsdns-00.com. awsdns-hostmaster.amazon.com. 1 7200 900 1209600 86400")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let record = from_sdk_record(&set);
        assert!(record.record_type.is_zone_owned());
    }

    #[test]
    fn test_alias_records_are_carried_for_deletion() {
        let set = ResourceRecordSet::builder()
            .name("console.foo.example.com.")
            .r#type(RrType::A)
            .alias_target(
                SdkAliasTarget::builder()
                    .hosted_zone_id("Z35SXDOTRQ7X7K")
                    .dns_name("foo-ext-123.us-east-1.elb.amazonaws.com.")
                    .evaluate_target_health(false)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let record = from_sdk_record(&set);
        assert!(record.values.is_empty());
        assert_eq!(record.ttl, None);
        let alias = record.alias.clone().unwrap();
        assert_eq!(alias.hosted_zone_id, "Z35SXDOTRQ7X7K");
        assert_eq!(alias.dns_name, "foo-ext-123.us-east-1.elb.amazonaws.com.");

        let sent = to_sdk_record(&record).unwrap();
        assert!(sent.resource_records().is_empty());
        assert_eq!(
            sent.alias_target().map(|t| t.dns_name()),
            Some("foo-ext-123.us-east-1.elb.amazonaws.com.")
        );
    }
}
