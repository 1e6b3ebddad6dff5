// # Network Resource Provisioner Trait
//
// Floating address allocation is an external collaborator. Each allocation
// is an independent request for one role; release is cluster-scoped and
// frees every address tagged for the cluster in one call.
//
// Allocation and release failures are distinct errors
// (`Error::AllocationFailed` / `Error::ReleaseFailed`) so callers can
// pick different recovery paths.

use crate::dns::{ClusterDomain, RecordRole};
use async_trait::async_trait;
use std::net::IpAddr;

/// The two floating addresses of one cluster
///
/// Run-scoped: kept for the duration of a provisioning attempt so the
/// published records can be withdrawn by value, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPair {
    /// API load balancer address
    pub api: IpAddr,
    /// Wildcard ingress address
    pub apps: IpAddr,
}

impl AddressPair {
    /// Address serving a role
    pub fn for_role(&self, role: RecordRole) -> IpAddr {
        match role {
            RecordRole::Api => self.api,
            RecordRole::Apps => self.apps,
        }
    }
}

/// One floating address request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Cluster naming
    pub domain: ClusterDomain,
    /// Cloud tenant
    pub tenant: String,
    /// External network to allocate from
    pub network: String,
    /// Role the address will serve
    pub role: RecordRole,
}

impl AllocationRequest {
    /// Human-readable description attached to the address
    ///
    /// Embeds the cluster name and the record the address serves, e.g.
    /// `cluster: foo , api.foo.example.com`.
    pub fn description(&self) -> String {
        format!(
            "{}{}.{}",
            cluster_tag(self.domain.cluster_name()),
            self.role.prefix(),
            self.domain.zone_name()
        )
    }
}

/// Description prefix shared by every address of one cluster
pub fn cluster_tag(cluster_name: &str) -> String {
    format!("cluster: {} , ", cluster_name)
}

/// Trait for network resource provisioners
#[async_trait]
pub trait NetworkProvisioner: Send + Sync {
    /// Allocate one floating address
    async fn allocate(&self, request: &AllocationRequest) -> Result<IpAddr, crate::Error>;

    /// Attach an allocated address to a network port
    async fn bind_port(
        &self,
        tenant: &str,
        port: &str,
        address: IpAddr,
    ) -> Result<(), crate::Error>;

    /// Release every address tagged for a cluster
    async fn release(&self, cluster_name: &str, tenant: &str) -> Result<(), crate::Error>;

    /// Provisioner name (for logging/debugging)
    fn provisioner_name(&self) -> &'static str;
}
