// # OpenStack Floating IP Provisioner
//
// Implements `clusterup_core::traits::NetworkProvisioner` on top of the
// `openstack` command line client.
//
// ## Commands
//
// - allocate: `openstack --os-cloud <tenant> floating ip create -f json --description <d> <network>`
// - bind:     `openstack --os-cloud <tenant> floating ip set --port <port> <address>`
// - release:  `floating ip list -f json --long`, then one `floating ip delete <id>...`
//
// Every address carries the description `cluster: <name> , <record>`, which
// is how release finds the addresses of one cluster.
//
// The tenant is always passed with `--os-cloud`; the ambient `OS_CLOUD`
// variable is removed from the child environment.

use async_trait::async_trait;
use clusterup_core::exec;
use clusterup_core::traits::network::cluster_tag;
use clusterup_core::traits::{AllocationRequest, NetworkProvisioner};
use clusterup_core::{Error, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Default client executable
const DEFAULT_PROGRAM: &str = "openstack";

/// Output of `floating ip create -f json`
#[derive(Debug, Deserialize)]
struct CreatedFloatingIp {
    floating_ip_address: String,
}

/// One row of `floating ip list -f json --long`
#[derive(Debug, Deserialize)]
struct ListedFloatingIp {
    #[serde(rename = "ID")]
    id: String,

    #[serde(rename = "Floating IP Address", default)]
    address: Option<String>,

    #[serde(rename = "Description", default)]
    description: Option<String>,
}

/// Floating IP provisioner driving the `openstack` CLI
#[derive(Debug, Clone)]
pub struct OpenStackCli {
    program: PathBuf,
}

impl Default for OpenStackCli {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenStackCli {
    /// Use `openstack` from `PATH`
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Use a specific client executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, tenant: &str) -> Command {
        let mut cmd = exec::command(&self.program);
        cmd.arg("--os-cloud").arg(tenant);
        cmd
    }
}

#[async_trait]
impl NetworkProvisioner for OpenStackCli {
    async fn allocate(&self, request: &AllocationRequest) -> Result<IpAddr> {
        let description = request.description();
        let mut cmd = self.command(&request.tenant);
        cmd.args(["floating", "ip", "create", "-f", "json", "--description"])
            .arg(&description)
            .arg(&request.network);

        let stdout = exec::run_captured(&mut cmd, "floating ip create")
            .await
            .map_err(|e| Error::allocation(format!("{}: {}", description, e)))?;

        let address = parse_created_address(&stdout)?;
        info!(description = %description, address = %address, "Floating IP created");
        Ok(address)
    }

    async fn bind_port(&self, tenant: &str, port: &str, address: IpAddr) -> Result<()> {
        let mut cmd = self.command(tenant);
        cmd.args(["floating", "ip", "set", "--port", port])
            .arg(address.to_string());

        exec::run_captured(&mut cmd, "floating ip set").await?;
        info!(port = %port, address = %address, "Floating IP bound");
        Ok(())
    }

    async fn release(&self, cluster_name: &str, tenant: &str) -> Result<()> {
        let mut list = self.command(tenant);
        list.args(["floating", "ip", "list", "-f", "json", "--long"]);

        let stdout = exec::run_captured(&mut list, "floating ip list")
            .await
            .map_err(|e| Error::release(format!("Cannot list floating IPs: {}", e)))?;

        let ids = tagged_floating_ips(&stdout, cluster_name)?;
        if ids.is_empty() {
            info!(cluster = %cluster_name, "No floating IPs to release");
            return Ok(());
        }

        debug!(cluster = %cluster_name, ids = ?ids, "Releasing floating IPs");
        let mut delete = self.command(tenant);
        delete.args(["floating", "ip", "delete"]).args(&ids);

        exec::run_captured(&mut delete, "floating ip delete")
            .await
            .map_err(|e| Error::release(format!("Cannot delete floating IPs of {}: {}", cluster_name, e)))?;

        info!(cluster = %cluster_name, count = ids.len(), "Floating IPs released");
        Ok(())
    }

    fn provisioner_name(&self) -> &'static str {
        "openstack"
    }
}

fn parse_created_address(stdout: &str) -> Result<IpAddr> {
    let created: CreatedFloatingIp = serde_json::from_str(stdout)
        .map_err(|e| Error::allocation(format!("Unexpected floating ip create output: {}", e)))?;

    created
        .floating_ip_address
        .parse()
        .map_err(|_| Error::allocation(format!("Invalid floating IP address: {}", created.floating_ip_address)))
}

/// IDs of every floating IP tagged for `cluster_name`
fn tagged_floating_ips(stdout: &str, cluster_name: &str) -> Result<Vec<String>> {
    let listed: Vec<ListedFloatingIp> = serde_json::from_str(stdout)
        .map_err(|e| Error::release(format!("Unexpected floating ip list output: {}", e)))?;

    let tag = cluster_tag(cluster_name);
    Ok(listed
        .into_iter()
        .filter(|ip| {
            ip.description
                .as_deref()
                .is_some_and(|d| d.starts_with(&tag))
        })
        .inspect(|ip| debug!(id = %ip.id, address = ?ip.address, "Tagged floating IP"))
        .map(|ip| ip.id)
        .collect())
}
