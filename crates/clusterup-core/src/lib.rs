// # clusterup-core
//
// Core library for provisioning and tearing down installer-driven clusters.
//
// ## Architecture Overview
//
// - **Orchestrator**: drives each profile through install / uninstall
// - **DnsBackend**: thin trait over a DNS API (zones, record sets, change batches)
// - **HostedZoneProvider**: publishes and withdraws a cluster's `A` records
// - **ZoneReaper**: idempotent deletion of zones and stray records
// - **TemplateRenderer**: turns a profile plus addresses into `install-config.yaml`
// - **NetworkProvisioner / InstallerDriver / BinaryFetcher / PostInstallHooks**:
//   external collaborators, implemented in plugin crates
//
// ## Recovery Model
//
// Nothing is rolled back on failure. Every cleanup operation is idempotent,
// so re-running uninstall converges a partially provisioned account.

pub mod config;
pub mod dns;
pub mod error;
pub mod exec;
pub mod install_dir;
pub mod lifecycle;
pub mod template;
pub mod traits;

// Re-export core types for convenience
pub use config::{Profile, ProfileSet, Settings};
pub use dns::{ClusterDomain, HostedZoneProvider, MemoryDnsBackend, RecordRole, ZoneReaper};
pub use error::{Error, Result};
pub use install_dir::{InstallDir, InstallMetadata, InstallStatus};
pub use lifecycle::{
    Collaborators, LifecycleEvent, LifecycleState, Orchestrator, ProfileOutcome, ProfileStatus,
    RunOptions, RunReport,
};
pub use template::TemplateRenderer;
pub use traits::{
    AddressPair, AllocationRequest, BinaryFetcher, DnsBackend, DnsProvider, InstallerDriver,
    NetworkProvisioner, PostInstallHooks,
};
