//! Core traits for the cluster lifecycle
//!
//! This module defines the seams between the orchestrator and the outside world.
//!
//! - [`DnsBackend`]: Hosted zone API (zones, record sets, change batches)
//! - [`DnsProvider`]: Publish and withdraw one cluster's `A` records
//! - [`NetworkProvisioner`]: Allocate, bind and release floating addresses
//! - [`InstallerDriver`], [`BinaryFetcher`], [`PostInstallHooks`]: The installer and its companions

pub mod dns_backend;
pub mod dns_provider;
pub mod installer;
pub mod network;

pub use dns_backend::{
    AliasTarget, ChangeAction, DnsBackend, HostedZone, RecordChange, RecordSet,
    RecordType,
};
pub use dns_provider::DnsProvider;
pub use installer::{BinaryFetcher, InstallerDriver, PostInstallHooks};
pub use network::{AddressPair, AllocationRequest, NetworkProvisioner};
