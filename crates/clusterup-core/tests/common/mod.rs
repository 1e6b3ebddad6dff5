//! Test doubles and common utilities for lifecycle contract tests
//!
//! Every double is cheaply cloneable: one clone is handed to the
//! orchestrator, the other stays with the test for assertions. Doubles
//! share a [`Journal`] so tests can check the order of external calls.

#![allow(dead_code)]

use async_trait::async_trait;
use clusterup_core::dns::MemoryDnsBackend;
use clusterup_core::error::{Error, Result};
use clusterup_core::traits::{
    AllocationRequest, BinaryFetcher, DnsBackend, HostedZone, InstallerDriver, NetworkProvisioner,
    PostInstallHooks, RecordChange, RecordSet,
};
use clusterup_core::{Collaborators, LifecycleEvent, Orchestrator, ProfileSet};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const API_ADDRESS: [u8; 4] = [10, 0, 0, 1];
pub const APPS_ADDRESS: [u8; 4] = [10, 0, 0, 2];
pub const INFRA_ID: &str = "foo-x7k2p";

pub const TEMPLATE: &str = "\
apiVersion: v1
baseDomain: {{baseDomain}}
metadata:
  name: {{clusterName}}
platform:
  openstack:
    cloud: {{osCloud}}
    externalNetwork: {{externalNetwork}}
    lbFloatingIP: {{lbFloatingIP}}
    ingressFloatingIP: {{ingressFloatingIP}}
pullSecret: '{{pullSecret}}'
";

pub const PULL_SECRET: &str = r#"{"auths":{"registry.example.com":{"auth":"c2VjcmV0"}}}"#;

/// Ordered log of external calls, shared by every double
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Position of the first entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// In-memory DNS backend that journals every mutation
#[derive(Debug, Clone)]
pub struct JournaledDns {
    pub inner: MemoryDnsBackend,
    journal: Journal,
}

impl JournaledDns {
    pub fn new(inner: MemoryDnsBackend, journal: Journal) -> Self {
        Self { inner, journal }
    }
}

#[async_trait]
impl DnsBackend for JournaledDns {
    async fn find_zones(&self, name: &str) -> Result<Vec<HostedZone>> {
        self.inner.find_zones(name).await
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RecordSet>> {
        self.inner.list_records(zone_id).await
    }

    async fn change_records(&self, zone_id: &str, changes: Vec<RecordChange>) -> Result<()> {
        for change in &changes {
            self.journal
                .record(format!("dns:{}:{}", change.action.as_str(), change.record.name));
        }
        self.inner.change_records(zone_id, changes).await
    }

    async fn delete_zone(&self, zone_id: &str) -> Result<()> {
        self.journal.record(format!("dns:DELETE_ZONE:{}", zone_id));
        self.inner.delete_zone(zone_id).await
    }

    fn backend_name(&self) -> &'static str {
        "journaled-memory"
    }
}

/// Network provisioner handing out addresses from a queue
#[derive(Debug, Clone)]
pub struct RecordingNetwork {
    journal: Journal,
    addresses: Arc<Mutex<VecDeque<IpAddr>>>,
    pub requests: Arc<Mutex<Vec<AllocationRequest>>>,
    pub bindings: Arc<Mutex<Vec<(String, String, IpAddr)>>>,
    pub releases: Arc<Mutex<Vec<(String, String)>>>,
    fail_binding: bool,
}

impl RecordingNetwork {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            addresses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            bindings: Arc::new(Mutex::new(Vec::new())),
            releases: Arc::new(Mutex::new(Vec::new())),
            fail_binding: false,
        }
    }

    /// Queue the api and apps addresses of one allocation round
    pub fn with_addresses(self, api: [u8; 4], apps: [u8; 4]) -> Self {
        {
            let mut queue = self.addresses.lock().unwrap();
            queue.push_back(IpAddr::from(api));
            queue.push_back(IpAddr::from(apps));
        }
        self
    }

    pub fn failing_binding(mut self) -> Self {
        self.fail_binding = true;
        self
    }

    pub fn allocation_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl NetworkProvisioner for RecordingNetwork {
    async fn allocate(&self, request: &AllocationRequest) -> Result<IpAddr> {
        self.journal.record(format!("network:allocate:{}", request.role));
        self.requests.lock().unwrap().push(request.clone());
        self.addresses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::allocation("No addresses left"))
    }

    async fn bind_port(&self, tenant: &str, port: &str, address: IpAddr) -> Result<()> {
        self.journal.record(format!("network:bind:{}", port));
        if self.fail_binding {
            return Err(Error::command_failed("floating ip set", Some(1), "No Port found"));
        }
        self.bindings
            .lock()
            .unwrap()
            .push((tenant.to_string(), port.to_string(), address));
        Ok(())
    }

    async fn release(&self, cluster_name: &str, tenant: &str) -> Result<()> {
        self.journal.record(format!("network:release:{}", cluster_name));
        self.releases
            .lock()
            .unwrap()
            .push((cluster_name.to_string(), tenant.to_string()));
        Ok(())
    }

    fn provisioner_name(&self) -> &'static str {
        "recording"
    }
}

/// Installer double that writes metadata on a successful create
#[derive(Debug, Clone)]
pub struct ScriptedInstaller {
    journal: Journal,
    create_status: Option<i32>,
    destroy_status: Option<i32>,
    creates: Arc<AtomicUsize>,
    destroys: Arc<AtomicUsize>,
    pub rendered: Arc<Mutex<Option<String>>>,
}

impl ScriptedInstaller {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            create_status: None,
            destroy_status: None,
            creates: Arc::new(AtomicUsize::new(0)),
            destroys: Arc::new(AtomicUsize::new(0)),
            rendered: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing_create(mut self, status: i32) -> Self {
        self.create_status = Some(status);
        self
    }

    pub fn failing_destroy(mut self, status: i32) -> Self {
        self.destroy_status = Some(status);
        self
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    pub fn rendered(&self) -> Option<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl InstallerDriver for ScriptedInstaller {
    async fn create_cluster(&self, _binary: &Path, install_dir: &Path) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.journal.record("installer:create");

        let config = std::fs::read_to_string(install_dir.join("install-config.yaml"))?;
        *self.rendered.lock().unwrap() = Some(config);

        if let Some(status) = self.create_status {
            return Err(Error::command_failed("create cluster", Some(status), ""));
        }

        write_metadata(install_dir)?;
        Ok(())
    }

    async fn destroy_cluster(&self, _binary: &Path, _install_dir: &Path) -> Result<()> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.journal.record("installer:destroy");

        match self.destroy_status {
            Some(status) => Err(Error::command_failed("destroy cluster", Some(status), "")),
            None => Ok(()),
        }
    }
}

/// Post-install hooks that only record their calls
#[derive(Debug, Clone)]
pub struct RecordingHooks {
    journal: Journal,
    fail: bool,
}

impl RecordingHooks {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn outcome(&self, entry: String) -> Result<()> {
        self.journal.record(entry);
        if self.fail {
            return Err(Error::command_failed("hook", Some(1), "script failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl PostInstallHooks for RecordingHooks {
    async fn scale_to_masters(&self, kubeconfig: &Path) -> Result<()> {
        self.outcome(format!("hook:scale:{}", kubeconfig.display()))
    }

    async fn install_router_certificate(&self, cluster_name: &str) -> Result<()> {
        self.outcome(format!("hook:router-cert:{}", cluster_name))
    }

    async fn add_htpasswd_users(&self, kubeconfig: &Path, htpasswd_file: &Path) -> Result<()> {
        self.outcome(format!(
            "hook:htpasswd:{}:{}",
            kubeconfig.display(),
            htpasswd_file.display()
        ))
    }
}

/// Fetcher returning a fixed path
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    path: PathBuf,
    calls: Arc<AtomicUsize>,
}

impl StaticFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BinaryFetcher for StaticFetcher {
    async fn fetch(&self, _version: &str, _channel: &str) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.path.clone())
    }
}

/// Write installer output the way a successful `create cluster` does
pub fn write_metadata(install_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(install_dir.join("auth"))?;
    std::fs::write(install_dir.join("auth").join("kubeconfig"), "apiVersion: v1\n")?;
    std::fs::write(
        install_dir.join("metadata.json"),
        format!(r#"{{"clusterName":"foo","clusterID":"c0ffee","infraID":"{}"}}"#, INFRA_ID),
    )?;
    Ok(())
}

/// Temporary workspace: config directory, template, pull secret, installs
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let config = root.path().join("config");
        std::fs::create_dir_all(&config).unwrap();
        std::fs::write(config.join("install-default.yaml"), TEMPLATE).unwrap();
        std::fs::write(config.join("pull.secret.json"), PULL_SECRET).unwrap();
        Self { root }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("config")
    }

    pub fn installs_dir(&self) -> PathBuf {
        self.root.path().join("installs")
    }

    pub fn install_dir(&self, cluster: &str) -> PathBuf {
        self.installs_dir().join(cluster)
    }

    /// Profile set with the given profile bodies (YAML, indented by 4)
    pub fn profiles(&self, profiles: &str) -> ProfileSet {
        let text = format!(
            "settings:\n  installs_dir: '{}'\nprofiles:\n{}",
            self.installs_dir().display(),
            profiles
        );
        ProfileSet::from_yaml_str(&text, self.config_dir()).unwrap()
    }

    /// The single `ci` profile: cluster `foo` on `example.com`
    pub fn single_profile(&self) -> ProfileSet {
        self.profiles(&profile_yaml("ci", "foo", ""))
    }

    /// Pretend `cluster` is already installed
    pub fn mark_installed(&self, cluster: &str) {
        write_metadata(&self.install_dir(cluster)).unwrap();
    }
}

/// YAML for one profile on `example.com`
pub fn profile_yaml(name: &str, cluster: &str, extra: &str) -> String {
    format!(
        "  {name}:
    template: default
    osCloud: psi
    baseDomain: example.com
    clusterName: {cluster}
    externalNetwork: public
    installerVersion: '4.6'
    pullRequestJsonFile: pull.secret.json
{extra}"
    )
}

/// Orchestrator plus handles on every double it drives
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub events: mpsc::Receiver<LifecycleEvent>,
    pub journal: Journal,
    pub dns: MemoryDnsBackend,
    pub network: RecordingNetwork,
    pub installer: ScriptedInstaller,
    pub fetcher: StaticFetcher,
}

impl Harness {
    pub fn new(
        profiles: ProfileSet,
        dns: MemoryDnsBackend,
        journal: Journal,
        network: RecordingNetwork,
        installer: ScriptedInstaller,
        hooks: RecordingHooks,
    ) -> Self {
        let fetcher = StaticFetcher::new("/opt/openshift-install");
        let collaborators = Collaborators {
            dns: Arc::new(JournaledDns::new(dns.clone(), journal.clone())),
            network: Box::new(network.clone()),
            installer: Box::new(installer.clone()),
            fetcher: Box::new(fetcher.clone()),
            hooks: Box::new(hooks),
        };

        let (orchestrator, events) =
            Orchestrator::new(profiles, collaborators, 256).expect("orchestrator construction succeeds");

        Self {
            orchestrator,
            events,
            journal,
            dns,
            network,
            installer,
            fetcher,
        }
    }

    /// Harness with default doubles and one round of addresses
    pub fn standard(profiles: ProfileSet, dns: MemoryDnsBackend) -> Self {
        let journal = Journal::default();
        Self::new(
            profiles,
            dns,
            journal.clone(),
            RecordingNetwork::new(journal.clone()).with_addresses(API_ADDRESS, APPS_ADDRESS),
            ScriptedInstaller::new(journal.clone()),
            RecordingHooks::new(journal),
        )
    }

    /// Drain every event emitted so far
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// DNS backend holding only the `example.com` base zone
pub async fn base_zone_backend() -> MemoryDnsBackend {
    let backend = MemoryDnsBackend::new();
    backend.add_zone("example.com").await;
    backend
}
