//! Cluster lifecycle orchestrator
//!
//! The [`Orchestrator`] drives one profile at a time through its lifecycle:
//!
//! ```text
//!                 ┌────────────┐  uninstall requested  ┌──────────────┐
//!   install dir ▶ │ Already    │ ────────────────────▶ │ Uninstalling │
//!                 │ Installed  │                       └──────────────┘
//!                 └────────────┘                              │
//!                       │ otherwise                           │ unless uninstall-only
//!                       ▼                                     ▼
//!                 AlreadyExists          ┌───────┐     ┌──────────────┐
//!   no install dir ────────────────────▶ │ Fresh │ ──▶ │ Provisioning │ ──▶ Installed
//!                                        └───────┘     └──────────────┘
//!                                                             │
//!                                                             ▼
//!                                                           Failed
//! ```
//!
//! ## Install
//!
//! 1. Pre-flight render with unspecified addresses (no mutation yet)
//! 2. Pre-clean orphaned DNS through the [`ZoneReaper`]
//! 3. Allocate the API and ingress addresses
//! 4. Publish `api.<zone>` and `*.apps.<zone>`
//! 5. Render and write `install-config.yaml`
//! 6. Installer `create cluster`
//! 7. Post-install: scale down, bind the ingress port, certificates, users
//!
//! ## Uninstall
//!
//! Any existing install directory is uninstalled, including one left by a
//! create that failed before writing metadata. Installer `destroy cluster`
//! runs first; DNS cleanup and address release only run once destroy
//! succeeded.
//!
//! ## Failure
//!
//! Nothing is rolled back. A failed profile leaves its addresses, records and
//! install directory in place; re-running with uninstall converges the
//! account back to a clean state.

mod event;
mod report;

pub use event::{LifecycleEvent, LifecycleState};
pub use report::{ProfileOutcome, ProfileRun, ProfileStatus, RunOptions, RunReport};

use crate::config::{Profile, ProfileSet};
use crate::dns::{HostedZoneProvider, RecordRole, ZoneReaper};
use crate::error::{Error, Result};
use crate::install_dir::{InstallDir, InstallMetadata};
use crate::template::TemplateRenderer;
use crate::traits::{
    AddressPair, AllocationRequest, BinaryFetcher, DnsBackend, DnsProvider, InstallerDriver,
    NetworkProvisioner, PostInstallHooks,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Default capacity of the lifecycle event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// External collaborators driven by the orchestrator
pub struct Collaborators {
    /// DNS backend for publishing and cleanup
    pub dns: Arc<dyn DnsBackend>,
    /// Floating address provisioner
    pub network: Box<dyn NetworkProvisioner>,
    /// Installer binary driver
    pub installer: Box<dyn InstallerDriver>,
    /// Installer binary fetcher
    pub fetcher: Box<dyn BinaryFetcher>,
    /// Post-install scripts
    pub hooks: Box<dyn PostInstallHooks>,
}

/// Cluster lifecycle orchestrator
///
/// Profiles are processed strictly sequentially; no two profiles' external
/// side effects interleave.
pub struct Orchestrator {
    profiles: ProfileSet,
    renderer: TemplateRenderer,
    reaper: ZoneReaper,
    dns: Arc<dyn DnsBackend>,
    network: Box<dyn NetworkProvisioner>,
    installer: Box<dyn InstallerDriver>,
    fetcher: Box<dyn BinaryFetcher>,
    hooks: Box<dyn PostInstallHooks>,
    event_tx: mpsc::Sender<LifecycleEvent>,
}

impl Orchestrator {
    /// Create an orchestrator
    ///
    /// Returns the orchestrator and the receiving end of its event channel.
    pub fn new(
        profiles: ProfileSet,
        collaborators: Collaborators,
        event_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<LifecycleEvent>)> {
        profiles.validate()?;
        if event_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(event_capacity);

        let orchestrator = Self {
            renderer: TemplateRenderer::new(profiles.config_dir.clone()),
            reaper: ZoneReaper::new(collaborators.dns.clone()),
            profiles,
            dns: collaborators.dns,
            network: collaborators.network,
            installer: collaborators.installer,
            fetcher: collaborators.fetcher,
            hooks: collaborators.hooks,
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// Loaded profiles
    pub fn profiles(&self) -> &ProfileSet {
        &self.profiles
    }

    /// Install directory of a profile
    pub fn install_dir(&self, profile: &Profile) -> InstallDir {
        InstallDir::for_cluster(&self.profiles.settings.installs_dir, &profile.cluster_name)
    }

    /// Run the named profiles in the given order
    ///
    /// Every name is checked before the first profile starts; an unknown
    /// name aborts the whole run. Failures of individual profiles are
    /// recorded in the report and do not stop later profiles.
    pub async fn run<S: AsRef<str>>(&self, names: &[S], options: RunOptions) -> Result<RunReport> {
        let selected = self.profiles.select(names)?;

        let mut report = RunReport::default();
        for profile in selected {
            let result = self.run_profile(profile, options).await;
            report.runs.push(ProfileRun {
                profile: profile.name.clone(),
                result,
            });
        }

        Ok(report)
    }

    /// Run every profile in configuration order
    pub async fn run_all(&self, options: RunOptions) -> Result<RunReport> {
        let names = self.profiles.names();
        self.run(&names, options).await
    }

    /// Install status of every profile, in configuration order
    pub async fn list(&self) -> Result<Vec<ProfileStatus>> {
        let mut statuses = Vec::with_capacity(self.profiles.len());
        for profile in self.profiles.iter() {
            statuses.push(ProfileStatus {
                profile: profile.name.clone(),
                zone: profile.cluster_domain().zone_name(),
                status: self.install_dir(profile).status().await?,
            });
        }
        Ok(statuses)
    }

    /// Drive one profile to a terminal state
    pub async fn run_profile(&self, profile: &Profile, options: RunOptions) -> Result<ProfileOutcome> {
        info!(profile = %profile.name, cluster = %profile.cluster_domain(), "Processing profile");

        match self.drive(profile, options).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(profile = %profile.name, "Profile failed: {}", e);
                self.transition(profile, LifecycleState::Failed);
                self.emit_event(LifecycleEvent::Failed {
                    profile: profile.name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&self, profile: &Profile, options: RunOptions) -> Result<ProfileOutcome> {
        let dir = self.install_dir(profile);

        let present = dir.exists().await?;
        if present {
            self.transition(profile, LifecycleState::AlreadyInstalled);
            if !dir.has_metadata().await? {
                warn!(
                    path = %dir.path().display(),
                    "Install directory has no metadata, a previous create did not complete"
                );
            }
            if !options.uninstall {
                return Err(Error::AlreadyExists(dir.path().to_path_buf()));
            }
        } else {
            self.transition(profile, LifecycleState::Fresh);
            if !options.installs() {
                info!(profile = %profile.name, "Nothing installed, nothing to uninstall");
                return Ok(ProfileOutcome::NotInstalled);
            }
        }

        let provisioning = options.installs();
        if provisioning {
            self.renderer.preflight(profile).await?;
        }

        info!(
            version = %profile.installer_version,
            channel = %profile.installer_channel,
            "Fetching installer binary"
        );
        let binary = self
            .fetcher
            .fetch(&profile.installer_version, &profile.installer_channel)
            .await?;

        if present {
            self.uninstall(profile, &dir, &binary).await?;
            if !provisioning {
                return Ok(ProfileOutcome::Uninstalled);
            }
        }

        let metadata = self.provision(profile, &dir, &binary).await?;
        self.transition(profile, LifecycleState::Installed);
        Ok(ProfileOutcome::Installed(metadata))
    }

    async fn uninstall(&self, profile: &Profile, dir: &InstallDir, binary: &Path) -> Result<()> {
        self.transition(profile, LifecycleState::Uninstalling);
        let domain = profile.cluster_domain();

        info!(cluster = %domain, "Cleaning cluster resources");
        self.installer.destroy_cluster(binary, dir.path()).await?;

        info!(cluster = %domain, "Cleaning old DNS names");
        self.reaper.cleanup_cluster(&domain).await?;
        self.emit_event(LifecycleEvent::DnsCleaned {
            profile: profile.name.clone(),
            zone: domain.zone_name(),
        });

        info!(cluster = %domain, "Cleaning floating IPs");
        self.network
            .release(&profile.cluster_name, &profile.os_cloud)
            .await?;
        self.emit_event(LifecycleEvent::AddressesReleased {
            profile: profile.name.clone(),
        });

        dir.remove().await?;
        info!(cluster = %domain, "Cluster uninstalled");
        Ok(())
    }

    async fn provision(
        &self,
        profile: &Profile,
        dir: &InstallDir,
        binary: &Path,
    ) -> Result<InstallMetadata> {
        self.transition(profile, LifecycleState::Provisioning);
        let domain = profile.cluster_domain();

        dir.create().await?;

        self.preclean(profile).await?;

        info!(cluster = %domain, "Creating floating IPs");
        let api = self.allocate(profile, RecordRole::Api).await?;
        let apps = self.allocate(profile, RecordRole::Apps).await?;
        let addresses = AddressPair { api, apps };

        info!(cluster = %domain, api = %addresses.api, apps = %addresses.apps, "Creating DNS records");
        let provider = HostedZoneProvider::new(
            self.dns.clone(),
            domain.clone(),
            self.profiles.settings.dns_ttl,
        );
        for role in [RecordRole::Api, RecordRole::Apps] {
            let address = addresses.for_role(role);
            provider.publish(role.prefix(), address).await?;
            self.emit_event(LifecycleEvent::RecordPublished {
                profile: profile.name.clone(),
                record: domain.record_name(role.prefix()),
                address,
            });
        }

        info!(path = %dir.config_path().display(), "Generating install configuration");
        let rendered = self.renderer.render_profile(profile, &addresses).await?;
        dir.write_config(&rendered).await?;

        info!(
            log = %dir.log_path().display(),
            "Launching installer, follow the installer log for progress"
        );
        if let Err(e) = self.installer.create_cluster(binary, dir.path()).await {
            error!(
                cluster = %domain,
                path = %dir.path().display(),
                "It's up to you to debug why it failed!!"
            );
            return Err(e);
        }

        self.post_install(profile, dir, &addresses).await
    }

    async fn preclean(&self, profile: &Profile) -> Result<()> {
        let domain = profile.cluster_domain();
        match self.reaper.cleanup_cluster(&domain).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_zone_not_found() => {
                debug!(cluster = %domain, "Nothing to pre-clean: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn allocate(&self, profile: &Profile, role: RecordRole) -> Result<std::net::IpAddr> {
        let request = AllocationRequest {
            domain: profile.cluster_domain(),
            tenant: profile.os_cloud.clone(),
            network: profile.external_network.clone(),
            role,
        };

        let address = self.network.allocate(&request).await?;
        info!(role = %role, address = %address, "Floating IP allocated");
        self.emit_event(LifecycleEvent::AddressAllocated {
            profile: profile.name.clone(),
            role,
            address,
        });
        Ok(address)
    }

    async fn post_install(
        &self,
        profile: &Profile,
        dir: &InstallDir,
        addresses: &AddressPair,
    ) -> Result<InstallMetadata> {
        let metadata = dir.read_metadata().await?;
        let kubeconfig = dir.kubeconfig_path();

        if profile.only_masters {
            info!(cluster = %metadata.cluster_name, "Scaling down cluster to only masters");
            let result = self.hooks.scale_to_masters(&kubeconfig).await;
            self.best_effort(profile, "scale-to-masters", result);
        }

        let port = format!("{}-ingress-port", metadata.infra_id);
        info!(port = %port, address = %addresses.apps, "Assigning ingress floating IP");
        self.network
            .bind_port(&profile.os_cloud, &port, addresses.apps)
            .await?;

        if profile.router_certificate {
            info!(cluster = %metadata.cluster_name, "Creating router certificates");
            let result = self
                .hooks
                .install_router_certificate(&metadata.cluster_name)
                .await;
            self.best_effort(profile, "router-certificate", result);
        }

        if let Some(htpasswd) = &profile.htpasswd_file {
            info!(cluster = %metadata.cluster_name, "Adding htpasswd users");
            let file = self.profiles.config_file(htpasswd);
            let result = self.hooks.add_htpasswd_users(&kubeconfig, &file).await;
            self.best_effort(profile, "htpasswd-users", result);
        }

        Ok(metadata)
    }

    fn best_effort(&self, profile: &Profile, hook: &str, result: Result<()>) {
        if let Err(e) = result {
            warn!(profile = %profile.name, hook, "Post-install step failed: {}", e);
            self.emit_event(LifecycleEvent::HookFailed {
                profile: profile.name.clone(),
                hook: hook.to_string(),
                error: e.to_string(),
            });
        }
    }

    fn transition(&self, profile: &Profile, state: LifecycleState) {
        debug!(profile = %profile.name, state = %state, "State transition");
        self.emit_event(LifecycleEvent::StateChanged {
            profile: profile.name.clone(),
            state,
        });
    }

    fn emit_event(&self, event: LifecycleEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping lifecycle event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
