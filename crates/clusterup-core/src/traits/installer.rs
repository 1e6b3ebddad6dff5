// # Installer Traits
//
// The installer binary, the component that fetches it, and the post-install
// scripts are external collaborators with narrow interfaces.
//
// - [`BinaryFetcher`]: version string → local executable path
// - [`InstallerDriver`]: `create cluster` / `destroy cluster` in a working directory
// - [`PostInstallHooks`]: fire-and-forget cluster adjustments

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Trait for resolving an installer version to a local executable
#[async_trait]
pub trait BinaryFetcher: Send + Sync {
    /// Return the path of the installer for `version` on `channel`
    async fn fetch(&self, version: &str, channel: &str) -> Result<PathBuf, crate::Error>;
}

/// Trait for driving the installer binary
///
/// Both operations block until the installer exits. A non-zero exit is an
/// `Error::ExternalCommandFailed` carrying the status.
#[async_trait]
pub trait InstallerDriver: Send + Sync {
    /// Run `create cluster` in `install_dir`
    async fn create_cluster(&self, binary: &Path, install_dir: &Path) -> Result<(), crate::Error>;

    /// Run `destroy cluster` in `install_dir`
    async fn destroy_cluster(&self, binary: &Path, install_dir: &Path) -> Result<(), crate::Error>;
}

/// Trait for post-install adjustments
///
/// Every hook is best-effort: the orchestrator logs a failure and moves on.
#[async_trait]
pub trait PostInstallHooks: Send + Sync {
    /// Scale the cluster down to its control plane
    async fn scale_to_masters(&self, kubeconfig: &Path) -> Result<(), crate::Error>;

    /// Issue router certificates for the cluster
    async fn install_router_certificate(&self, cluster_name: &str) -> Result<(), crate::Error>;

    /// Provision extra users from an htpasswd file
    async fn add_htpasswd_users(
        &self,
        kubeconfig: &Path,
        htpasswd_file: &Path,
    ) -> Result<(), crate::Error>;
}
