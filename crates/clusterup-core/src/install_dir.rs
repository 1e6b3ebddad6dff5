// # Install Directory
//
// On-disk working directory of one cluster: `<installs>/<clusterName>`.
//
// ## Contents
//
// - `install-config.yaml`: rendered configuration, consumed by the installer
// - `metadata.json`: written by the installer once `create cluster` succeeds
// - `auth/kubeconfig`: cluster credentials, written by the installer
// - `.openshift_install.log`: installer log
//
// The presence of `metadata.json` is what marks a cluster as installed.
//
// ## Atomic Writes
//
// The rendered configuration is written to a temporary file and renamed
// into place, so a failed render never leaves a partial document behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Rendered configuration file name
pub const CONFIG_FILE: &str = "install-config.yaml";

/// Installer metadata file name
pub const METADATA_FILE: &str = "metadata.json";

/// Installer log file name
pub const INSTALLER_LOG: &str = ".openshift_install.log";

/// Installer-produced metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallMetadata {
    /// Unique identifier of the cluster's infrastructure
    #[serde(rename = "infraID")]
    pub infra_id: String,

    /// Cluster name as seen by the installer
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
}

/// Install state of one cluster as seen on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    /// No install directory
    NotInstalled,
    /// Directory present without metadata (create never completed)
    Partial,
    /// Completed install
    Installed {
        /// Infrastructure identifier from the metadata
        infra_id: String,
        /// When the metadata was written, if the filesystem reports it
        installed_at: Option<DateTime<Utc>>,
    },
}

impl InstallStatus {
    /// Whether a completed install is present
    pub fn is_installed(&self) -> bool {
        matches!(self, InstallStatus::Installed { .. })
    }
}

/// One cluster's install directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDir {
    path: PathBuf,
}

impl InstallDir {
    /// Install directory of `cluster_name` under `root`
    pub fn for_cluster(root: impl AsRef<Path>, cluster_name: &str) -> Self {
        Self {
            path: root.as_ref().join(cluster_name),
        }
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the rendered configuration
    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE)
    }

    /// Path of the installer metadata
    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE)
    }

    /// Path of the cluster kubeconfig
    pub fn kubeconfig_path(&self) -> PathBuf {
        self.path.join("auth").join("kubeconfig")
    }

    /// Path of the installer log
    pub fn log_path(&self) -> PathBuf {
        self.path.join(INSTALLER_LOG)
    }

    /// Whether the directory exists
    pub async fn exists(&self) -> Result<bool> {
        Ok(fs::try_exists(&self.path).await?)
    }

    /// Whether completed-install evidence is present
    pub async fn has_metadata(&self) -> Result<bool> {
        Ok(fs::try_exists(self.metadata_path()).await?)
    }

    /// Inspect the directory
    pub async fn status(&self) -> Result<InstallStatus> {
        if !self.exists().await? {
            return Ok(InstallStatus::NotInstalled);
        }
        if !self.has_metadata().await? {
            return Ok(InstallStatus::Partial);
        }

        let metadata = self.read_metadata().await?;
        let installed_at = fs::metadata(self.metadata_path())
            .await?
            .modified()
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(InstallStatus::Installed {
            infra_id: metadata.infra_id,
            installed_at,
        })
    }

    /// Read the installer metadata
    pub async fn read_metadata(&self) -> Result<InstallMetadata> {
        let path = self.metadata_path();
        let content = fs::read_to_string(&path).await.map_err(|e| {
            Error::config_missing(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Create the directory and its parents
    pub async fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.path).await.map_err(|e| {
            Error::config(format!(
                "Failed to create install directory {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Write the rendered configuration atomically
    pub async fn write_config(&self, rendered: &str) -> Result<()> {
        let target = self.config_path();
        let temp = self.path.join(format!(".{}.tmp", CONFIG_FILE));

        {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(rendered.as_bytes()).await?;
            file.flush().await?;
        }

        fs::rename(&temp, &target).await.map_err(|e| {
            Error::config(format!(
                "Failed to rename {} to {}: {}",
                temp.display(),
                target.display(),
                e
            ))
        })?;

        tracing::debug!("Install configuration written to {}", target.display());
        Ok(())
    }

    /// Remove the directory and everything in it
    ///
    /// An absent directory is not an error.
    pub async fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
