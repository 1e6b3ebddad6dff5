//! Post-install scripts.

use async_trait::async_trait;
use clusterup_core::exec;
use clusterup_core::traits::PostInstallHooks;
use clusterup_core::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Scales a cluster down to its control plane: `<kubeconfig>`
pub const SCALE_SCRIPT: &str = "scale-to-three-node.sh";

/// Issues router certificates: `<cluster name>`
pub const ROUTER_CERT_SCRIPT: &str = "install-router-cert.sh";

/// Provisions htpasswd users: `<kubeconfig> <htpasswd file>`
pub const HTPASSWD_SCRIPT: &str = "add-htpasswd-users.sh";

/// Runs post-install scripts from a scripts directory with `bash`
#[derive(Debug, Clone)]
pub struct ScriptHooks {
    scripts_dir: PathBuf,
    shell: PathBuf,
}

impl ScriptHooks {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            shell: PathBuf::from("bash"),
        }
    }

    async fn run<I, S>(&self, script: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = exec::command(&self.shell);
        cmd.arg(self.scripts_dir.join(script)).args(args);

        let output = exec::run_captured(&mut cmd, script).await?;
        tracing::debug!(script, output = %output.trim(), "Script finished");
        Ok(())
    }
}

#[async_trait]
impl PostInstallHooks for ScriptHooks {
    async fn scale_to_masters(&self, kubeconfig: &Path) -> Result<()> {
        self.run(SCALE_SCRIPT, [kubeconfig]).await
    }

    async fn install_router_certificate(&self, cluster_name: &str) -> Result<()> {
        self.run(ROUTER_CERT_SCRIPT, [cluster_name]).await
    }

    async fn add_htpasswd_users(&self, kubeconfig: &Path, htpasswd_file: &Path) -> Result<()> {
        self.run(HTPASSWD_SCRIPT, [kubeconfig, htpasswd_file]).await
    }
}
