//! `openshift-install` driver.

use async_trait::async_trait;
use clusterup_core::exec;
use clusterup_core::traits::InstallerDriver;
use clusterup_core::Result;
use std::path::Path;

/// Drives `openshift-install` in an install directory
///
/// Output is streamed to the operator's terminal; the installer keeps its
/// own detailed log in `<dir>/.openshift_install.log`.
#[derive(Debug, Clone, Default)]
pub struct OpenshiftInstaller;

impl OpenshiftInstaller {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, binary: &Path, action: &str, install_dir: &Path, log_level: &str) -> Result<()> {
        let mut cmd = exec::command(binary);
        cmd.arg(action)
            .arg("cluster")
            .arg(format!("--dir={}", install_dir.display()))
            .arg(format!("--log-level={}", log_level));

        exec::run_streaming(&mut cmd, &format!("{} cluster", action)).await
    }
}

#[async_trait]
impl InstallerDriver for OpenshiftInstaller {
    async fn create_cluster(&self, binary: &Path, install_dir: &Path) -> Result<()> {
        self.run(binary, "create", install_dir, "info").await
    }

    async fn destroy_cluster(&self, binary: &Path, install_dir: &Path) -> Result<()> {
        self.run(binary, "destroy", install_dir, "debug").await
    }
}
