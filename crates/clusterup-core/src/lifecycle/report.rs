//! Run options and outcomes.

use crate::install_dir::{InstallMetadata, InstallStatus};
use crate::Error;

/// What the caller asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Uninstall an existing install instead of refusing
    pub uninstall: bool,

    /// Stop after uninstalling
    pub no_install: bool,
}

impl RunOptions {
    /// Install, refusing to touch an existing install
    pub fn install() -> Self {
        Self::default()
    }

    /// Uninstall if present, then install
    pub fn reinstall() -> Self {
        Self {
            uninstall: true,
            no_install: false,
        }
    }

    /// Uninstall only
    pub fn uninstall_only() -> Self {
        Self {
            uninstall: true,
            no_install: true,
        }
    }

    /// Whether the run ends with a provisioning attempt
    ///
    /// `no_install` only takes effect together with `uninstall`.
    pub fn installs(&self) -> bool {
        !(self.uninstall && self.no_install)
    }
}

/// Successful end of one profile run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// Cluster created and post-install steps done
    Installed(InstallMetadata),
    /// Existing install destroyed and cleaned up
    Uninstalled,
    /// Uninstall-only run with nothing installed
    NotInstalled,
}

/// Result of one profile within a multi-profile run
#[derive(Debug)]
pub struct ProfileRun {
    /// Profile name
    pub profile: String,
    /// Outcome or the error that ended the run
    pub result: Result<ProfileOutcome, Error>,
}

/// Per-profile results, in processing order
#[derive(Debug, Default)]
pub struct RunReport {
    pub runs: Vec<ProfileRun>,
}

impl RunReport {
    /// Whether every profile succeeded
    pub fn is_success(&self) -> bool {
        self.runs.iter().all(|run| run.result.is_ok())
    }

    /// Failed profiles and their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.runs.iter().filter_map(|run| match &run.result {
            Ok(_) => None,
            Err(e) => Some((run.profile.as_str(), e)),
        })
    }

    /// Process exit code: 0, or the code of the last failing profile
    pub fn exit_code(&self) -> u8 {
        self.failures().last().map(|(_, e)| e.exit_code()).unwrap_or(0)
    }
}

/// One line of the profile listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStatus {
    /// Profile name
    pub profile: String,
    /// Cluster zone (`cluster.baseDomain`)
    pub zone: String,
    /// Install state on disk
    pub status: InstallStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(profile: &str, result: Result<ProfileOutcome, Error>) -> ProfileRun {
        ProfileRun {
            profile: profile.to_string(),
            result,
        }
    }

    #[test]
    fn test_exit_code_from_last_failure() {
        let report = RunReport {
            runs: vec![
                run("a", Err(Error::command_failed("create", Some(3), ""))),
                run("b", Ok(ProfileOutcome::Uninstalled)),
                run("c", Err(Error::command_failed("destroy", Some(5), ""))),
            ],
        };

        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.exit_code(), 5);
    }

    #[test]
    fn test_exit_code_success() {
        let report = RunReport {
            runs: vec![run("a", Ok(ProfileOutcome::NotInstalled))],
        };
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }
}
