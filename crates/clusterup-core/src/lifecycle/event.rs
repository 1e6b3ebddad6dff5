//! Lifecycle states and the events emitted while driving them.

use crate::dns::RecordRole;
use std::fmt;
use std::net::IpAddr;

/// Per-profile, per-run lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No completed install on disk
    Fresh,
    /// Install metadata present
    AlreadyInstalled,
    /// Destroying the existing install
    Uninstalling,
    /// Allocating, publishing, rendering and creating
    Provisioning,
    /// Installer create and post-install steps succeeded
    Installed,
    /// A fatal step failed
    Failed,
}

impl LifecycleState {
    /// Whether no further transition follows in this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Installed | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Fresh => "fresh",
            LifecycleState::AlreadyInstalled => "already-installed",
            LifecycleState::Uninstalling => "uninstalling",
            LifecycleState::Provisioning => "provisioning",
            LifecycleState::Installed => "installed",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Profile entered a new state
    StateChanged {
        profile: String,
        state: LifecycleState,
    },

    /// Floating address allocated
    AddressAllocated {
        profile: String,
        role: RecordRole,
        address: IpAddr,
    },

    /// A record published
    RecordPublished {
        profile: String,
        record: String,
        address: IpAddr,
    },

    /// Cluster DNS removed (zone and stray records)
    DnsCleaned {
        profile: String,
        zone: String,
    },

    /// Every address tagged for the cluster released
    AddressesReleased {
        profile: String,
    },

    /// Best-effort post-install step failed
    HookFailed {
        profile: String,
        hook: String,
        error: String,
    },

    /// Profile run failed
    Failed {
        profile: String,
        error: String,
    },
}

impl LifecycleEvent {
    /// Profile the event belongs to
    pub fn profile(&self) -> &str {
        match self {
            LifecycleEvent::StateChanged { profile, .. }
            | LifecycleEvent::AddressAllocated { profile, .. }
            | LifecycleEvent::RecordPublished { profile, .. }
            | LifecycleEvent::DnsCleaned { profile, .. }
            | LifecycleEvent::AddressesReleased { profile }
            | LifecycleEvent::HookFailed { profile, .. }
            | LifecycleEvent::Failed { profile, .. } => profile,
        }
    }
}
