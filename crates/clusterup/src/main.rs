// # clusterup
//
// Thin command-line front end over `clusterup-core`:
//
// 1. Parse arguments
// 2. Initialize logging
// 3. Load profiles and wire the production collaborators
//    (Route 53, OpenStack CLI, openshift-install, post-install scripts)
// 4. Run, list, or uninstall the selected profiles
//
// All lifecycle logic lives in `clusterup_core::Orchestrator`.
//
// ## Example
//
// ```bash
// clusterup ci-45                 # install one profile
// clusterup -u ci-45 ci-46        # reinstall two profiles
// clusterup -u -n ci-45           # tear down only
// clusterup -a                    # every profile, in configuration order
// clusterup -l                    # install status of every profile
// ```
//
// AWS credentials come from the standard AWS environment/profile chain.
// The OpenStack tenant comes from each profile's `osCloud`; an `OS_CLOUD`
// in the environment is ignored.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clusterup_core::config::DEFAULT_CONFIG_PATH;
use clusterup_core::lifecycle::DEFAULT_EVENT_CAPACITY;
use clusterup_core::{
    Collaborators, InstallStatus, LifecycleEvent, Orchestrator, ProfileSet, ProfileStatus,
    RunOptions,
};
use clusterup_installer_openshift::{CachedFetcher, OpenshiftInstaller, ScriptHooks};
use clusterup_net_openstack::OpenStackCli;
use clusterup_provider_route53::Route53Backend;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Process exit codes
///
/// A failing external command propagates its own status instead.
#[derive(Debug, Clone, Copy)]
enum ClusterupExitCode {
    Success = 0,
    /// Configuration error or failed profile
    Failure = 1,
    /// No profile named
    Usage = 2,
    /// Interrupted by SIGINT/SIGTERM
    Interrupted = 130,
}

impl From<ClusterupExitCode> for ExitCode {
    fn from(code: ClusterupExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "clusterup", version, about)]
struct Cli {
    /// Run every profile in configuration order
    #[arg(short = 'a', long, conflicts_with = "profiles")]
    all_profiles: bool,

    /// Uninstall an existing install before reinstalling
    #[arg(short, long)]
    uninstall: bool,

    /// With --uninstall: stop after uninstalling
    #[arg(short, long, requires = "uninstall")]
    no_install: bool,

    /// List profiles with install status
    #[arg(short, long, conflicts_with_all = ["uninstall", "all_profiles"])]
    list: bool,

    /// Profile file
    #[arg(short, long, env = "CLUSTERUP_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// trace, debug, info, warn or error
    #[arg(long, env = "CLUSTERUP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Profiles to run, in order
    profiles: Vec<String>,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            uninstall: self.uninstall,
            no_install: self.no_install,
        }
    }

    fn has_target(&self) -> bool {
        self.list || self.all_profiles || !self.profiles.is_empty()
    }
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.has_target() {
        eprintln!("{}", Cli::command().render_usage());
        eprintln!("Name at least one profile, or use --all-profiles or --list");
        return ClusterupExitCode::Usage.into();
    }

    let level = match parse_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ClusterupExitCode::Failure.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ClusterupExitCode::Failure.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ClusterupExitCode::Failure.into();
        }
    };

    rt.block_on(async {
        tokio::select! {
            code = run(cli) => code,
            signal = wait_for_interrupt() => {
                warn!("Received {}, stopping; child processes are killed", signal);
                ClusterupExitCode::Interrupted.into()
            }
        }
    })
}

async fn run(cli: Cli) -> ExitCode {
    let profiles = match ProfileSet::load(&cli.config)
        .await
        .with_context(|| format!("Loading {}", cli.config.display()))
    {
        Ok(profiles) => profiles,
        Err(e) => {
            error!("{:#}", e);
            return ClusterupExitCode::Failure.into();
        }
    };
    info!(
        config = %cli.config.display(),
        "Loaded {} profile(s)",
        profiles.len()
    );

    let collaborators = wire(&profiles).await;
    let (orchestrator, mut events) =
        match Orchestrator::new(profiles, collaborators, DEFAULT_EVENT_CAPACITY) {
            Ok(pair) => pair,
            Err(e) => {
                error!("Configuration error: {}", e);
                return ClusterupExitCode::Failure.into();
            }
        };

    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let code = if cli.list {
        match orchestrator.list().await {
            Ok(statuses) => {
                print_statuses(&statuses);
                ClusterupExitCode::Success.into()
            }
            Err(e) => {
                error!("Listing failed: {}", e);
                ClusterupExitCode::Failure.into()
            }
        }
    } else {
        let options = cli.run_options();
        let report = if cli.all_profiles {
            orchestrator.run_all(options).await
        } else {
            orchestrator.run(&cli.profiles, options).await
        };

        match report {
            Ok(report) => {
                for (profile, e) in report.failures() {
                    error!(%profile, "Failed: {}", e);
                }
                ExitCode::from(report.exit_code())
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::from(e.exit_code())
            }
        }
    };

    // Closing the channel ends the drain task
    drop(orchestrator);
    if let Err(e) = drain.await {
        warn!("Event drain task failed: {}", e);
    }

    code
}

/// Production collaborators
async fn wire(profiles: &ProfileSet) -> Collaborators {
    let settings = &profiles.settings;
    let dns = Route53Backend::from_env().await;
    debug!(?dns, "Route 53 backend ready");

    Collaborators {
        dns: Arc::new(dns),
        network: Box::new(OpenStackCli::new()),
        installer: Box::new(OpenshiftInstaller::new()),
        fetcher: Box::new(CachedFetcher::new(
            &settings.binaries_dir,
            settings.installer_url_template.clone(),
        )),
        hooks: Box::new(ScriptHooks::new(&settings.scripts_dir)),
    }
}

fn log_event(event: &LifecycleEvent) {
    match event {
        LifecycleEvent::StateChanged { profile, state } => {
            debug!(profile = %profile, %state, "State changed");
        }
        LifecycleEvent::AddressAllocated {
            profile,
            role,
            address,
        } => {
            info!(profile = %profile, ?role, %address, "Address allocated");
        }
        LifecycleEvent::RecordPublished {
            profile,
            record,
            address,
        } => {
            info!(profile = %profile, record = %record, %address, "Record published");
        }
        LifecycleEvent::DnsCleaned { profile, zone } => {
            info!(profile = %profile, zone = %zone, "DNS cleaned");
        }
        LifecycleEvent::AddressesReleased { profile } => {
            info!(profile = %profile, "Addresses released");
        }
        LifecycleEvent::HookFailed {
            profile,
            hook,
            error,
        } => {
            warn!(profile = %profile, hook = %hook, "Post-install step failed: {}", error);
        }
        LifecycleEvent::Failed { profile, error } => {
            debug!(profile = %profile, "Failure event: {}", error);
        }
    }
}

fn format_status(status: &ProfileStatus) -> String {
    let state = match &status.status {
        InstallStatus::NotInstalled => "not installed".to_string(),
        InstallStatus::Partial => "partial (no metadata)".to_string(),
        InstallStatus::Installed {
            infra_id,
            installed_at: Some(at),
        } => format!("installed {} {}", infra_id, at.format("%Y-%m-%d %H:%M:%S UTC")),
        InstallStatus::Installed {
            infra_id,
            installed_at: None,
        } => format!("installed {}", infra_id),
    };

    format!("{:<24} {:<40} {}", status.profile, status.zone, state)
}

fn print_statuses(statuses: &[ProfileStatus]) {
    for status in statuses {
        println!("{}", format_status(status));
    }
}

#[cfg(unix)]
async fn wait_for_interrupt() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut sigterm), Ok(mut sigint)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) else {
        warn!("Failed to install signal handlers");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!("Failed to wait for CTRL-C: {}", e);
            std::future::pending().await
        }
    }
}
