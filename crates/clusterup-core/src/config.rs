//! Configuration types for the cluster lifecycle
//!
//! Profiles are read from a YAML document with an optional `settings`
//! section and an ordered `profiles` mapping keyed by profile name.

use crate::dns::ClusterDomain;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default profile file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/profiles.yaml";

/// Named deployment intent
///
/// Immutable once loaded. Run-scoped values such as allocated addresses are
/// carried separately and never written back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Profile name (the key in the `profiles` mapping)
    #[serde(skip)]
    pub name: String,

    /// Template identifier, selects `install-<template>.yaml`
    pub template: String,

    /// Cloud tenant passed to every network call
    pub os_cloud: String,

    /// Base DNS domain (parent hosted zone)
    pub base_domain: String,

    /// Cluster name, first label of the cluster domain
    pub cluster_name: String,

    /// External network floating addresses are allocated from
    pub external_network: String,

    /// Installer version selector (e.g. "latest-4.5")
    pub installer_version: String,

    /// Installer release channel
    #[serde(default = "default_installer_channel")]
    pub installer_channel: String,

    /// Scale the cluster down to its control plane after install
    #[serde(default)]
    pub only_masters: bool,

    /// Pull secret file, relative to the configuration directory
    #[serde(
        default,
        rename = "pullRequestJsonFile",
        alias = "pullSecretFile",
        skip_serializing_if = "Option::is_none"
    )]
    pub pull_secret_file: Option<String>,

    /// htpasswd file for extra users, relative to the configuration directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub htpasswd_file: Option<String>,

    /// Issue router certificates after install
    #[serde(default)]
    pub router_certificate: bool,

    /// Extra template fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Profile {
    /// DNS naming for this profile's cluster
    pub fn cluster_domain(&self) -> ClusterDomain {
        ClusterDomain::new(&self.cluster_name, &self.base_domain)
    }

    /// Look up a profile field by template identifier
    ///
    /// Identifiers use the configuration key spelling (`clusterName`,
    /// `baseDomain`, ...). A dotted identifier that is not itself a key
    /// walks nested mappings. Only scalar values resolve.
    pub fn field(&self, identifier: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        let object = value.as_object()?;

        let found = match object.get(identifier) {
            Some(v) => Some(v),
            None => identifier
                .split('.')
                .try_fold(&value, |current, segment| current.get(segment)),
        };

        match found? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("template", &self.template),
            ("osCloud", &self.os_cloud),
            ("baseDomain", &self.base_domain),
            ("clusterName", &self.cluster_name),
            ("externalNetwork", &self.external_network),
            ("installerVersion", &self.installer_version),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config(format!(
                    "Profile {}: {} cannot be empty",
                    self.name, key
                )));
            }
        }

        if self.cluster_name.contains('.') {
            return Err(Error::config(format!(
                "Profile {}: clusterName must be a single DNS label, got {}",
                self.name, self.cluster_name
            )));
        }

        Ok(())
    }
}

fn default_installer_channel() -> String {
    "ocp".to_string()
}

/// Workspace-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root of per-cluster install directories
    #[serde(default = "default_installs_dir")]
    pub installs_dir: PathBuf,

    /// Installer binary cache
    #[serde(default = "default_binaries_dir")]
    pub binaries_dir: PathBuf,

    /// Post-install scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// TTL of published records (in seconds)
    #[serde(default = "default_dns_ttl")]
    pub dns_ttl: i64,

    /// Download URL for installer binaries not yet cached
    ///
    /// `{version}` and `{channel}` are substituted.
    #[serde(default)]
    pub installer_url_template: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            installs_dir: default_installs_dir(),
            binaries_dir: default_binaries_dir(),
            scripts_dir: default_scripts_dir(),
            dns_ttl: default_dns_ttl(),
            installer_url_template: None,
        }
    }
}

fn default_installs_dir() -> PathBuf {
    PathBuf::from("installs")
}

fn default_binaries_dir() -> PathBuf {
    PathBuf::from("binaries")
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_dns_ttl() -> i64 {
    3600
}

/// Raw file shape; profiles stay a YAML mapping to keep file order
#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    settings: Settings,
    profiles: serde_yaml::Mapping,
}

/// All profiles from one configuration file, in file order
#[derive(Debug, Clone)]
pub struct ProfileSet {
    /// Workspace settings
    pub settings: Settings,

    /// Directory holding templates and secret files
    pub config_dir: PathBuf,

    profiles: Vec<Profile>,
}

impl ProfileSet {
    /// Build a profile set from already-parsed profiles
    pub fn new(settings: Settings, config_dir: impl Into<PathBuf>, profiles: Vec<Profile>) -> Self {
        Self {
            settings,
            config_dir: config_dir.into(),
            profiles,
        }
    }

    /// Parse a YAML profile document
    ///
    /// `config_dir` is where templates and referenced files are looked up.
    pub fn from_yaml_str(text: &str, config_dir: impl Into<PathBuf>) -> Result<Self> {
        let file: ProfileFile = serde_yaml::from_str(text)?;

        let mut profiles = Vec::with_capacity(file.profiles.len());
        for (key, value) in file.profiles {
            let name = key
                .as_str()
                .ok_or_else(|| Error::config("Profile names must be strings"))?
                .to_string();
            let mut profile: Profile = serde_yaml::from_value(value)
                .map_err(|e| Error::config(format!("Profile {}: {}", name, e)))?;
            profile.name = name;
            profiles.push(profile);
        }

        Ok(Self::new(file.settings, config_dir, profiles))
    }

    /// Load and validate a profile file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config_missing(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let config_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let set = Self::from_yaml_str(&text, config_dir)?;
        set.validate()?;
        Ok(set)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(Error::config("No profiles configured"));
        }

        if self.settings.dns_ttl <= 0 {
            return Err(Error::config("settings.dns_ttl must be > 0"));
        }

        let mut zones = HashSet::new();
        for profile in &self.profiles {
            profile.validate()?;
            let zone = profile.cluster_domain().zone_name();
            if !zones.insert(zone.clone()) {
                return Err(Error::config(format!(
                    "Profile {}: zone {} is already used by another profile",
                    profile.name, zone
                )));
            }
        }

        Ok(())
    }

    /// Look up one profile
    pub fn get(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::UnknownProfile(name.to_string()))
    }

    /// Resolve requested names, failing on the first unknown one
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Profile>> {
        names.iter().map(|n| self.get(n.as_ref())).collect()
    }

    /// Iterate profiles in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    /// Profile names in configuration order
    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    /// Number of profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profiles are configured
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Resolve a file referenced by a profile
    pub fn config_file(&self, relative: &str) -> PathBuf {
        self.config_dir.join(relative)
    }
}
