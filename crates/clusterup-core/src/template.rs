//! Install configuration template renderer
//!
//! Templates are `install-<template>.yaml` files in the configuration
//! directory with `{{identifier}}` placeholders, where an identifier is made
//! of letters, digits, `_` and `.`.
//!
//! Resolution per placeholder:
//!
//! 1. `lbFloatingIP` → the API address
//! 2. `ingressFloatingIP` → the ingress address
//! 3. `pullSecret` → contents of the profile's pull secret file, read on every render
//! 4. anything else → the profile field with that name
//!
//! An identifier that resolves to nothing fails the whole render. Values are
//! inserted verbatim and never scanned again.

use crate::config::Profile;
use crate::error::{Error, Result};
use crate::traits::AddressPair;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([_a-zA-Z0-9.]*)\}\}").expect("placeholder pattern is valid")
});

/// A parsed placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder<'a> {
    /// `{{lbFloatingIP}}`
    LbFloatingIp,
    /// `{{ingressFloatingIP}}`
    IngressFloatingIp,
    /// `{{pullSecret}}`
    PullSecret,
    /// Any other identifier, looked up in the profile
    ProfileField(&'a str),
}

impl<'a> Placeholder<'a> {
    /// Reserved identifiers, in resolution order
    pub const RESERVED: [&'static str; 3] = ["lbFloatingIP", "ingressFloatingIP", "pullSecret"];

    /// Classify an identifier
    pub fn parse(identifier: &'a str) -> Self {
        match identifier {
            "lbFloatingIP" => Placeholder::LbFloatingIp,
            "ingressFloatingIP" => Placeholder::IngressFloatingIp,
            "pullSecret" => Placeholder::PullSecret,
            other => Placeholder::ProfileField(other),
        }
    }
}

/// Renders install configurations for profiles
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    config_dir: PathBuf,
}

impl TemplateRenderer {
    /// Create a renderer reading templates and secrets from `config_dir`
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Path of the template selected by a template identifier
    pub fn template_path(&self, template: &str) -> PathBuf {
        self.config_dir.join(format!("install-{}.yaml", template))
    }

    /// Read the template of a profile
    pub async fn load(&self, profile: &Profile) -> Result<String> {
        let path = self.template_path(&profile.template);
        read_file(&path).await.map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => Error::TemplateMissing(path),
            other => other,
        })
    }

    /// Load and render the template of a profile
    pub async fn render_profile(&self, profile: &Profile, addresses: &AddressPair) -> Result<String> {
        let template = self.load(profile).await?;
        self.render(profile, addresses, &template).await
    }

    /// Render the template of a profile with placeholder addresses
    ///
    /// Surfaces a missing template, missing pull secret or unresolved
    /// placeholder before anything real has been allocated.
    pub async fn preflight(&self, profile: &Profile) -> Result<()> {
        let unspecified = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let addresses = AddressPair {
            api: unspecified,
            apps: unspecified,
        };
        self.render_profile(profile, &addresses).await.map(|_| ())
    }

    /// Substitute every placeholder in `template`
    pub async fn render(&self, profile: &Profile, addresses: &AddressPair, template: &str) -> Result<String> {
        // (start, end, identifier) of every placeholder, collected before any file read
        let spans: Vec<(usize, usize, &str)> = PLACEHOLDER
            .captures_iter(template)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let identifier = captures.get(1)?;
                Some((whole.start(), whole.end(), identifier.as_str()))
            })
            .collect();

        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;

        for (start, end, identifier) in spans {
            let value = self
                .resolve(Placeholder::parse(identifier), profile, addresses)
                .await?;
            rendered.push_str(&template[last..start]);
            rendered.push_str(&value);
            last = end;
        }

        rendered.push_str(&template[last..]);
        Ok(rendered)
    }

    async fn resolve(&self, placeholder: Placeholder<'_>, profile: &Profile, addresses: &AddressPair) -> Result<String> {
        match placeholder {
            Placeholder::LbFloatingIp => Ok(addresses.api.to_string()),
            Placeholder::IngressFloatingIp => Ok(addresses.apps.to_string()),
            Placeholder::PullSecret => {
                let file = profile.pull_secret_file.as_deref().ok_or_else(|| {
                    Error::config_missing(format!(
                        "Profile {} uses {{{{pullSecret}}}} but has no pullRequestJsonFile",
                        profile.name
                    ))
                })?;
                let path = self.config_dir.join(file);
                read_file(&path).await.map_err(|e| {
                    Error::config_missing(format!("Pull secret {}: {}", path.display(), e))
                })
            }
            Placeholder::ProfileField(identifier) => profile
                .field(identifier)
                .ok_or_else(|| Error::UnresolvedPlaceholder(identifier.to_string())),
        }
    }
}

async fn read_file(path: &Path) -> Result<String> {
    Ok(tokio::fs::read_to_string(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn profile() -> Profile {
        Profile {
            name: "ci".to_string(),
            template: "default".to_string(),
            os_cloud: "psi".to_string(),
            base_domain: "example.com".to_string(),
            cluster_name: "foo".to_string(),
            external_network: "public".to_string(),
            installer_version: "4.6".to_string(),
            installer_channel: "ocp".to_string(),
            only_masters: false,
            pull_secret_file: Some("pull.json".to_string()),
            htpasswd_file: None,
            router_certificate: false,
            extra: BTreeMap::new(),
        }
    }

    fn addresses() -> AddressPair {
        AddressPair {
            api: "10.0.0.1".parse().unwrap(),
            apps: "10.0.0.2".parse().unwrap(),
        }
    }

    #[test]
    fn test_placeholder_dispatch() {
        assert_eq!(Placeholder::parse("lbFloatingIP"), Placeholder::LbFloatingIp);
        assert_eq!(Placeholder::parse("ingressFloatingIP"), Placeholder::IngressFloatingIp);
        assert_eq!(Placeholder::parse("pullSecret"), Placeholder::PullSecret);
        assert_eq!(Placeholder::parse("clusterName"), Placeholder::ProfileField("clusterName"));
        for reserved in Placeholder::RESERVED {
            assert!(!matches!(Placeholder::parse(reserved), Placeholder::ProfileField(_)));
        }
    }

    #[tokio::test]
    async fn test_render_substitutes_addresses_and_fields() {
        let renderer = TemplateRenderer::new("config");
        let out = renderer
            .render(
                &profile(),
                &addresses(),
                "name: {{clusterName}}\nbase: {{baseDomain}}\nlb: {{lbFloatingIP}}\ningress: {{ingressFloatingIP}}\n",
            )
            .await
            .unwrap();
        assert_eq!(out, "name: foo\nbase: example.com\nlb: 10.0.0.1\ningress: 10.0.0.2\n");
    }

    #[tokio::test]
    async fn test_render_is_not_recursive() {
        let mut profile = profile();
        profile
            .extra
            .insert("note".to_string(), serde_json::Value::String("{{clusterName}}".to_string()));

        let out = TemplateRenderer::new("config")
            .render(&profile, &addresses(), "{{note}}").await
            .unwrap();
        assert_eq!(out, "{{clusterName}}");
    }

    #[tokio::test]
    async fn test_render_fails_on_unknown_identifier() {
        let err = TemplateRenderer::new("config")
            .render(&profile(), &addresses(), "a: {{clusterName}}\nb: {{nope}}\n").await
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholder(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_empty_placeholder_is_unresolved() {
        let err = TemplateRenderer::new("config")
            .render(&profile(), &addresses(), "{{}}").await
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholder(ref id) if id.is_empty()));
    }

    #[tokio::test]
    async fn test_other_braces_are_left_alone() {
        let out = TemplateRenderer::new("config")
            .render(&profile(), &addresses(), "{{ spaced }} {single} {{a-b}}").await
            .unwrap();
        assert_eq!(out, "{{ spaced }} {single} {{a-b}}");
    }

    #[tokio::test]
    async fn test_pull_secret_is_read_on_every_render() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TemplateRenderer::new(dir.path());
        let secret = dir.path().join("pull.json");

        std::fs::write(&secret, "{\"auths\":{}}").unwrap();
        let first = renderer.render(&profile(), &addresses(), "{{pullSecret}}").await.unwrap();
        std::fs::write(&secret, "{\"auths\":{\"x\":{}}}").unwrap();
        let second = renderer.render(&profile(), &addresses(), "{{pullSecret}}").await.unwrap();

        assert_eq!(first, "{\"auths\":{}}");
        assert_eq!(second, "{\"auths\":{\"x\":{}}}");
    }

    #[tokio::test]
    async fn test_pull_secret_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateRenderer::new(dir.path())
            .render(&profile(), &addresses(), "{{pullSecret}}").await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));

        let mut no_secret = profile();
        no_secret.pull_secret_file = None;
        let err = TemplateRenderer::new(dir.path())
            .render(&no_secret, &addresses(), "{{pullSecret}}").await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }

    #[tokio::test]
    async fn test_missing_template_is_distinguishable() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateRenderer::new(dir.path()).load(&profile()).await.unwrap_err();
        assert!(matches!(err, Error::TemplateMissing(ref p) if p.ends_with("install-default.yaml")));
    }

    #[tokio::test]
    async fn test_preflight_reports_unresolved_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("install-default.yaml"), "{{lbFloatingIP}} {{workerCount}}").unwrap();
        let err = TemplateRenderer::new(dir.path()).preflight(&profile()).await.unwrap_err();
        assert!(matches!(err, Error::UnresolvedPlaceholder(ref id) if id == "workerCount"));
    }
}
