// # DNS Names
//
// Naming rules shared by the provider, the reaper and every backend.
//
// The DNS APIs this crate talks to are dot-sensitive: `foo.example.com` and
// `foo.example.com.` are different strings to them, and a missing trailing
// dot turns into a false "not found". Every name is therefore passed through
// `fqdn()` before it reaches a backend.
//
// Wildcard labels come back from hosted zone listings in octal-escaped form
// (`\052.apps.foo.example.com.`), while they are written as `*`. `canonical()`
// folds both spellings onto one form for comparisons.

/// Octal escape of the `*` wildcard label
pub const ESCAPED_WILDCARD: &str = "\\052";

/// Prefix of the API record
pub const API_PREFIX: &str = "api";

/// Prefix of the wildcard ingress record
pub const APPS_PREFIX: &str = "*.apps";

/// Append the trailing dot if it is missing
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Comparison form: fully qualified, lowercase, wildcard label escaped
pub fn canonical(name: &str) -> String {
    let name = fqdn(name).to_ascii_lowercase();
    match name.strip_prefix("*.") {
        Some(rest) => format!("{}.{}", ESCAPED_WILDCARD, rest),
        None => name,
    }
}

/// Role of one floating address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordRole {
    /// API load balancer address
    Api,
    /// Wildcard ingress address
    Apps,
}

impl RecordRole {
    /// Record prefix published for this role
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordRole::Api => API_PREFIX,
            RecordRole::Apps => APPS_PREFIX,
        }
    }

    /// Short role name
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordRole::Api => "api",
            RecordRole::Apps => "apps",
        }
    }
}

impl std::fmt::Display for RecordRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DNS naming for one cluster: `<cluster>.<base domain>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterDomain {
    cluster_name: String,
    base_domain: String,
}

impl ClusterDomain {
    /// Create the naming for a cluster under a base domain
    ///
    /// A trailing dot on the base domain is accepted and dropped.
    pub fn new(cluster_name: impl Into<String>, base_domain: impl Into<String>) -> Self {
        let base_domain = base_domain.into();
        Self {
            cluster_name: cluster_name.into(),
            base_domain: base_domain.trim_end_matches('.').to_string(),
        }
    }

    /// Cluster name
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Base domain, without trailing dot
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Cluster subzone name, `<cluster>.<base domain>` (no trailing dot)
    pub fn zone_name(&self) -> String {
        format!("{}.{}", self.cluster_name, self.base_domain)
    }

    /// Fully-qualified name of the parent zone records are published in
    pub fn base_zone(&self) -> String {
        fqdn(&self.base_domain)
    }

    /// Fully-qualified record name, `<prefix>.<cluster>.<base domain>.`
    pub fn record_name(&self, prefix: &str) -> String {
        fqdn(&format!("{}.{}", prefix, self.zone_name()))
    }

    /// Name of the API record as left behind by the cluster reaper
    pub fn stray_api_record(&self) -> String {
        format!("{}.{}", API_PREFIX, self.zone_name())
    }

    /// Name of the wildcard ingress record as listed by the hosted zone API
    pub fn stray_apps_record(&self) -> String {
        format!("{}.apps.{}", ESCAPED_WILDCARD, self.zone_name())
    }
}

impl std::fmt::Display for ClusterDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.cluster_name, self.base_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqdn_is_idempotent() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
        assert_eq!(fqdn(&fqdn("example.com")), "example.com.");
    }

    #[test]
    fn test_canonical_folds_wildcard_spellings() {
        assert_eq!(
            canonical("*.apps.foo.example.com"),
            canonical("\\052.apps.foo.example.com.")
        );
        assert_eq!(canonical("API.Foo.Example.com"), "api.foo.example.com.");
    }

    #[test]
    fn test_cluster_domain_names() {
        let domain = ClusterDomain::new("foo", "example.com.");
        assert_eq!(domain.zone_name(), "foo.example.com");
        assert_eq!(domain.base_zone(), "example.com.");
        assert_eq!(domain.record_name(API_PREFIX), "api.foo.example.com.");
        assert_eq!(domain.record_name(APPS_PREFIX), "*.apps.foo.example.com.");
        assert_eq!(domain.stray_api_record(), "api.foo.example.com");
        assert_eq!(domain.stray_apps_record(), "\\052.apps.foo.example.com");
    }

    #[test]
    fn test_role_prefixes() {
        assert_eq!(RecordRole::Api.prefix(), "api");
        assert_eq!(RecordRole::Apps.prefix(), "*.apps");
        assert_eq!(RecordRole::Apps.to_string(), "apps");
    }
}
