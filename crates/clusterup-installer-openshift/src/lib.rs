// # OpenShift Installer Collaborators
//
// Implementations of the installer-side traits of `clusterup-core`:
//
// - [`OpenshiftInstaller`]: `openshift-install create cluster` / `destroy cluster`
// - [`CachedFetcher`]: resolves an installer version to a cached executable,
//   downloading it when a URL template is configured
// - [`ScriptHooks`]: post-install shell scripts
//
// All child processes go through `clusterup_core::exec`, so none of them
// inherits the ambient `OS_CLOUD`.

mod driver;
mod fetcher;
mod hooks;

pub use driver::OpenshiftInstaller;
pub use fetcher::{CachedFetcher, INSTALLER_BINARY};
pub use hooks::{ScriptHooks, HTPASSWD_SCRIPT, ROUTER_CERT_SCRIPT, SCALE_SCRIPT};
