//! Module version resolution.

/// Maps a module identity to the version stamped into its artifact.
pub trait VersionResolver {
    fn resolve(&self, identity: &str) -> String;
}

/// Resolves every module to this workspace's package version.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageVersion;

impl VersionResolver for PackageVersion {
    fn resolve(&self, _identity: &str) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Resolves every module to a fixed version, e.g. from `--version-override`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVersion(pub String);

impl VersionResolver for StaticVersion {
    fn resolve(&self, _identity: &str) -> String {
        self.0.clone()
    }
}
