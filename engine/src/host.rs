//! Build-host identification for artifact preambles.

use std::fmt;

/// Host name plus OS and architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
}

impl fmt::Display for HostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.hostname, self.os, self.arch)
    }
}

pub trait HostProbe {
    fn probe(&self) -> HostInfo;
}

/// Probes the machine running the generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostProbe for SystemHost {
    fn probe(&self) -> HostInfo {
        HostInfo {
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Returns a fixed host, for reproducible output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedHost(pub HostInfo);

impl FixedHost {
    pub fn new(hostname: &str, os: &str, arch: &str) -> Self {
        Self(HostInfo {
            hostname: hostname.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }
}

impl HostProbe for FixedHost {
    fn probe(&self) -> HostInfo {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_host_reports_platform() {
        let host = SystemHost.probe();
        assert!(!host.hostname.is_empty());
        assert_eq!(host.os, std::env::consts::OS);
        assert_eq!(host.arch, std::env::consts::ARCH);
    }

    #[test]
    fn test_fixed_host_display() {
        let host = FixedHost::new("build-01", "linux", "x86_64").probe();
        assert_eq!(host.to_string(), "build-01 (linux/x86_64)");
    }
}
