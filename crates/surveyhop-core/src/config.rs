//! Run settings and tunnel configuration handles.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// A single tunnel configuration file on disk.
///
/// The display name is the file stem, so `vpns/de-frankfurt.ovpn` shows up
/// in logs and reports as `de-frankfurt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    name: String,
    path: PathBuf,
}

impl TunnelConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Everything a run needs, resolved once at startup and passed down
/// explicitly. Nothing below reads the environment on its own.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory scanned for `.ovpn` files.
    pub config_dir: PathBuf,
    /// Tunnel binary: a bare name resolved via PATH or an explicit path.
    pub tunnel_bin: PathBuf,
    /// Existing credentials file handed to the tunnel as-is.
    pub auth_file: Option<PathBuf>,
    /// Username for a transient credentials file.
    pub auth_username: Option<String>,
    /// Secret for a transient credentials file.
    pub auth_secret: Option<String>,
    /// How long to wait for the tunnel to report a connection.
    pub connect_timeout: Duration,
    /// Per-step deadline for page actions.
    pub action_timeout: Duration,
    /// Pause after dismissing the consent dialog.
    pub consent_settle: Duration,
    /// Pause after the vote click before reading the result.
    pub click_settle: Duration,
    /// Pause after the tunnel connects so routes settle.
    pub route_settle: Duration,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Process at most this many configurations.
    pub max_configs: Option<usize>,
    /// Chrome remote debugging port.
    pub debug_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("vpns"),
            tunnel_bin: PathBuf::from("openvpn"),
            auth_file: None,
            auth_username: None,
            auth_secret: None,
            connect_timeout: Duration::from_secs(30),
            action_timeout: Duration::from_secs(15),
            consent_settle: Duration::from_secs(5),
            click_settle: Duration::from_secs(3),
            route_settle: Duration::from_secs(2),
            headless: true,
            max_configs: None,
            debug_port: 9222,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_file_stem() {
        let config = TunnelConfig::new("/etc/vpns/de-frankfurt.ovpn");
        assert_eq!(config.name(), "de-frankfurt");
        assert_eq!(config.path(), Path::new("/etc/vpns/de-frankfurt.ovpn"));
    }

    #[test]
    fn test_name_without_extension() {
        let config = TunnelConfig::new("plain");
        assert_eq!(config.name(), "plain");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.config_dir, PathBuf::from("vpns"));
        assert_eq!(settings.tunnel_bin, PathBuf::from("openvpn"));
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.action_timeout, Duration::from_secs(15));
        assert!(settings.headless);
        assert_eq!(settings.debug_port, 9222);
        assert!(settings.max_configs.is_none());
    }
}
