//! surveyhop - rotates VPN exits and casts one scripted survey vote per exit.
//!
//! Main entry point for the surveyhop CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use surveyhop_browser::VoteExecutor;
use surveyhop_core::{Runner, Settings, discover_configs};
use surveyhop_tunnel::TunnelSupervisor;

/// surveyhop CLI.
#[derive(Parser)]
#[command(name = "surveyhop")]
#[command(about = "Rotates VPN exits and casts one scripted survey vote per exit")]
#[command(version)]
struct Cli {
    /// Directory containing .ovpn configuration files
    #[arg(long, env = "SURVEYHOP_CONFIG_DIR", default_value = "vpns")]
    config_dir: PathBuf,

    /// Tunnel binary name or path
    #[arg(long, env = "SURVEYHOP_TUNNEL_BIN", default_value = "openvpn")]
    tunnel_bin: PathBuf,

    /// Existing credentials file handed to the tunnel unchanged
    #[arg(long, env = "SURVEYHOP_AUTH_FILE")]
    auth_file: Option<PathBuf>,

    /// Tunnel auth username, paired with --auth-secret
    #[arg(long, env = "SURVEYHOP_AUTH_USERNAME")]
    auth_username: Option<String>,

    /// Tunnel auth password, paired with --auth-username
    #[arg(long, env = "SURVEYHOP_AUTH_SECRET", hide_env_values = true)]
    auth_secret: Option<String>,

    /// Seconds to wait for a tunnel to report it is connected
    #[arg(long, env = "SURVEYHOP_CONNECT_TIMEOUT", default_value_t = 30)]
    connect_timeout: u64,

    /// Seconds to wait for page loads and element lookups
    #[arg(long, env = "SURVEYHOP_ACTION_TIMEOUT", default_value_t = 15)]
    action_timeout: u64,

    /// Seconds to pause after dismissing the consent dialog
    #[arg(long, env = "SURVEYHOP_CONSENT_SETTLE", default_value_t = 5)]
    consent_settle: u64,

    /// Seconds to wait after the vote click before reading the result
    #[arg(long, env = "SURVEYHOP_CLICK_SETTLE", default_value_t = 3)]
    click_settle: u64,

    /// Seconds to wait after the tunnel connects before opening the browser
    #[arg(long, env = "SURVEYHOP_ROUTE_SETTLE", default_value_t = 2)]
    route_settle: u64,

    /// Run the browser with a visible window
    #[arg(long, env = "SURVEYHOP_HEADED")]
    headed: bool,

    /// Process at most this many configurations
    #[arg(long, env = "SURVEYHOP_MAX_CONFIGS")]
    max_configs: Option<usize>,

    /// Directory for rotated log files
    #[arg(long, env = "SURVEYHOP_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Port for the Chrome DevTools endpoint
    #[arg(long, env = "SURVEYHOP_DEBUG_PORT", default_value_t = 9222)]
    debug_port: u16,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            config_dir: self.config_dir.clone(),
            tunnel_bin: self.tunnel_bin.clone(),
            auth_file: self.auth_file.clone(),
            auth_username: self.auth_username.clone(),
            auth_secret: self.auth_secret.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            action_timeout: Duration::from_secs(self.action_timeout),
            consent_settle: Duration::from_secs(self.consent_settle),
            click_settle: Duration::from_secs(self.click_settle),
            route_settle: Duration::from_secs(self.route_settle),
            headless: !self.headed,
            max_configs: self.max_configs,
            debug_port: self.debug_port,
        }
    }
}

/// Initialize tracing with console and file output.
///
/// Log files are written to the log directory with daily rotation.
fn init_tracing(log_dir: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("surveyhop")
        .filename_suffix("log")
        .max_log_files(30)
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard in a static to keep the file writer alive for the
    // program duration.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer (human-readable text format with colors)
        .with(fmt::layer().with_target(true).with_ansi(true))
        // File layer (text format without colors)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(&cli.log_dir)?;

    let settings = cli.settings();

    info!("Starting surveyhop v{}", env!("CARGO_PKG_VERSION"));

    let configs = discover_configs(&settings.config_dir, settings.max_configs)?;
    if configs.is_empty() {
        error!(
            "No .ovpn files found in {}",
            settings.config_dir.display()
        );
        return Err(format!(
            "no tunnel configurations in {}",
            settings.config_dir.display()
        )
        .into());
    }
    info!(
        "Found {} tunnel configurations in {}",
        configs.len(),
        settings.config_dir.display()
    );

    let tunnels = TunnelSupervisor::new(&settings);
    let action = VoteExecutor::new(&settings);
    let runner = Runner::new(&settings, Box::new(tunnels), Box::new(action));

    runner.run(&configs).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_map_to_settings() {
        let cli = Cli::parse_from(["surveyhop"]);
        let settings = cli.settings();
        assert_eq!(settings.config_dir, PathBuf::from("vpns"));
        assert_eq!(settings.tunnel_bin, PathBuf::from("openvpn"));
        assert!(settings.auth_file.is_none());
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.action_timeout, Duration::from_secs(15));
        assert_eq!(settings.consent_settle, Duration::from_secs(5));
        assert_eq!(settings.click_settle, Duration::from_secs(3));
        assert_eq!(settings.route_settle, Duration::from_secs(2));
        assert!(settings.headless);
        assert_eq!(settings.max_configs, None);
        assert_eq!(settings.debug_port, 9222);
    }

    #[test]
    fn test_headed_flag_disables_headless() {
        let cli = Cli::parse_from(["surveyhop", "--headed"]);
        assert!(!cli.settings().headless);
    }

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::parse_from([
            "surveyhop",
            "--config-dir",
            "/etc/exits",
            "--connect-timeout",
            "5",
            "--max-configs",
            "2",
            "--auth-username",
            "alice",
            "--auth-secret",
            "hunter2",
        ]);
        let settings = cli.settings();
        assert_eq!(settings.config_dir, PathBuf::from("/etc/exits"));
        assert_eq!(settings.connect_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_configs, Some(2));
        assert_eq!(settings.auth_username.as_deref(), Some("alice"));
        assert_eq!(settings.auth_secret.as_deref(), Some("hunter2"));
    }
}
