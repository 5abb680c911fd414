//! Tunnel binary resolution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use surveyhop_core::TunnelError;

/// Directories probed when PATH does not contain the binary. Tunnel
/// daemons install into sbin directories that interactive shells often
/// leave off the PATH.
const FALLBACK_DIRS: &[&str] = &["/usr/sbin", "/usr/local/sbin", "/opt/homebrew/sbin"];

/// Resolve the configured tunnel binary to an executable path.
///
/// A value with a directory component must point at an existing
/// executable and is never searched for elsewhere. A bare name is looked
/// up on PATH first, then in the fallback directories.
pub fn resolve_binary(configured: &Path) -> Result<PathBuf, TunnelError> {
    resolve_with_path(configured, std::env::var_os("PATH"))
}

fn resolve_with_path(
    configured: &Path,
    path_var: Option<OsString>,
) -> Result<PathBuf, TunnelError> {
    let cwd = std::env::current_dir()?;

    let has_dir_component = configured
        .parent()
        .map(|p| !p.as_os_str().is_empty())
        .unwrap_or(false);

    if has_dir_component {
        return which::which_in(configured, None::<&OsString>, &cwd)
            .map_err(|_| TunnelError::BinaryNotFound(configured.display().to_string()));
    }

    if let Some(path_var) = &path_var {
        if let Ok(found) = which::which_in(configured, Some(path_var), &cwd) {
            debug!("Resolved tunnel binary to {}", found.display());
            return Ok(found);
        }
    }

    if let Ok(fallback) = std::env::join_paths(FALLBACK_DIRS) {
        if let Ok(found) = which::which_in(configured, Some(&fallback), &cwd) {
            debug!("Resolved tunnel binary to {}", found.display());
            return Ok(found);
        }
    }

    Err(TunnelError::BinaryNotFound(
        configured.display().to_string(),
    ))
}
