//! Credential sources and the transient credentials file.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use surveyhop_core::TunnelError;

/// Where tunnel credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// An existing file on disk, passed through untouched.
    File(PathBuf),
    /// A username/secret pair materialized into a transient file.
    Inline { username: String, secret: String },
    /// No credentials. The tunnel runs without an auth file.
    None,
}

impl CredentialSource {
    /// Build a source from the three optional settings.
    ///
    /// An explicit file wins over inline values. A username without a
    /// secret (or the reverse) is a configuration error, caught here
    /// before any process is spawned.
    pub fn from_options(
        file: Option<&Path>,
        username: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Self, TunnelError> {
        if let Some(path) = file {
            return Ok(Self::File(path.to_path_buf()));
        }
        match (username, secret) {
            (Some(username), Some(secret)) => Ok(Self::Inline {
                username: username.to_string(),
                secret: secret.to_string(),
            }),
            (None, None) => Ok(Self::None),
            (Some(_), None) => Err(TunnelError::Configuration(
                "auth username given without a secret".to_string(),
            )),
            (None, Some(_)) => Err(TunnelError::Configuration(
                "auth secret given without a username".to_string(),
            )),
        }
    }
}

/// A credentials file ready to hand to the tunnel process.
///
/// The transient variant deletes itself when dropped, so a panic between
/// provisioning and teardown cannot leave the secret on disk.
#[derive(Debug)]
pub struct CredentialFile {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Existing(PathBuf),
    Transient(NamedTempFile),
}

impl CredentialFile {
    pub fn path(&self) -> &Path {
        match &self.inner {
            Inner::Existing(path) => path,
            Inner::Transient(file) => file.path(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.inner, Inner::Transient(_))
    }

    /// Remove the transient file. Existing files are left alone.
    ///
    /// A failed removal is logged and swallowed, teardown must not abort
    /// over it.
    pub fn discard(self) {
        if let Inner::Transient(file) = self.inner {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!("Removed transient credentials file {}", path.display()),
                Err(e) => warn!(
                    "Failed to remove transient credentials file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

/// Materialize a credential source into a file the tunnel can read.
pub fn provision(source: &CredentialSource) -> Result<Option<CredentialFile>, TunnelError> {
    match source {
        CredentialSource::None => Ok(None),
        CredentialSource::File(path) => {
            if !path.is_file() {
                return Err(TunnelError::Configuration(format!(
                    "auth file does not exist: {}",
                    path.display()
                )));
            }
            Ok(Some(CredentialFile {
                inner: Inner::Existing(path.clone()),
            }))
        }
        CredentialSource::Inline { username, secret } => {
            let file = write_transient(username, secret)?;
            debug!(
                "Wrote transient credentials file {}",
                file.path().display()
            );
            Ok(Some(CredentialFile {
                inner: Inner::Transient(file),
            }))
        }
    }
}

/// Two lines, username then secret, the layout OpenVPN expects from
/// `--auth-user-pass`. Owner read/write only.
fn write_transient(username: &str, secret: &str) -> Result<NamedTempFile, TunnelError> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix("surveyhop-auth-")
        .tempfile()?;
    writeln!(file, "{}", username)?;
    writeln!(file, "{}", secret)?;
    file.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(file)
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
