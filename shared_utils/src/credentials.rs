//! VPN credential handling.
//!
//! The username/password pair is read once from the environment and kept
//! behind [`SecretString`] so that neither value can leak through `Debug`
//! output or log statements. The only place the values are exposed is the
//! auth file consumed by the VPN client.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ConfigError;

/// Environment variable holding the VPN username.
pub const USER_VAR: &str = "VPN_USER";

/// Environment variable holding the VPN password.
pub const PASS_VAR: &str = "VPN_PASS";

/// VPN username/password pair.
pub struct Credentials {
    username: SecretString,
    password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build a credential pair from explicit values.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: SecretString::from(username.into()),
            password: SecretString::from(password.into()),
        }
    }

    /// Read `VPN_USER` and `VPN_PASS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the pair through an arbitrary lookup function.
    ///
    /// A variable that is unset or empty is reported as
    /// [`ConfigError::MissingValue`] carrying the variable name. The
    /// username is checked before the password.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = required(&lookup, USER_VAR)?;
        let password = required(&lookup, PASS_VAR)?;
        Ok(Self::new(username, password))
    }

    /// Write the pair to `path` as two lines and restrict it to the owner.
    pub fn write_auth_file(&self, path: &Path) -> io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(self.username.expose_secret().as_bytes())?;
        file.write_all(b"\n")?;
        file.write_all(self.password.expose_secret().as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        drop(file);

        // The mode passed at creation is ignored for a pre-existing file.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %path.display(), "Wrote VPN auth file");
        Ok(path.to_path_buf())
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingValue(key.to_string())),
    }
}
