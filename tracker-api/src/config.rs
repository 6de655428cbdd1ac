use std::env::{self, VarError};

use url::Url;

pub const DEFAULT_BASE_ADDRESS: &str = "http://localhost:8000";

/// Whether requests carry session cookies. Mirrors the browser notion of
/// `credentials: include` vs `omit`; with [`CredentialsMode::Omit`] the client
/// is built without a cookie store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    #[default]
    Include,
    Omit,
}

/// Explicitly constructed client configuration, passed in rather than read
/// from module-level state.
#[derive(Debug, Clone)]
pub struct Config {
    base_address: Url,
    credentials_mode: CredentialsMode,
}

impl Config {
    pub fn new(base_address: Url, credentials_mode: CredentialsMode) -> Self {
        Self {
            base_address,
            credentials_mode,
        }
    }

    /// Reads `TRACKER_BASE_URL` and `TRACKER_CREDENTIALS` (`include`/`omit`),
    /// falling back to the local backend with cookies enabled.
    pub fn from_env() -> Result<Self, url::ParseError> {
        let base = match env::var("TRACKER_BASE_URL") {
            Ok(base) => base,
            Err(VarError::NotPresent | VarError::NotUnicode(_)) => {
                DEFAULT_BASE_ADDRESS.to_owned()
            }
        };
        let credentials_mode = match env::var("TRACKER_CREDENTIALS").as_deref() {
            Ok("omit") => CredentialsMode::Omit,
            _ => CredentialsMode::Include,
        };
        Ok(Self::new(Url::parse(&base)?, credentials_mode))
    }

    pub fn base_address(&self) -> &Url {
        &self.base_address
    }

    pub fn credentials_mode(&self) -> CredentialsMode {
        self.credentials_mode
    }

    /// Joins `path` (e.g. `/trials?grade=8`) onto the base address.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_address.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
    }
}
