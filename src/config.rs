//! Hook configuration.
//!
//! Read once at startup from an INI file and passed explicitly from there on:
//!
//! ```ini
//! [Login]
//! Username = 0cb2c4e8-0c68-4f84-9a2b-b2a0b0f3ba86
//! Password = htB9mR9DYgcu9bX_afHF62erXaH2TS7bg9KW3F7Z
//!
//! [publisher]
//! kind = acme-dns
//! endpoint = https://auth.acme-dns.io
//! subdomain = 8e5700ea-a4bf-41c7-8a77-e990661dcc6a
//!
//! [propagation]
//! poll_interval = 30
//! max_wait = 600
//! query_timeout = 5
//! nameservers = 8.8.8.8, 1.1.1.1
//! ```
//!
//! Only the `Login` section is required. Durations are in seconds.

use crate::error::Error;
use crate::propagation::PropagationPolicy;
use config::FileFormat;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STATE_PATH: &str = "txt-records.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub publisher: PublisherConfig,
    pub propagation: PropagationPolicy,
    /// Nameservers to poll. Empty means the system resolver configuration.
    pub nameservers: Vec<IpAddr>,
}

/// The `Login` section. Handed to publishers that authenticate.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    #[serde(alias = "Username")]
    pub username: String,
    #[serde(alias = "Password")]
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherConfig {
    AcmeDns {
        endpoint: String,
        subdomain: String,
        request_timeout: Duration,
    },
    File {
        state_path: PathBuf,
    },
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(alias = "Login")]
    login: Credentials,
    #[serde(default)]
    publisher: PublisherSection,
    #[serde(default)]
    propagation: PropagationSection,
}

#[serde_as]
#[derive(Deserialize, Default)]
#[serde(default)]
struct PublisherSection {
    kind: Option<String>,
    endpoint: Option<String>,
    subdomain: Option<String>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    request_timeout: Option<Duration>,
    state_path: Option<PathBuf>,
}

#[serde_as]
#[derive(Deserialize, Default)]
#[serde(default)]
struct PropagationSection {
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    poll_interval: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    max_wait: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    query_timeout: Option<Duration>,
    nameservers: Option<String>,
}

impl Config {
    /// Load and validate the INI configuration at `p`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if there is no file at `p`, [`Error::ConfigSource`] if
    /// it can't be parsed or lacks the `Login` section, and [`Error::InvalidConfig`] if a value
    /// fails validation.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let p = p.as_ref();
        if !p.is_file() {
            return Err(Error::MissingConfig(p.to_path_buf()));
        }
        let raw: ConfigFile = config::Config::builder()
            .add_source(config::File::from(p).format(FileFormat::Ini))
            .build()?
            .try_deserialize()?;
        Self::try_from_raw(raw)
    }

    fn try_from_raw(raw: ConfigFile) -> Result<Self, Error> {
        let publisher = Self::publisher_config(raw.publisher)?;

        let defaults = PropagationPolicy::default();
        let propagation = PropagationPolicy {
            poll_interval: raw
                .propagation
                .poll_interval
                .unwrap_or(defaults.poll_interval),
            max_wait: raw.propagation.max_wait.unwrap_or(defaults.max_wait),
            query_timeout: raw
                .propagation
                .query_timeout
                .unwrap_or(defaults.query_timeout),
        };
        if propagation.max_wait.is_zero() {
            return Err(Error::InvalidConfig("max_wait must be positive".into()));
        }
        if propagation.query_timeout.is_zero() {
            return Err(Error::InvalidConfig("query_timeout must be positive".into()));
        }

        let nameservers = match raw.propagation.nameservers.as_deref() {
            None => vec![],
            Some(list) => Self::parse_nameservers(list)?,
        };

        Ok(Config {
            credentials: raw.login,
            publisher,
            propagation,
            nameservers,
        })
    }

    fn publisher_config(section: PublisherSection) -> Result<PublisherConfig, Error> {
        match section.kind.as_deref().unwrap_or("acme-dns") {
            "acme-dns" => {
                let endpoint = section.endpoint.ok_or_else(|| {
                    Error::InvalidConfig("publisher endpoint is required for acme-dns".into())
                })?;
                let subdomain = section.subdomain.ok_or_else(|| {
                    Error::InvalidConfig("publisher subdomain is required for acme-dns".into())
                })?;
                Ok(PublisherConfig::AcmeDns {
                    endpoint,
                    subdomain,
                    request_timeout: section.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
                })
            }
            "file" => Ok(PublisherConfig::File {
                state_path: section
                    .state_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
            }),
            other => Err(Error::InvalidConfig(format!(
                "unknown publisher kind \"{other}\""
            ))),
        }
    }

    fn parse_nameservers(list: &str) -> Result<Vec<IpAddr>, Error> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .map_err(|_| Error::InvalidConfig(format!("invalid nameserver \"{s}\"")))
            })
            .collect()
    }
}
