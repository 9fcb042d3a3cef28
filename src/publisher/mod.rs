//! Publishing and retracting challenge TXT records.
//!
//! A [`Publisher`] is the only part of the hook that changes DNS. Everything behind it
//! (registrar portals, DNS APIs, local zone state) is free to change as long as the contract
//! holds:
//!
//! * after [`Publisher::publish`] succeeds the record will *eventually* resolve, and
//!   [propagation checking][crate::propagation] decides when;
//! * [`Publisher::retract`] is idempotent: retracting something that isn't there is reported
//!   as [`Retraction::NotFound`], never as an error.
//!
//! Publishers are never retried by the hook; retry policy belongs to the ACME client driving it.
//!
//! Three implementations are provided: [`acme_dns::AcmeDnsPublisher`] talks to an [acme-dns]
//! compatible HTTP API, [`file::FilePublisher`] keeps records in a JSON file, and
//! [`memory::InMemoryPublisher`] keeps them in process.
//!
//! [acme-dns]: https://github.com/joohoi/acme-dns

use crate::challenge::ChallengeRequest;
use crate::config::{Config, PublisherConfig};
use crate::error::Error;

pub mod acme_dns;
pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use acme_dns::AcmeDnsPublisher;
#[allow(clippy::module_name_repetitions)]
pub use file::FilePublisher;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryPublisher;

/// `DynPublisher` is a boxed [`Publisher`] chosen at runtime from the
/// [`Config::publisher`][crate::config::Config::publisher] section.
#[allow(clippy::module_name_repetitions)]
pub type DynPublisher = Box<dyn Publisher>;

/// PublisherError enumerates the ways publishing or retracting a record can fail.
#[derive(thiserror::Error, Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum PublisherError {
    /// The backend refused the configured `Login` credentials.
    #[error("credentials rejected")]
    Unauthorized,

    /// The backend answered with a non-success status.
    #[error("update rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never produced a usable response.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}

/// Non-fatal outcome of [`Publisher::retract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retraction {
    /// The record was found and removed.
    Removed,
    /// There was nothing to remove.
    NotFound,
    /// The backend has no way to remove records and expires them itself.
    Unsupported,
}

/// An async trait describing a backend able to create and remove the challenge TXT record.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// Short backend name used in log lines.
    fn name(&self) -> &'static str;

    /// Create the TXT record `request.domain()` holding `request.token()`.
    async fn publish(&self, request: &ChallengeRequest) -> Result<(), PublisherError>;

    /// Remove the TXT record created by [`Publisher::publish`] for the same request.
    async fn retract(&self, request: &ChallengeRequest) -> Result<Retraction, PublisherError>;
}

/// Build the publisher selected by the configuration.
///
/// # Errors
///
/// Returns [`Error::Publisher`] if the backend can't be initialised, e.g. the HTTP client
/// can't be built or the JSON state file can't be read.
pub async fn from_config(config: &Config) -> Result<DynPublisher, Error> {
    let publisher: DynPublisher = match &config.publisher {
        PublisherConfig::AcmeDns {
            endpoint,
            subdomain,
            request_timeout,
        } => Box::new(AcmeDnsPublisher::new(
            endpoint,
            subdomain.clone(),
            config.credentials.clone(),
            *request_timeout,
        )?),
        PublisherConfig::File { state_path } => {
            Box::new(FilePublisher::try_from_file(state_path).await?)
        }
    };
    Ok(publisher)
}

/// The key records are stored under: the lower-cased FQDN.
pub(crate) fn record_key(request: &ChallengeRequest) -> String {
    request.fqdn().to_ascii_lowercase()
}
