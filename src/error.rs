//! Error types.

use crate::publisher::PublisherError;
use std::path::PathBuf;
use std::time::Duration;
use trust_dns_resolver::error::ResolveError;
use trust_dns_resolver::proto::error::ProtoError;

/// Error enumerates the possible hook error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned at startup when the [credentials file][crate::config::Config::try_from_file]
    /// does not exist. Nothing else is attempted.
    #[error("Please provide a configuration file named '{}'.", .0.display())]
    MissingConfig(PathBuf),

    /// Returned when the configuration file exists but can't be parsed, is missing the
    /// `Login` section, or holds values that fail validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when the config layer itself fails to read or deserialize a source.
    #[error("invalid configuration")]
    ConfigSource(#[from] config::ConfigError),

    /// Returned when a [`ChallengeRequest`][crate::challenge::ChallengeRequest] is built
    /// from an empty domain or token.
    #[error("invalid challenge: {0}")]
    InvalidChallenge(&'static str),

    /// Returned when the challenge domain isn't a valid DNS name.
    #[error("invalid domain name")]
    InvalidDomain(#[from] ProtoError),

    /// Returned when publishing or retracting the TXT record failed. Never retried.
    #[error("publisher error: {0}")]
    Publisher(#[from] PublisherError),

    /// Returned when the TXT record wasn't observed within the
    /// [`max_wait`][crate::propagation::PropagationPolicy::max_wait] budget.
    #[error("TXT record for \"{domain}\" not propagated after {attempts} attempts ({elapsed:?})")]
    PropagationTimeout {
        domain: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Returned when the DNS resolver can't be constructed from the system or configured
    /// nameservers.
    #[error("DNS resolver error")]
    Resolver(#[from] ResolveError),
}
