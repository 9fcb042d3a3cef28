//! The per-invocation challenge value passed from the CLI down to the publisher and checker.

use crate::error::Error;
use base64::engine::general_purpose;
use base64::{alphabet, engine, DecodeError, Engine};
use lazy_static::lazy_static;
use std::str::FromStr;
use trust_dns_resolver::Name;

/// A single DNS-01 challenge: the name the TXT record lives at and the value it must hold.
///
/// Built once from the hook arguments and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    domain: String,
    token: String,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenValidationError {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(DecodeError),
    #[error("invalid decoded length: found {actual} bytes, expected {expected}")]
    InvalidDecodedLength { actual: usize, expected: usize },
}

const DNS01_DECODED_LEN_BYTES: usize = 32;

lazy_static! {
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

impl ChallengeRequest {
    /// Build a request, rejecting empty values and domains that aren't valid DNS names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChallenge`] for an empty domain or token, and
    /// [`Error::InvalidDomain`] when the domain can't be parsed as a DNS name.
    pub fn new(domain: impl Into<String>, token: impl Into<String>) -> Result<Self, Error> {
        let domain = domain.into();
        let token = token.into();
        if domain.is_empty() {
            return Err(Error::InvalidChallenge("domain must not be empty"));
        }
        if token.is_empty() {
            return Err(Error::InvalidChallenge("token must not be empty"));
        }
        Name::from_str(&domain)?;
        Ok(Self { domain, token })
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The domain as a fully qualified name, so resolvers never apply a search list.
    #[must_use]
    pub fn fqdn(&self) -> String {
        if self.domain.ends_with('.') {
            self.domain.clone()
        } else {
            format!("{}.", self.domain)
        }
    }

    /// Checks that the token looks like an [RFC-8555][RFC-8555] [DNS-01] TXT value: the
    /// unpadded BASE64URL encoding of a 32 byte SHA256 digest.
    ///
    /// The hook publishes whatever it is given; this is only used to warn early.
    ///
    /// [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
    /// [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
    ///
    /// # Errors
    ///
    /// Returns a [`TokenValidationError`] describing why the token isn't a DNS-01 value.
    pub fn valid_dns01(&self) -> Result<(), TokenValidationError> {
        match BASE64_ENGINE.decode(&self.token) {
            Ok(raw) => match raw.len() {
                DNS01_DECODED_LEN_BYTES => Ok(()),
                _ => Err(TokenValidationError::InvalidDecodedLength {
                    actual: raw.len(),
                    expected: DNS01_DECODED_LEN_BYTES,
                }),
            },
            Err(err) => Err(TokenValidationError::InvalidEncoding(err)),
        }
    }
}
