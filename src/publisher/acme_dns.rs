//! [acme-dns] compatible HTTP API publisher.
//!
//! Updates are `POST`ed to `{endpoint}/update` with the configured `Login` credentials in the
//! `X-Api-User` and `X-Api-Key` headers:
//!
//! ```json
//! { "subdomain": "8e5700ea-a4bf-41c7-8a77-e990661dcc6a", "txt": "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX" }
//! ```
//!
//! The challenge domain is expected to `CNAME` to the account's acme-dns full domain, which is
//! why the request only names the `subdomain`. acme-dns has no delete endpoint and keeps the
//! two most recent values per subdomain, so [`Publisher::retract`] reports
//! [`Retraction::Unsupported`].
//!
//! [acme-dns]: https://github.com/joohoi/acme-dns

use crate::challenge::ChallengeRequest;
use crate::config::Credentials;
use crate::publisher::{Publisher, PublisherError, Retraction};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize, Debug, Clone, Default, Eq, PartialEq)]
struct UpdateRecordRequest<'a> {
    subdomain: &'a str,
    txt: &'a str,
}

#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
struct UpdateRecordResult {
    txt: String,
}

#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct AcmeDnsPublisher {
    client: reqwest::Client,
    update_url: String,
    subdomain: String,
    credentials: Credentials,
}

impl AcmeDnsPublisher {
    /// # Errors
    ///
    /// Returns [`PublisherError::Http`] if the HTTP client can't be built.
    pub fn new(
        endpoint: &str,
        subdomain: String,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self, PublisherError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            update_url: format!("{}/update", endpoint.trim_end_matches('/')),
            subdomain,
            credentials,
        })
    }
}

#[async_trait::async_trait]
impl Publisher for AcmeDnsPublisher {
    fn name(&self) -> &'static str {
        "acme-dns"
    }

    async fn publish(&self, request: &ChallengeRequest) -> Result<(), PublisherError> {
        let response = self
            .client
            .post(&self.update_url)
            .header("X-Api-User", &self.credentials.username)
            .header("X-Api-Key", self.credentials.password())
            .json(&UpdateRecordRequest {
                subdomain: &self.subdomain,
                txt: request.token(),
            })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                // The update is applied once acme-dns answers 2xx, whatever the body says.
                let body = response.bytes().await.unwrap_or_default();
                match serde_json::from_slice::<UpdateRecordResult>(&body) {
                    Ok(result) => {
                        debug!("acme-dns accepted update for {}: {}", self.subdomain, result.txt);
                    }
                    Err(err) => debug!(
                        "acme-dns accepted update for {} with unexpected body: {err}",
                        self.subdomain
                    ),
                }
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PublisherError::Unauthorized),
            status => Err(PublisherError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn retract(&self, request: &ChallengeRequest) -> Result<Retraction, PublisherError> {
        debug!(
            "acme-dns can't delete the TXT record for {}, leaving it to expire",
            request.domain()
        );
        Ok(Retraction::Unsupported)
    }
}
