//! The `deploy_challenge` / `clean_challenge` operations invoked by the ACME client.

use crate::challenge::ChallengeRequest;
use crate::error::Error;
use crate::propagation::{PropagationChecker, PropagationState, TxtResolver};
use crate::publisher::{DynPublisher, Retraction};
use tracing::{info, warn};

pub struct Hook<R> {
    publisher: DynPublisher,
    checker: PropagationChecker<R>,
}

impl<R: TxtResolver> Hook<R> {
    pub fn new(publisher: DynPublisher, checker: PropagationChecker<R>) -> Self {
        Hook { publisher, checker }
    }

    /// Publish the challenge record, then block until it is visible in DNS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publisher`] if publishing fails, in which case DNS is never polled,
    /// or [`Error::PropagationTimeout`] if the record doesn't show up in time.
    pub async fn deploy_challenge(
        &self,
        request: ChallengeRequest,
    ) -> Result<PropagationState, Error> {
        let domain = request.domain();
        if let Err(err) = request.valid_dns01() {
            warn!("token for \"{domain}\" is not a DNS-01 value ({err}), publishing anyway");
        }

        info!(
            "deploy_challenge: publishing TXT record for \"{domain}\" via {}",
            self.publisher.name()
        );
        self.publisher.publish(&request).await?;
        let policy = self.checker.policy();
        info!(
            "TXT record for \"{domain}\" published, checking propagation every {:?} for up to {:?}",
            policy.poll_interval, policy.max_wait
        );

        self.checker
            .wait_for_propagation(&request.fqdn(), request.token())
            .await
    }

    /// Retract the challenge record. Nothing to retract is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Publisher`] if the publisher fails to retract.
    pub async fn clean_challenge(&self, request: ChallengeRequest) -> Result<Retraction, Error> {
        let domain = request.domain();
        info!(
            "clean_challenge: deleting TXT record for \"{domain}\" via {}",
            self.publisher.name()
        );
        let outcome = self.publisher.retract(&request).await?;
        match outcome {
            Retraction::Removed => info!("TXT record for \"{domain}\" deleted"),
            Retraction::NotFound => warn!("no TXT record for \"{domain}\" to delete"),
            Retraction::Unsupported => warn!(
                "{} can't delete TXT records, \"{domain}\" left in place",
                self.publisher.name()
            ),
        }
        Ok(outcome)
    }
}
