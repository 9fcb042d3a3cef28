//! DNS propagation checking.
//!
//! After a [publisher][crate::publisher] reports success the TXT record still has to reach the
//! resolvers the certificate authority will use. [`PropagationChecker`] polls DNS until the
//! expected [RFC-8555][RFC-8555] [DNS-01] value is visible, or gives up once the
//! [`PropagationPolicy::max_wait`] budget is spent.
//!
//! Individual query failures (NXDOMAIN, SERVFAIL, timeouts) are expected while a record
//! propagates and only ever count as "not yet".
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

use crate::error::Error;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};
use trust_dns_resolver::error::ResolveError;

pub mod resolver;

pub use resolver::SystemResolver;

/// A failed TXT query. Never surfaced on its own, see [`PropagationChecker::is_propagated`].
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("query timed out after {0:?}")]
    TimedOut(Duration),
}

/// An async trait describing a source of TXT record values.
#[async_trait::async_trait]
pub trait TxtResolver: Send + Sync {
    /// Return every character-string of every TXT record at `name`, in answer order.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, QueryError>;
}

/// Timing knobs for [`PropagationChecker::wait_for_propagation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPolicy {
    /// Sleep between two polls.
    pub poll_interval: Duration,
    /// Overall budget. Once spent the wait fails with [`Error::PropagationTimeout`].
    pub max_wait: Duration,
    /// Bound on a single query, independent of `max_wait`.
    pub query_timeout: Duration,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(600),
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// Progress of a single wait. Only lives as long as the polling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationState {
    pub attempts: u32,
    pub elapsed: Duration,
}

pub struct PropagationChecker<R> {
    resolver: R,
    policy: PropagationPolicy,
}

impl<R: TxtResolver> PropagationChecker<R> {
    pub fn new(resolver: R, policy: PropagationPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn policy(&self) -> &PropagationPolicy {
        &self.policy
    }

    /// Returns true iff one of the TXT strings at `domain` is exactly `expected`.
    ///
    /// Any query failure is logged and reported as `false`.
    pub async fn is_propagated(&self, domain: &str, expected: &str) -> bool {
        match self.query(domain).await {
            Ok(values) => {
                debug!("TXT {domain} -> {values:?}");
                values.iter().any(|value| value == expected)
            }
            Err(err) => {
                debug!("TXT query for {domain} failed: {err}");
                false
            }
        }
    }

    /// Poll [`Self::is_propagated`] until it holds, sleeping
    /// [`poll_interval`][PropagationPolicy::poll_interval] between attempts.
    ///
    /// The first poll happens immediately. If the next poll would land past
    /// [`max_wait`][PropagationPolicy::max_wait] the remaining budget is slept out and no
    /// further poll is made.
    ///
    /// Dropping the returned future cancels the wait.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropagationTimeout`] carrying the attempt count and elapsed time when
    /// the budget runs out.
    pub async fn wait_for_propagation(
        &self,
        domain: &str,
        expected: &str,
    ) -> Result<PropagationState, Error> {
        let start = Instant::now();
        let mut state = PropagationState::default();
        loop {
            state.attempts += 1;
            let propagated = self.is_propagated(domain, expected).await;
            state.elapsed = start.elapsed();
            if propagated {
                info!(
                    "TXT record for {domain} propagated after {} attempts ({:?})",
                    state.attempts, state.elapsed
                );
                return Ok(state);
            }

            let remaining = self.policy.max_wait.saturating_sub(state.elapsed);
            if state.elapsed >= self.policy.max_wait || self.policy.poll_interval > remaining {
                sleep(remaining).await;
                return Err(Error::PropagationTimeout {
                    domain: domain.to_string(),
                    attempts: state.attempts,
                    elapsed: start.elapsed(),
                });
            }

            info!(
                "TXT record for {domain} not propagated (attempt {}), waiting {:?}",
                state.attempts, self.policy.poll_interval
            );
            sleep(self.policy.poll_interval).await;
        }
    }

    async fn query(&self, domain: &str) -> Result<Vec<String>, QueryError> {
        match timeout(self.policy.query_timeout, self.resolver.lookup_txt(domain)).await {
            Ok(res) => res,
            Err(_) => Err(QueryError::TimedOut(self.policy.query_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use trust_dns_resolver::error::ResolveErrorKind;

    /// Answers each lookup by calling `answer` with the 1-based poll number.
    struct FnResolver<F> {
        polls: AtomicU32,
        answer: F,
    }

    impl<F> FnResolver<F>
    where
        F: Fn(u32) -> Result<Vec<String>, QueryError> + Send + Sync,
    {
        fn new(answer: F) -> Self {
            Self {
                polls: AtomicU32::new(0),
                answer,
            }
        }
    }

    #[async_trait::async_trait]
    impl<F> TxtResolver for FnResolver<F>
    where
        F: Fn(u32) -> Result<Vec<String>, QueryError> + Send + Sync,
    {
        async fn lookup_txt(&self, _name: &str) -> Result<Vec<String>, QueryError> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            (self.answer)(poll)
        }
    }

    struct HangingResolver;

    #[async_trait::async_trait]
    impl TxtResolver for HangingResolver {
        async fn lookup_txt(&self, _name: &str) -> Result<Vec<String>, QueryError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    fn values(v: &[&str]) -> Result<Vec<String>, QueryError> {
        Ok(v.iter().map(ToString::to_string).collect())
    }

    fn resolve_err(kind: ResolveErrorKind) -> QueryError {
        QueryError::Resolve(kind.into())
    }

    fn policy(poll_ms: u64, max_ms: u64) -> PropagationPolicy {
        PropagationPolicy {
            poll_interval: Duration::from_millis(poll_ms),
            max_wait: Duration::from_millis(max_ms),
            query_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn propagated_iff_value_present_in_any_order() {
        for answer in [
            vec!["abc123"],
            vec!["other", "abc123"],
            vec!["abc123", "other", "third"],
        ] {
            let checker = PropagationChecker::new(
                FnResolver::new(move |_| values(&answer)),
                PropagationPolicy::default(),
            );
            assert!(checker.is_propagated("example.com.", "abc123").await);
        }

        for answer in [vec![], vec!["other"], vec!["abc1234", "ABC123", " abc123"]] {
            let checker = PropagationChecker::new(
                FnResolver::new(move |_| values(&answer)),
                PropagationPolicy::default(),
            );
            assert!(!checker.is_propagated("example.com.", "abc123").await);
        }
    }

    #[tokio::test]
    async fn query_errors_are_not_propagated() {
        let errors: [fn() -> QueryError; 4] = [
            || resolve_err(ResolveErrorKind::Message("NXDOMAIN")),
            || resolve_err(ResolveErrorKind::Message("SERVFAIL")),
            || resolve_err(ResolveErrorKind::Timeout),
            || QueryError::TimedOut(Duration::from_secs(5)),
        ];
        for make_err in errors {
            let checker = PropagationChecker::new(
                FnResolver::new(move |_| Err(make_err())),
                PropagationPolicy::default(),
            );
            assert!(!checker.is_propagated("example.com.", "abc123").await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_is_bounded_by_query_timeout() {
        let checker = PropagationChecker::new(
            HangingResolver,
            PropagationPolicy {
                query_timeout: Duration::from_secs(2),
                ..PropagationPolicy::default()
            },
        );
        let start = Instant::now();
        assert!(!checker.is_propagated("example.com.", "abc123").await);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_success_does_not_sleep() {
        let checker =
            PropagationChecker::new(FnResolver::new(|_| values(&["abc123"])), policy(30_000, 600_000));
        assert_eq!(checker.policy(), &policy(30_000, 600_000));
        let start = Instant::now();
        let state = checker
            .wait_for_propagation("example.com.", "abc123")
            .await
            .unwrap();
        assert_eq!(state.attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let checker = PropagationChecker::new(
            FnResolver::new(|poll| match poll {
                1 => Err(resolve_err(ResolveErrorKind::Message("NXDOMAIN"))),
                2 => values(&["stale"]),
                _ => values(&["stale", "abc123"]),
            }),
            policy(30_000, 600_000),
        );
        let state = checker
            .wait_for_propagation("example.com.", "abc123")
            .await
            .unwrap();
        assert_eq!(state.attempts, 3);
        assert_eq!(state.elapsed, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_below_poll_interval_times_out_after_one_poll() {
        // The record shows up on the second poll, which must never happen.
        let checker = PropagationChecker::new(
            FnResolver::new(|poll| if poll >= 2 { values(&["abc123"]) } else { values(&[]) }),
            policy(1_000, 100),
        );
        let err = checker
            .wait_for_propagation("example.com.", "abc123")
            .await
            .unwrap_err();
        match err {
            Error::PropagationTimeout {
                domain,
                attempts,
                elapsed,
            } => {
                assert_eq!(domain, "example.com.");
                assert_eq!(attempts, 1);
                assert_eq!(elapsed, Duration::from_millis(100));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_every_poll_within_budget() {
        let checker =
            PropagationChecker::new(FnResolver::new(|_| values(&["other"])), policy(10, 100));
        let err = checker
            .wait_for_propagation("example.com.", "abc123")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PropagationTimeout { attempts: 11, elapsed, .. } if elapsed == Duration::from_millis(100)
        ));
    }
}
