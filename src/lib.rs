//! DNS-01 Hook
//!
//! A hook for ACME clients such as [dehydrated] that proves control of a domain with a
//! [RFC-8555][RFC-8555] [DNS-01] challenge.
//!
//! `deploy_challenge` publishes the challenge TXT record through a configurable
//! [publisher][crate::publisher] and then [polls DNS][crate::propagation] until the record is
//! visible, so the certificate authority never validates too early. `clean_challenge` removes
//! the record again.
//!
//! [dehydrated]: https://github.com/dehydrated-io/dehydrated
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod challenge;
pub mod cli;
pub mod config;
pub mod error;
pub mod hook;
pub mod propagation;
pub mod publisher;

pub use challenge::ChallengeRequest;
pub use config::Config;
pub use hook::Hook;
pub use propagation::{PropagationChecker, PropagationPolicy, SystemResolver};
