use crate::error::Error;
use crate::propagation::{QueryError, TxtResolver};
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveError;
use trust_dns_resolver::proto::rr::rdata::TXT;
use trust_dns_resolver::{system_conf, TokioAsyncResolver};

/// [`TxtResolver`] backed by a trust-dns stub resolver.
///
/// Uses the system resolver configuration unless explicit nameservers are given. Caching is
/// disabled so every poll sees a fresh answer.
pub struct SystemResolver {
    resolver: TokioAsyncResolver,
}

impl SystemResolver {
    /// # Errors
    ///
    /// Returns [`Error::Resolver`] if the system resolver configuration can't be read or the
    /// resolver can't be built.
    pub fn new(nameservers: &[IpAddr], query_timeout: Duration) -> Result<Self, Error> {
        let (config, mut opts) = if nameservers.is_empty() {
            system_conf::read_system_conf().map_err(ResolveError::from)?
        } else {
            let group = NameServerConfigGroup::from_ips_clear(nameservers, 53, true);
            (
                ResolverConfig::from_parts(None, vec![], group),
                ResolverOpts::default(),
            )
        };
        opts.timeout = query_timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        let resolver = TokioAsyncResolver::tokio(config, opts)?;
        Ok(Self { resolver })
    }
}

#[async_trait::async_trait]
impl TxtResolver for SystemResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, QueryError> {
        let lookup = self.resolver.txt_lookup(name).await?;
        Ok(txt_strings(lookup.iter()))
    }
}

/// Every character-string of every record, in answer order. Strings of one record are kept
/// apart, not concatenated.
fn txt_strings<'a>(records: impl IntoIterator<Item = &'a TXT>) -> Vec<String> {
    records
        .into_iter()
        .flat_map(TXT::iter)
        .map(|data| String::from_utf8_lossy(data).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_of_all_records_are_flattened_in_order() {
        let records = [
            TXT::new(vec!["other".into(), "abc123".into()]),
            TXT::new(vec!["v=spf1 -all".into()]),
        ];
        assert_eq!(txt_strings(&records), ["other", "abc123", "v=spf1 -all"]);
    }

    #[test]
    fn no_records_is_empty() {
        assert!(txt_strings(std::iter::empty()).is_empty());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let records = [TXT::from_bytes(vec![&b"abc\xff123"[..], &b"abc123"[..]])];
        assert_eq!(txt_strings(&records), ["abc\u{fffd}123", "abc123"]);
    }
}
