use crate::challenge::ChallengeRequest;
use crate::publisher::{record_key, Publisher, PublisherError, Retraction};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Up to two TXT values per lower-cased FQDN, newest first.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecords {
    txt_records: HashMap<String, VecDeque<String>>,
}

impl TxtRecords {
    pub fn add(&mut self, key: String, value: String) {
        let e = self.txt_records.entry(key).or_default();
        e.retain(|existing| *existing != value);
        e.insert(0, value);
        e.truncate(2);
    }

    pub fn remove(&mut self, key: &str, value: &str) -> Retraction {
        let Some(values) = self.txt_records.get_mut(key) else {
            return Retraction::NotFound;
        };
        let before = values.len();
        values.retain(|existing| existing != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.txt_records.remove(key);
        }
        if removed {
            Retraction::Removed
        } else {
            Retraction::NotFound
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> VecDeque<String> {
        self.txt_records
            .get(key)
            .map_or(VecDeque::default(), Clone::clone)
    }
}

/// A [`Publisher`] that only records what it was asked to do. Not durable.
#[derive(Default, Debug)]
pub struct InMemoryPublisher {
    records: RwLock<TxtRecords>,
}

impl InMemoryPublisher {
    /// Get the TXT values currently published for the given name (if any).
    pub async fn get_txt(&self, domain: &str) -> VecDeque<String> {
        let key = domain.trim_end_matches('.').to_ascii_lowercase() + ".";
        self.records.read().await.get(&key)
    }
}

#[async_trait::async_trait]
impl Publisher for InMemoryPublisher {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, request: &ChallengeRequest) -> Result<(), PublisherError> {
        self.records
            .write()
            .await
            .add(record_key(request), request.token().to_string());
        Ok(())
    }

    async fn retract(&self, request: &ChallengeRequest) -> Result<Retraction, PublisherError> {
        Ok(self
            .records
            .write()
            .await
            .remove(&record_key(request), request.token()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(domain: &str, token: &str) -> ChallengeRequest {
        ChallengeRequest::new(domain, token).unwrap()
    }

    #[tokio::test]
    async fn keeps_two_newest_values() {
        let publisher = InMemoryPublisher::default();
        for token in ["one", "two", "three"] {
            publisher
                .publish(&request("Example.COM", token))
                .await
                .unwrap();
        }
        assert_eq!(publisher.get_txt("example.com").await, ["three", "two"]);
    }

    #[tokio::test]
    async fn republishing_does_not_duplicate() {
        let publisher = InMemoryPublisher::default();
        let req = request("example.com", "abc123");
        publisher.publish(&req).await.unwrap();
        publisher.publish(&req).await.unwrap();
        assert_eq!(publisher.get_txt("example.com.").await, ["abc123"]);
    }

    #[tokio::test]
    async fn retract_is_idempotent() {
        let publisher = InMemoryPublisher::default();
        let req = request("example.com", "abc123");
        publisher.publish(&request("example.com", "other")).await.unwrap();
        publisher.publish(&req).await.unwrap();

        assert_eq!(publisher.retract(&req).await.unwrap(), Retraction::Removed);
        assert_eq!(publisher.retract(&req).await.unwrap(), Retraction::NotFound);
        assert_eq!(publisher.get_txt("example.com").await, ["other"]);
    }

    #[tokio::test]
    async fn retract_unknown_domain_is_not_found() {
        let publisher = InMemoryPublisher::default();
        assert_eq!(
            publisher
                .retract(&request("nothing.example.com", "abc123"))
                .await
                .unwrap(),
            Retraction::NotFound
        );
    }
}
