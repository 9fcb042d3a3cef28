//! A JSON file-backed implementation of the [`Publisher`][super::Publisher] trait.
//!
//! Keeps the same [`TxtRecords`] state as [`InMemoryPublisher`][super::memory::InMemoryPublisher],
//! rewriting a JSON file on disk after every change so a locally run authoritative server can
//! serve it.
use crate::challenge::ChallengeRequest;
use crate::publisher::memory::TxtRecords;
use crate::publisher::{record_key, Publisher, PublisherError, Retraction};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// A file-backed publisher. After each update the JSON file on disk is rewritten with the new
/// state. A missing file is created empty on load.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct FilePublisher {
    records: RwLock<TxtRecords>,
    path: PathBuf,
}

impl FilePublisher {
    /// Load the records kept at `p`, creating an empty state file there if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidJSON`] if the state file doesn't hold [`TxtRecords`],
    /// or [`PublisherError::IO`] if it can't be read or created.
    pub async fn try_from_file(p: impl AsRef<Path>) -> Result<Self, PublisherError> {
        let path = p.as_ref().to_path_buf();
        let records = match fs::read(&path).await {
            Ok(contents) => serde_json::from_slice(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let records = TxtRecords::default();
                write_records(&path, &records).await?;
                records
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            records: RwLock::new(records),
            path,
        })
    }
}

async fn write_records(path: &Path, records: &TxtRecords) -> Result<(), PublisherError> {
    fs::write(path, serde_json::to_vec_pretty(records)?).await?;
    Ok(())
}

#[async_trait::async_trait]
impl Publisher for FilePublisher {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn publish(&self, request: &ChallengeRequest) -> Result<(), PublisherError> {
        let mut records = self.records.write().await;
        records.add(record_key(request), request.token().to_string());
        write_records(&self.path, &records).await
    }

    async fn retract(&self, request: &ChallengeRequest) -> Result<Retraction, PublisherError> {
        let mut records = self.records.write().await;
        let outcome = records.remove(&record_key(request), request.token());
        if outcome == Retraction::Removed {
            write_records(&self.path, &records).await?;
        }
        Ok(outcome)
    }
}
