//! Response persistence abstraction
//!
//! The engine hands every signed response to a repository after the fact;
//! the repository assigns the persistence identifier. Implementations are
//! external collaborators; the in-memory variant exists for tests and
//! single-process deployments.

use std::sync::Mutex;

use tsa_types::TimeStampResponseData;

use crate::error::{Error, Result};

/// Stores issued responses and assigns their identifiers
pub trait ResponseRepository: Send + Sync {
    /// Persist a response, returning it with the identifier filled in
    fn save(&self, response: TimeStampResponseData) -> Result<TimeStampResponseData>;

    /// Look up a previously saved response
    fn find_by_id(&self, id: i64) -> Result<Option<TimeStampResponseData>>;
}

/// Repository keeping responses in process memory
#[derive(Debug, Default)]
pub struct InMemoryResponseRepository {
    responses: Mutex<Vec<TimeStampResponseData>>,
}

impl InMemoryResponseRepository {
    /// An empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored responses
    pub fn len(&self) -> usize {
        self.responses.lock().map(|responses| responses.len()).unwrap_or(0)
    }

    /// Whether the repository is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseRepository for InMemoryResponseRepository {
    fn save(&self, response: TimeStampResponseData) -> Result<TimeStampResponseData> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| Error::Repository("repository lock poisoned".to_string()))?;

        let id = responses.len() as i64 + 1;
        let saved = response.with_id(id);
        responses.push(saved.clone());
        Ok(saved)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<TimeStampResponseData>> {
        let responses = self
            .responses
            .lock()
            .map_err(|_| Error::Repository("repository lock poisoned".to_string()))?;

        Ok(responses
            .iter()
            .find(|response| response.id == Some(id))
            .cloned())
    }
}
