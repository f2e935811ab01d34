use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use super::domain::{AnswerMap, CategoryId, PersistedResponse, QuestionId};

/// Scoped key-value persistence collaborator. Writes are total overwrites.
pub trait FormDataStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn save(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("form store unavailable: {0}")]
    Unavailable(String),
    #[error("form store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("form store payload invalid: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Process-local store used by tests and the default server profile.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFormStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryFormStore {
    pub fn keys(&self) -> Vec<String> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl FormDataStore for InMemoryFormStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.remove(key);
        Ok(())
    }
}

/// One pretty-printed JSON document per key under `root`.
#[derive(Debug, Clone)]
pub struct JsonFileFormStore {
    root: PathBuf,
}

impl JsonFileFormStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl FormDataStore for JsonFileFormStore {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&contents)?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, serde_json::to_vec_pretty(&value)?)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Owner of the persisted cross-category answer record.
///
/// The record is held in memory and written through to storage on every save,
/// so a failing store never costs answers already given. Storage stays dumb;
/// the merge policy lives here.
#[derive(Debug)]
pub struct ResponseMergeStore<S> {
    store: Arc<S>,
    key: String,
    record: Vec<PersistedResponse>,
}

impl<S> Clone for ResponseMergeStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            record: self.record.clone(),
        }
    }
}

impl<S> ResponseMergeStore<S>
where
    S: FormDataStore,
{
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            record: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The in-memory record as of the last load or save.
    pub fn record(&self) -> &[PersistedResponse] {
        &self.record
    }

    /// Refresh the record from storage; failures and malformed payloads yield
    /// an empty record.
    pub fn load(&mut self) -> &[PersistedResponse] {
        self.record = self.read_stored();
        &self.record
    }

    fn read_stored(&self) -> Vec<PersistedResponse> {
        let value = match self.store.load(&self.key) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to load responses; starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_value(value) {
            Ok(responses) => responses,
            Err(err) => {
                warn!(
                    key = %self.key,
                    error = %err,
                    "stored responses are malformed; starting empty"
                );
                Vec::new()
            }
        }
    }

    /// Replace the category's entries in the record with the current answers.
    pub fn merge_category(
        &self,
        category: &CategoryId,
        category_question_ids: &[QuestionId],
        answers: &AnswerMap,
    ) -> Vec<PersistedResponse> {
        let merged = merge_responses(self.record.clone(), category_question_ids, answers);
        debug!(
            key = %self.key,
            category = %category,
            answers = answers.len(),
            total = merged.len(),
            "merged category responses"
        );
        merged
    }

    /// Adopt `responses` as the record and write it through to storage. The
    /// in-memory record is updated even when the write fails.
    pub fn save(&mut self, responses: &[PersistedResponse]) -> Result<(), StoreError> {
        self.record = responses.to_vec();
        let value = serde_json::to_value(&self.record)?;
        self.store.save(&self.key, value)
    }

    /// Drop the record so a new session starts from nothing.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.record.clear();
        self.store.remove(&self.key)
    }

    /// Recorded answers for the given questions, used to re-enter a category.
    pub fn answers_for(&self, question_ids: &[QuestionId]) -> AnswerMap {
        let wanted: HashSet<&QuestionId> = question_ids.iter().collect();
        let mut answers = AnswerMap::new();
        for response in &self.record {
            if wanted.contains(&response.question_id) {
                answers.insert(response.question_id.clone(), response.score);
            }
        }
        answers
    }
}

/// Drop prior entries for the category (and any id being re-answered), then
/// append one entry per current answer.
pub fn merge_responses(
    previous: Vec<PersistedResponse>,
    category_question_ids: &[QuestionId],
    answers: &AnswerMap,
) -> Vec<PersistedResponse> {
    let replaced: HashSet<&QuestionId> = category_question_ids.iter().collect();

    let mut merged: Vec<PersistedResponse> = previous
        .into_iter()
        .filter(|response| {
            !replaced.contains(&response.question_id) && !answers.contains(&response.question_id)
        })
        .collect();

    merged.extend(
        answers
            .iter()
            .map(|(question_id, score)| PersistedResponse::new(question_id.clone(), score)),
    );

    merged
}
