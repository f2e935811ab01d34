use assessment_flow::workflows::assessment::{
    AssessmentSubmission, FormDataStore, InMemoryFormStore, JsonFileFormStore, StoreError,
    SubmissionError, SubmissionGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Form store chosen at startup from `ASSESSMENT_STORE_DIR`.
pub(crate) enum FormStoreBackend {
    Memory(InMemoryFormStore),
    File(JsonFileFormStore),
}

impl FormStoreBackend {
    pub(crate) fn from_dir(store_dir: Option<PathBuf>) -> Self {
        match store_dir {
            Some(dir) => Self::File(JsonFileFormStore::new(dir)),
            None => Self::Memory(InMemoryFormStore::default()),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
        }
    }
}

impl FormDataStore for FormStoreBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self {
            Self::Memory(store) => store.load(key),
            Self::File(store) => store.load(key),
        }
    }

    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.save(key, value),
            Self::File(store) => store.save(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.remove(key),
            Self::File(store) => store.remove(key),
        }
    }
}

/// Keeps delivered submissions in memory and logs each one.
#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionGateway {
    submissions: Arc<Mutex<Vec<AssessmentSubmission>>>,
}

impl SubmissionGateway for InMemorySubmissionGateway {
    fn submit(&self, submission: &AssessmentSubmission) -> Result<(), SubmissionError> {
        info!(
            assessment_type = %submission.assessment_type,
            responses = submission.responses.len(),
            "assessment submission received"
        );
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission.clone());
        Ok(())
    }
}

impl InMemorySubmissionGateway {
    pub(crate) fn submissions(&self) -> Vec<AssessmentSubmission> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
