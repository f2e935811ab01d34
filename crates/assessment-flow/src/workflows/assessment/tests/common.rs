use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::workflows::assessment::store::{FormDataStore, StoreError};
use crate::workflows::assessment::{
    assessment_router, AssessmentCatalog, AssessmentService, AssessmentSession,
    AssessmentSubmission, AssessmentTypeId, GuidancePolicy, InMemoryFormStore, Question,
    QuestionId, ResponseMergeStore, SubmissionError, SubmissionGateway,
};

#[derive(Debug, Default, Clone)]
pub(super) struct RecordingGateway {
    submissions: Arc<Mutex<Vec<AssessmentSubmission>>>,
}

impl RecordingGateway {
    pub(super) fn submissions(&self) -> Vec<AssessmentSubmission> {
        self.submissions.lock().expect("gateway mutex poisoned").clone()
    }
}

impl SubmissionGateway for RecordingGateway {
    fn submit(&self, submission: &AssessmentSubmission) -> Result<(), SubmissionError> {
        self.submissions
            .lock()
            .expect("gateway mutex poisoned")
            .push(submission.clone());
        Ok(())
    }
}

pub(super) struct UnreachableGateway;

impl SubmissionGateway for UnreachableGateway {
    fn submit(&self, _submission: &AssessmentSubmission) -> Result<(), SubmissionError> {
        Err(SubmissionError::Transport("connection refused".to_string()))
    }
}

/// Store that fails every call, standing in for an offline backend.
pub(super) struct OfflineStore;

impl FormDataStore for OfflineStore {
    fn load(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn save(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
}

pub(super) fn catalog() -> Arc<AssessmentCatalog> {
    Arc::new(AssessmentCatalog::standard())
}

pub(super) fn assessment_type(id: &str) -> AssessmentTypeId {
    AssessmentTypeId::new(id)
}

pub(super) fn session_with_store<S: FormDataStore>(
    store: Arc<S>,
    assessment_type_id: &str,
) -> AssessmentSession<S> {
    AssessmentSession::start(
        catalog(),
        &assessment_type(assessment_type_id),
        ResponseMergeStore::new(store, "session-under-test"),
        GuidancePolicy::default(),
    )
}

pub(super) fn session(
    assessment_type_id: &str,
) -> (AssessmentSession<InMemoryFormStore>, Arc<InMemoryFormStore>) {
    let store = Arc::new(InMemoryFormStore::default());
    (session_with_store(Arc::clone(&store), assessment_type_id), store)
}

fn pick_score(question: &Question, preferred: i32) -> i32 {
    if question.accepts(preferred) {
        preferred
    } else {
        question
            .options
            .first()
            .map(|option| option.value)
            .unwrap_or(preferred)
    }
}

/// Answer every visible question, including ones revealed along the way.
pub(super) fn complete_category<S: FormDataStore>(
    session: &mut AssessmentSession<S>,
    preferred: i32,
) {
    loop {
        let pending: Vec<(QuestionId, i32)> = session
            .visible_questions()
            .into_iter()
            .filter(|question| !session.answers().contains(&question.id))
            .map(|question| (question.id.clone(), pick_score(question, preferred)))
            .collect();

        if pending.is_empty() {
            break;
        }

        for (question_id, score) in pending {
            session.answer(&question_id, score).expect("answer accepted");
        }
    }
}

pub(super) fn build_service() -> (
    Arc<AssessmentService<InMemoryFormStore, RecordingGateway>>,
    Arc<InMemoryFormStore>,
    RecordingGateway,
) {
    let store = Arc::new(InMemoryFormStore::default());
    let gateway = RecordingGateway::default();
    let service = Arc::new(AssessmentService::new(
        catalog(),
        Arc::clone(&store),
        Arc::new(gateway.clone()),
        GuidancePolicy::default(),
    ));
    (service, store, gateway)
}

pub(super) fn router_with_service(
    service: Arc<AssessmentService<InMemoryFormStore, RecordingGateway>>,
) -> axum::Router {
    assessment_router(service)
}

pub(super) fn question(id: &str) -> QuestionId {
    QuestionId::new(id)
}
