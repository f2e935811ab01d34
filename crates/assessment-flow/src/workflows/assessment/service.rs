use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::AssessmentCatalog;
use super::domain::{
    AnswerOption, AssessmentTypeId, PersistedResponse, QuestionId, DONT_KNOW_SCORE,
};
use super::flow::{FlowState, GuidancePolicy};
use super::report::AssessmentReport;
use super::session::{
    AssessmentSession, BlockReason, NavigationIntent, SessionError, SubmissionGateway,
    SubmissionOutcome, SubmissionStatus,
};
use super::store::{FormDataStore, ResponseMergeStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Ids carry the creation instant so a restarted process never reuses the key
/// of a record written by an earlier one.
fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    SessionId(format!("assessment-{stamp}-{id:06}"))
}

/// A visible question with the respondent's current answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<AnswerOption>,
    pub answer: Option<i32>,
    pub dont_know: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub assessment_type: AssessmentTypeId,
    pub category_title: String,
    pub flow: FlowState,
    pub questions: Vec<QuestionView>,
    pub submission: SubmissionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationView {
    pub intent: NavigationIntent,
    pub session: SessionView,
}

/// Holds live sessions and routes requests to them.
pub struct AssessmentService<S, G> {
    catalog: Arc<AssessmentCatalog>,
    store: Arc<S>,
    gateway: Arc<G>,
    policy: GuidancePolicy,
    sessions: Mutex<HashMap<SessionId, AssessmentSession<S>>>,
}

impl<S, G> AssessmentService<S, G>
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    pub fn new(
        catalog: Arc<AssessmentCatalog>,
        store: Arc<S>,
        gateway: Arc<G>,
        policy: GuidancePolicy,
    ) -> Self {
        Self {
            catalog,
            store,
            gateway,
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &AssessmentCatalog {
        &self.catalog
    }

    /// Open a fresh session. `None` selects the catalog default type.
    pub fn start(&self, assessment_type: Option<AssessmentTypeId>) -> SessionView {
        let session_id = self.fresh_session_id();
        let requested = assessment_type.unwrap_or_else(|| self.catalog.default_type().clone());
        let session = AssessmentSession::start(
            Arc::clone(&self.catalog),
            &requested,
            self.merge_store(&session_id),
            self.policy,
        );

        self.insert(session_id, session)
    }

    /// Open a session over an existing record, e.g. one imported from CSV.
    pub fn start_with_responses(
        &self,
        assessment_type: Option<AssessmentTypeId>,
        responses: &[PersistedResponse],
    ) -> Result<SessionView, ServiceError> {
        let session_id = self.fresh_session_id();
        let requested = assessment_type.unwrap_or_else(|| self.catalog.default_type().clone());
        let mut merge_store = self.merge_store(&session_id);
        merge_store.save(responses)?;

        let session = AssessmentSession::resume(
            Arc::clone(&self.catalog),
            &requested,
            merge_store,
            self.policy,
        );
        Ok(self.insert(session_id, session))
    }

    /// Re-open a session from its stored record, e.g. after a restart. A live
    /// session is returned as is.
    pub fn resume(
        &self,
        session_id: &SessionId,
        assessment_type: Option<AssessmentTypeId>,
    ) -> Result<SessionView, ServiceError> {
        if let Some(session) = self.lock().get(session_id) {
            return Ok(session_view(session_id, session));
        }

        if self.store.load(&session_id.0)?.is_none() {
            return Err(ServiceError::UnknownSession(session_id.clone()));
        }

        let requested = assessment_type.unwrap_or_else(|| self.catalog.default_type().clone());
        let session = AssessmentSession::resume(
            Arc::clone(&self.catalog),
            &requested,
            self.merge_store(session_id),
            self.policy,
        );
        Ok(self.insert(session_id.clone(), session))
    }

    pub fn view(&self, session_id: &SessionId) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, |session| Ok(session_view(session_id, session)))
    }

    pub fn answer(
        &self,
        session_id: &SessionId,
        question_id: &QuestionId,
        score: i32,
    ) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, |session| {
            session.answer(question_id, score)?;
            Ok(session_view(session_id, session))
        })
    }

    pub fn clear_answer(
        &self,
        session_id: &SessionId,
        question_id: &QuestionId,
    ) -> Result<SessionView, ServiceError> {
        self.with_session(session_id, |session| {
            session.clear_answer(question_id)?;
            Ok(session_view(session_id, session))
        })
    }

    pub fn advance(&self, session_id: &SessionId) -> Result<NavigationView, ServiceError> {
        self.with_session(session_id, |session| {
            let intent = session.advance();
            Ok(NavigationView {
                intent,
                session: session_view(session_id, session),
            })
        })
    }

    pub fn back(&self, session_id: &SessionId) -> Result<NavigationView, ServiceError> {
        self.with_session(session_id, |session| {
            let intent = match session.back() {
                Some(destination) => NavigationIntent::Advance { destination },
                None => NavigationIntent::Blocked {
                    reason: BlockReason::AtFirstCategory,
                },
            };
            Ok(NavigationView {
                intent,
                session: session_view(session_id, session),
            })
        })
    }

    /// Deliver the merged record. The session map is unlocked while the gateway
    /// runs; the pending status keeps repeat submits out.
    pub fn submit(&self, session_id: &SessionId) -> Result<SubmissionOutcome, ServiceError> {
        let submission = self.with_session(session_id, |session| {
            session.begin_submission().map_err(ServiceError::Blocked)
        })?;

        let result = self.gateway.submit(&submission);

        self.with_session(session_id, |session| {
            Ok(session.finish_submission(&submission, result))
        })
    }

    pub fn report(&self, session_id: &SessionId) -> Result<AssessmentReport, ServiceError> {
        self.with_session(session_id, |session| Ok(session.report()))
    }

    /// Drop the in-memory session; the persisted record is left in place.
    pub fn close(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        self.lock()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::UnknownSession(session_id.clone()))
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Draw ids until one has no stored record, so starting never resets
    /// someone else's answers.
    fn fresh_session_id(&self) -> SessionId {
        loop {
            let session_id = next_session_id();
            match self.store.load(&session_id.0) {
                Ok(Some(_)) => {
                    warn!(session = %session_id, "session id already has a stored record")
                }
                Ok(None) | Err(_) => return session_id,
            }
        }
    }

    fn merge_store(&self, session_id: &SessionId) -> ResponseMergeStore<S> {
        ResponseMergeStore::new(Arc::clone(&self.store), session_id.0.clone())
    }

    fn insert(&self, session_id: SessionId, session: AssessmentSession<S>) -> SessionView {
        let view = session_view(&session_id, &session);
        info!(session = %session_id, assessment_type = %view.assessment_type, "session opened");
        self.lock().insert(session_id, session);
        view
    }

    fn with_session<T>(
        &self,
        session_id: &SessionId,
        action: impl FnOnce(&mut AssessmentSession<S>) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ServiceError::UnknownSession(session_id.clone()))?;
        action(session)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, AssessmentSession<S>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn session_view<S: FormDataStore>(
    session_id: &SessionId,
    session: &AssessmentSession<S>,
) -> SessionView {
    let answers = session.answers();
    let questions = session
        .visible_questions()
        .into_iter()
        .map(|question| {
            let answer = answers.get(&question.id);
            QuestionView {
                id: question.id.clone(),
                text: question.text.clone(),
                options: question.options.clone(),
                answer,
                dont_know: answer == Some(DONT_KNOW_SCORE),
            }
        })
        .collect();

    let category_title = session
        .catalog()
        .category(session.current_category())
        .map(|category| category.title.clone())
        .unwrap_or_else(|| session.current_category().to_string());

    SessionView {
        session_id: session_id.clone(),
        assessment_type: session.assessment_type().clone(),
        category_title,
        flow: session.flow_state(),
        questions,
        submission: session.submission_status(),
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("assessment session {0} not found")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{}", .0.summary())]
    Blocked(BlockReason),
    #[error(transparent)]
    Store(#[from] StoreError),
}
