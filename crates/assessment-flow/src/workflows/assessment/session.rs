use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::catalog::AssessmentCatalog;
use super::domain::{
    AnswerMap, AssessmentTypeId, CategoryId, PersistedResponse, Question, QuestionId,
};
use super::flow::{
    missing_answers, visible_questions, FlowNavigator, FlowState, GuidancePolicy, NextStep,
};
use super::report::AssessmentReport;
use super::store::{merge_responses, FormDataStore, ResponseMergeStore};

/// Outbound hook receiving the fully merged record on final submission.
pub trait SubmissionGateway: Send + Sync {
    fn submit(&self, submission: &AssessmentSubmission) -> Result<(), SubmissionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission transport unavailable: {0}")]
    Transport(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
}

/// Payload handed to the [`SubmissionGateway`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSubmission {
    pub assessment_type: AssessmentTypeId,
    pub responses: Vec<PersistedResponse>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    NotSubmitted,
    Pending,
    Delivered,
    DeliveryFailed,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotSubmitted => "Not Submitted",
            Self::Pending => "Pending",
            Self::Delivered => "Delivered",
            Self::DeliveryFailed => "Delivery Failed",
        }
    }

    /// Delivery failures still finish the flow; only the server copy is missing.
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Delivered | Self::DeliveryFailed)
    }
}

/// Why a navigation or submit request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    IncompleteForm { missing: Vec<QuestionId> },
    NotFinalCategory,
    SubmissionPending,
    AlreadySubmitted,
    AtFirstCategory,
    OutOfSequence,
}

impl BlockReason {
    pub fn summary(&self) -> String {
        match self {
            BlockReason::IncompleteForm { missing } => {
                format!("{} required question(s) unanswered", missing.len())
            }
            BlockReason::NotFinalCategory => {
                "submission is only available on the final category".to_string()
            }
            BlockReason::SubmissionPending => "a submission is already in progress".to_string(),
            BlockReason::AlreadySubmitted => "the assessment was already submitted".to_string(),
            BlockReason::AtFirstCategory => "already at the first category".to_string(),
            BlockReason::OutOfSequence => {
                "the current category is not part of the assessment".to_string()
            }
        }
    }
}

/// Navigation intent exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationIntent {
    Advance { destination: CategoryId },
    Submit,
    Blocked { reason: BlockReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub response_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("question {0} is not in the catalog")]
    UnknownQuestion(QuestionId),
    #[error("question {question} does not belong to the current category {category}")]
    QuestionOutsideCategory {
        question: QuestionId,
        category: CategoryId,
    },
    #[error("question {question} does not apply to assessment type {assessment_type}")]
    NotApplicable {
        question: QuestionId,
        assessment_type: AssessmentTypeId,
    },
    #[error("score {score} is not a valid option for question {question}")]
    InvalidScore { question: QuestionId, score: i32 },
    #[error("the assessment was already submitted")]
    AlreadySubmitted,
}

/// One respondent's walk through an assessment.
///
/// The live answer map is scoped to the current category; the cross-category
/// record lives in the [`ResponseMergeStore`], held in memory and written
/// through to storage on every navigation, forward or backward.
pub struct AssessmentSession<S> {
    catalog: Arc<AssessmentCatalog>,
    assessment_type: AssessmentTypeId,
    current: CategoryId,
    answers: AnswerMap,
    responses: ResponseMergeStore<S>,
    policy: GuidancePolicy,
    submission: SubmissionStatus,
}

impl<S> AssessmentSession<S>
where
    S: FormDataStore,
{
    /// Begin a fresh session, discarding any record stored under the same key.
    pub fn start(
        catalog: Arc<AssessmentCatalog>,
        requested_type: &AssessmentTypeId,
        mut responses: ResponseMergeStore<S>,
        policy: GuidancePolicy,
    ) -> Self {
        if let Err(err) = responses.reset() {
            warn!(key = %responses.key(), error = %err, "failed to reset stored responses");
        }

        let session = Self::open(catalog, requested_type, responses, policy);
        info!(
            assessment_type = %session.assessment_type,
            key = %session.responses.key(),
            "assessment session started"
        );
        session
    }

    /// Re-open a session on top of an existing record.
    pub fn resume(
        catalog: Arc<AssessmentCatalog>,
        requested_type: &AssessmentTypeId,
        responses: ResponseMergeStore<S>,
        policy: GuidancePolicy,
    ) -> Self {
        let mut session = Self::open(catalog, requested_type, responses, policy);
        let restored = session.responses.load().len();
        session.enter(session.current.clone());
        info!(
            assessment_type = %session.assessment_type,
            key = %session.responses.key(),
            restored,
            "assessment session resumed"
        );
        session
    }

    fn open(
        catalog: Arc<AssessmentCatalog>,
        requested_type: &AssessmentTypeId,
        responses: ResponseMergeStore<S>,
        policy: GuidancePolicy,
    ) -> Self {
        let assessment_type = catalog.resolve_type(requested_type).id.clone();
        let current = FlowNavigator::new(&catalog).first(&assessment_type);

        Self {
            catalog,
            assessment_type,
            current,
            answers: AnswerMap::new(),
            responses,
            policy,
            submission: SubmissionStatus::NotSubmitted,
        }
    }

    pub fn catalog(&self) -> &AssessmentCatalog {
        &self.catalog
    }

    pub fn assessment_type(&self) -> &AssessmentTypeId {
        &self.assessment_type
    }

    pub fn current_category(&self) -> &CategoryId {
        &self.current
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn policy(&self) -> &GuidancePolicy {
        &self.policy
    }

    pub fn submission_status(&self) -> SubmissionStatus {
        self.submission
    }

    /// Questions of the current category that apply to the session's type.
    pub fn questions(&self) -> Vec<&Question> {
        self.catalog
            .questions_for(&self.current, &self.assessment_type)
    }

    pub fn visible_questions(&self) -> Vec<&Question> {
        visible_questions(self.questions(), &self.answers)
    }

    pub fn flow_state(&self) -> FlowState {
        FlowState::derive(
            &self.catalog,
            &self.assessment_type,
            &self.current,
            &self.answers,
            &self.policy,
        )
    }

    pub fn answer(&mut self, question_id: &QuestionId, score: i32) -> Result<(), SessionError> {
        let question = self.editable_question(question_id)?;
        if !question.accepts(score) {
            return Err(SessionError::InvalidScore {
                question: question_id.clone(),
                score,
            });
        }

        self.answers.insert(question_id.clone(), score);
        Ok(())
    }

    pub fn clear_answer(&mut self, question_id: &QuestionId) -> Result<(), SessionError> {
        self.editable_question(question_id)?;
        self.answers.remove(question_id);
        Ok(())
    }

    fn editable_question(&self, question_id: &QuestionId) -> Result<&Question, SessionError> {
        if self.submission == SubmissionStatus::Delivered {
            return Err(SessionError::AlreadySubmitted);
        }

        let question = self
            .catalog
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;

        if question.category != self.current {
            return Err(SessionError::QuestionOutsideCategory {
                question: question_id.clone(),
                category: self.current.clone(),
            });
        }
        if !question.applies_to(&self.assessment_type) {
            return Err(SessionError::NotApplicable {
                question: question_id.clone(),
                assessment_type: self.assessment_type.clone(),
            });
        }

        Ok(question)
    }

    /// Gate on completeness, persist the category, then move forward.
    pub fn advance(&mut self) -> NavigationIntent {
        if let Some(reason) = self.submission_block() {
            return NavigationIntent::Blocked { reason };
        }

        let missing = missing_answers(self.questions(), &self.answers);
        if !missing.is_empty() {
            return NavigationIntent::Blocked {
                reason: BlockReason::IncompleteForm { missing },
            };
        }

        self.snapshot();

        let navigator = FlowNavigator::new(&self.catalog);
        match navigator.next(&self.current, &self.assessment_type) {
            Some(NextStep::Advance { destination }) => {
                self.enter(destination.clone());
                NavigationIntent::Advance { destination }
            }
            Some(NextStep::Submit) => NavigationIntent::Submit,
            None => NavigationIntent::Blocked {
                reason: BlockReason::OutOfSequence,
            },
        }
    }

    /// Persist the category without gating and step back. `None` at the start.
    pub fn back(&mut self) -> Option<CategoryId> {
        self.snapshot();

        let navigator = FlowNavigator::new(&self.catalog);
        let destination = navigator.previous(&self.current, &self.assessment_type)?;
        self.enter(destination.clone());
        Some(destination)
    }

    /// Validate and mark the session pending. The caller delivers the payload
    /// and reports back through [`AssessmentSession::finish_submission`].
    pub fn begin_submission(&mut self) -> Result<AssessmentSubmission, BlockReason> {
        if let Some(reason) = self.submission_block() {
            return Err(reason);
        }

        let navigator = FlowNavigator::new(&self.catalog);
        if navigator.next(&self.current, &self.assessment_type) != Some(NextStep::Submit) {
            return Err(BlockReason::NotFinalCategory);
        }

        let missing = missing_answers(self.questions(), &self.answers);
        if !missing.is_empty() {
            return Err(BlockReason::IncompleteForm { missing });
        }

        let responses = self.snapshot();
        self.submission = SubmissionStatus::Pending;

        Ok(AssessmentSubmission {
            assessment_type: self.assessment_type.clone(),
            responses,
            submitted_at: Utc::now(),
        })
    }

    /// Record the delivery result. Failure never blocks completion.
    pub fn finish_submission(
        &mut self,
        submission: &AssessmentSubmission,
        result: Result<(), SubmissionError>,
    ) -> SubmissionOutcome {
        let notice = match result {
            Ok(()) => {
                self.submission = SubmissionStatus::Delivered;
                info!(
                    assessment_type = %self.assessment_type,
                    responses = submission.responses.len(),
                    "assessment submitted"
                );
                None
            }
            Err(err) => {
                self.submission = SubmissionStatus::DeliveryFailed;
                warn!(
                    assessment_type = %self.assessment_type,
                    error = %err,
                    "assessment submission failed; responses kept locally"
                );
                Some(format!("could not save to server: {err}"))
            }
        };

        SubmissionOutcome {
            status: self.submission,
            submitted_at: submission.submitted_at,
            response_count: submission.responses.len(),
            notice,
        }
    }

    pub fn submit<G>(&mut self, gateway: &G) -> Result<SubmissionOutcome, BlockReason>
    where
        G: SubmissionGateway + ?Sized,
    {
        let submission = self.begin_submission()?;
        let result = gateway.submit(&submission);
        Ok(self.finish_submission(&submission, result))
    }

    /// Persisted record with the live category folded in, without saving.
    pub fn responses(&self) -> Vec<PersistedResponse> {
        merge_responses(
            self.responses.record().to_vec(),
            &self.catalog.category_question_ids(&self.current),
            &self.answers,
        )
    }

    pub fn report(&self) -> AssessmentReport {
        AssessmentReport::build(
            &self.catalog,
            &self.assessment_type,
            &self.responses(),
            &self.policy,
            Utc::now(),
        )
    }

    fn submission_block(&self) -> Option<BlockReason> {
        match self.submission {
            SubmissionStatus::Pending => Some(BlockReason::SubmissionPending),
            SubmissionStatus::Delivered => Some(BlockReason::AlreadySubmitted),
            SubmissionStatus::NotSubmitted | SubmissionStatus::DeliveryFailed => None,
        }
    }

    fn snapshot(&mut self) -> Vec<PersistedResponse> {
        let merged = self.responses.merge_category(
            &self.current,
            &self.catalog.category_question_ids(&self.current),
            &self.answers,
        );

        if let Err(err) = self.responses.save(&merged) {
            warn!(
                key = %self.responses.key(),
                category = %self.current,
                error = %err,
                "failed to persist category responses"
            );
        }

        merged
    }

    fn enter(&mut self, category: CategoryId) {
        self.answers = self
            .responses
            .answers_for(&self.catalog.category_question_ids(&category));
        self.current = category;
    }
}
