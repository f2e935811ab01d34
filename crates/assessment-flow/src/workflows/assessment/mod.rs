//! Assessment flow and dependency resolution.
//!
//! The catalog fixes which categories and questions apply to each assessment
//! type. The `flow` rules are pure functions over the catalog and a live answer
//! map; `AssessmentSession` drives them and persists each category through the
//! `ResponseMergeStore` as the respondent navigates.

pub mod catalog;
pub mod domain;
pub mod flow;
pub mod report;
pub mod router;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use catalog::{AssessmentCatalog, AssessmentTypeDefinition, CatalogDocument, CatalogError};
pub use domain::{
    AnswerMap, AnswerOption, AssessmentTypeId, Category, CategoryId, Dependency,
    PersistedResponse, Question, QuestionId, ScoreBound, DONT_KNOW_SCORE, ORGANIZATION_CATEGORY,
};
pub use flow::{FlowNavigator, FlowState, GuidancePolicy, NextStep, StepPosition};
pub use report::{AssessmentReport, CategoryReport};
pub use router::assessment_router;
pub use service::{
    AssessmentService, NavigationView, QuestionView, ServiceError, SessionId, SessionView,
};
pub use session::{
    AssessmentSession, AssessmentSubmission, BlockReason, NavigationIntent, SessionError,
    SubmissionError, SubmissionGateway, SubmissionOutcome, SubmissionStatus,
};
pub use store::{
    FormDataStore, InMemoryFormStore, JsonFileFormStore, ResponseMergeStore, StoreError,
};
