use serde::Serialize;

use super::super::catalog::AssessmentCatalog;
use super::super::domain::{AnswerMap, AssessmentTypeId, CategoryId, DONT_KNOW_SCORE};
use super::completion::is_complete;
use super::guidance::GuidancePolicy;
use super::progress::{percent, step};

/// Derived view of where the respondent is. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowState {
    pub category_id: CategoryId,
    /// 1-based among scored categories; 0 for organization.
    pub category_position: usize,
    pub total_categories: usize,
    pub progress_percent: u8,
    pub step: usize,
    pub total_steps: usize,
    pub is_complete: bool,
    pub show_guidance: bool,
}

impl FlowState {
    pub fn derive(
        catalog: &AssessmentCatalog,
        assessment_type: &AssessmentTypeId,
        category: &CategoryId,
        answers: &AnswerMap,
        policy: &GuidancePolicy,
    ) -> Self {
        let questions = catalog.questions_for(category, assessment_type);
        let total_categories = catalog.total_count(assessment_type);
        let category_position = catalog.position_of(category, assessment_type).unwrap_or(0);
        let steps = step(catalog, category, assessment_type);

        let dont_know = questions
            .iter()
            .filter(|question| answers.get(&question.id) == Some(DONT_KNOW_SCORE))
            .count();

        Self {
            category_id: category.clone(),
            category_position,
            total_categories,
            progress_percent: percent(category_position, total_categories),
            step: steps.step,
            total_steps: steps.total_steps,
            is_complete: is_complete(questions.iter().copied(), answers),
            show_guidance: policy.should_show_guidance(dont_know, questions.len()),
        }
    }
}
