use chrono::{DateTime, Utc};
use serde::Serialize;

use super::catalog::AssessmentCatalog;
use super::domain::{AnswerMap, AssessmentTypeId, CategoryId, PersistedResponse, DONT_KNOW_SCORE};
use super::flow::{visible_questions, GuidancePolicy};

/// Per-category roll-up of the persisted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub category_id: CategoryId,
    pub title: String,
    pub position: usize,
    pub visible_questions: usize,
    pub answered: usize,
    pub dont_know: usize,
    /// Mean over known answers; `None` when every answer is "don't know".
    pub mean_score: Option<f64>,
    pub show_guidance: bool,
}

impl CategoryReport {
    pub fn is_complete(&self) -> bool {
        self.answered == self.visible_questions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentReport {
    pub assessment_type: AssessmentTypeId,
    pub generated_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
    pub total_answered: usize,
    pub total_dont_know: usize,
    pub overall_mean: Option<f64>,
}

impl AssessmentReport {
    pub fn build(
        catalog: &AssessmentCatalog,
        assessment_type: &AssessmentTypeId,
        responses: &[PersistedResponse],
        policy: &GuidancePolicy,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let answers: AnswerMap = responses
            .iter()
            .map(|response| (response.question_id.0.clone(), response.score))
            .collect();

        let mut known_scores = Vec::new();
        let categories: Vec<CategoryReport> = catalog
            .scored_categories(assessment_type)
            .iter()
            .enumerate()
            .map(|(index, category_id)| {
                let questions = catalog.questions_for(category_id, assessment_type);
                let visible = visible_questions(questions, &answers);

                let scores: Vec<i32> = visible
                    .iter()
                    .filter_map(|question| answers.get(&question.id))
                    .collect();
                let dont_know = scores
                    .iter()
                    .filter(|score| **score == DONT_KNOW_SCORE)
                    .count();
                let known: Vec<i32> = scores
                    .iter()
                    .copied()
                    .filter(|score| *score != DONT_KNOW_SCORE)
                    .collect();
                known_scores.extend_from_slice(&known);

                CategoryReport {
                    category_id: category_id.clone(),
                    title: catalog
                        .category(category_id)
                        .map(|category| category.title.clone())
                        .unwrap_or_else(|| category_id.to_string()),
                    position: index + 1,
                    visible_questions: visible.len(),
                    answered: scores.len(),
                    dont_know,
                    mean_score: mean(&known),
                    show_guidance: policy.should_show_guidance(dont_know, visible.len()),
                }
            })
            .collect();

        Self {
            assessment_type: assessment_type.clone(),
            generated_at,
            total_answered: categories.iter().map(|category| category.answered).sum(),
            total_dont_know: categories.iter().map(|category| category.dont_know).sum(),
            overall_mean: mean(&known_scores),
            categories,
        }
    }

    /// Categories where the respondent flagged enough knowledge gaps.
    pub fn guidance_categories(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories
            .iter()
            .filter(|category| category.show_guidance)
    }

    /// Plain-text rendering used by the CLI.
    pub fn render_text(&self) -> String {
        let mut lines = vec![format!(
            "Assessment report ({}) generated {}",
            self.assessment_type,
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        )];

        for category in &self.categories {
            let mean = category
                .mean_score
                .map(|value| format!("{value:.2}"))
                .unwrap_or_else(|| "n/a".to_string());
            let guidance = if category.show_guidance {
                " [guidance]"
            } else {
                ""
            };
            lines.push(format!(
                "{:>2}. {:<20} answered {}/{} dont-know {} mean {}{}",
                category.position,
                category.title,
                category.answered,
                category.visible_questions,
                category.dont_know,
                mean,
                guidance
            ));
        }

        let overall = self
            .overall_mean
            .map(|value| format!("{value:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "Overall: {} answered, {} dont-know, mean {}",
            self.total_answered, self.total_dont_know, overall
        ));
        lines.join("\n")
    }
}

fn mean(scores: &[i32]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: i64 = scores.iter().map(|score| i64::from(*score)).sum();
    Some(total as f64 / scores.len() as f64)
}
