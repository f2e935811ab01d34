use serde::Serialize;
use tracing::{debug, warn};

use super::super::catalog::AssessmentCatalog;
use super::super::domain::{AssessmentTypeId, CategoryId};

/// Result of moving forward from a category.
///
/// `Submit` is the terminal signal and is distinct from "no destination",
/// which [`FlowNavigator::next`] reports as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextStep {
    Advance { destination: CategoryId },
    Submit,
}

/// Category-to-category navigation over a type's fixed sequence.
///
/// Categories with no questions for the type are skipped in both directions,
/// the organization step included.
#[derive(Debug, Clone, Copy)]
pub struct FlowNavigator<'a> {
    catalog: &'a AssessmentCatalog,
}

impl<'a> FlowNavigator<'a> {
    pub fn new(catalog: &'a AssessmentCatalog) -> Self {
        Self { catalog }
    }

    /// Entry point: organization, or the first category with questions when
    /// organization has none for the type.
    pub fn first(&self, assessment_type: &AssessmentTypeId) -> CategoryId {
        let organization = CategoryId::organization();
        if self.has_questions(&organization, assessment_type) {
            return organization;
        }

        self.catalog
            .categories_for(assessment_type)
            .into_iter()
            .find(|candidate| self.has_questions(candidate, assessment_type))
            .unwrap_or(organization)
    }

    pub fn next(
        &self,
        current: &CategoryId,
        assessment_type: &AssessmentTypeId,
    ) -> Option<NextStep> {
        let sequence = self.catalog.categories_for(assessment_type);
        let index = self.index_of(&sequence, current, assessment_type)?;

        if self.ends_assessment(current) {
            return Some(NextStep::Submit);
        }

        for candidate in &sequence[index + 1..] {
            if self.has_questions(candidate, assessment_type) {
                return Some(NextStep::Advance {
                    destination: candidate.clone(),
                });
            }

            debug!(
                category = %candidate,
                assessment_type = %assessment_type,
                "skipping category without applicable questions"
            );

            if self.ends_assessment(candidate) {
                return Some(NextStep::Submit);
            }
        }

        Some(NextStep::Submit)
    }

    pub fn previous(
        &self,
        current: &CategoryId,
        assessment_type: &AssessmentTypeId,
    ) -> Option<CategoryId> {
        let sequence = self.catalog.categories_for(assessment_type);
        let index = self.index_of(&sequence, current, assessment_type)?;

        sequence[..index]
            .iter()
            .rev()
            .find(|candidate| {
                let keep = self.has_questions(candidate, assessment_type);
                if !keep {
                    debug!(
                        category = %candidate,
                        assessment_type = %assessment_type,
                        "skipping category without applicable questions"
                    );
                }
                keep
            })
            .cloned()
    }

    fn index_of(
        &self,
        sequence: &[CategoryId],
        current: &CategoryId,
        assessment_type: &AssessmentTypeId,
    ) -> Option<usize> {
        let index = sequence.iter().position(|candidate| candidate == current);
        if index.is_none() {
            warn!(
                category = %current,
                assessment_type = %assessment_type,
                "category is not part of the assessment sequence"
            );
        }
        index
    }

    fn has_questions(&self, category: &CategoryId, assessment_type: &AssessmentTypeId) -> bool {
        !self
            .catalog
            .questions_for(category, assessment_type)
            .is_empty()
    }

    fn ends_assessment(&self, category: &CategoryId) -> bool {
        self.catalog
            .category(category)
            .map(|category| category.ends_assessment)
            .unwrap_or(false)
    }
}
