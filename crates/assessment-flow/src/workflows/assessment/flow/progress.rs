use serde::Serialize;

use super::super::catalog::AssessmentCatalog;
use super::super::domain::{AssessmentTypeId, CategoryId};

/// Step counter that also counts the organization step, unlike category progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepPosition {
    pub step: usize,
    pub total_steps: usize,
}

/// Percentage of scored categories reached, clamped to `[0, 100]`.
///
/// Organization and categories outside the type's sequence report 0.
pub fn progress(
    catalog: &AssessmentCatalog,
    category: &CategoryId,
    assessment_type: &AssessmentTypeId,
) -> u8 {
    let total = catalog.total_count(assessment_type);
    let position = catalog.position_of(category, assessment_type).unwrap_or(0);
    percent(position, total)
}

pub(crate) fn percent(position: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }

    let ratio = (position as f64 / total as f64).min(1.0);
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn step(
    catalog: &AssessmentCatalog,
    category: &CategoryId,
    assessment_type: &AssessmentTypeId,
) -> StepPosition {
    let total = catalog.total_count(assessment_type);
    let step = match catalog.position_of(category, assessment_type) {
        Some(position) => position + 1,
        None => 1,
    };

    StepPosition {
        step,
        total_steps: total + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::assessment::catalog::{AssessmentTypeDefinition, CatalogDocument};
    use crate::workflows::assessment::domain::Category;

    fn quick_catalog() -> AssessmentCatalog {
        let category = |id: &str| Category {
            id: CategoryId::new(id),
            title: id.to_uppercase(),
            description: String::new(),
            ends_assessment: false,
        };

        AssessmentCatalog::from_document(CatalogDocument {
            default_type: AssessmentTypeId::new("quick"),
            categories: vec![category("c1"), category("c2"), category("c3")],
            questions: Vec::new(),
            assessment_types: vec![AssessmentTypeDefinition {
                id: AssessmentTypeId::new("quick"),
                title: "Quick".to_string(),
                categories: vec![CategoryId::new("c1"), CategoryId::new("c3")],
            }],
        })
        .expect("catalog builds")
    }

    #[test]
    fn quick_type_reaches_full_progress_on_last_category() {
        let catalog = quick_catalog();
        let quick = AssessmentTypeId::new("quick");

        assert_eq!(catalog.position_of(&CategoryId::new("c3"), &quick), Some(2));
        assert_eq!(catalog.total_count(&quick), 2);
        assert_eq!(progress(&catalog, &CategoryId::new("c1"), &quick), 50);
        assert_eq!(progress(&catalog, &CategoryId::new("c3"), &quick), 100);
    }

    #[test]
    fn organization_reports_zero_progress_but_first_step() {
        let catalog = quick_catalog();
        let quick = AssessmentTypeId::new("quick");

        assert_eq!(progress(&catalog, &CategoryId::organization(), &quick), 0);
        assert_eq!(
            step(&catalog, &CategoryId::organization(), &quick),
            StepPosition {
                step: 1,
                total_steps: 3
            }
        );
        assert_eq!(
            step(&catalog, &CategoryId::new("c3"), &quick),
            StepPosition {
                step: 3,
                total_steps: 3
            }
        );
    }

    #[test]
    fn percent_is_clamped_and_rounded() {
        assert_eq!(percent(5, 3), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn progress_is_non_decreasing_along_sequence() {
        let catalog = AssessmentCatalog::standard();
        let comprehensive = AssessmentTypeId::new("comprehensive");

        let values: Vec<u8> = catalog
            .categories_for(&comprehensive)
            .iter()
            .map(|category| progress(&catalog, category, &comprehensive))
            .collect();

        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(values.iter().all(|value| *value <= 100));
        assert_eq!(values.last().copied(), Some(100));
    }
}
