use super::super::domain::{AnswerMap, Dependency, Question};

/// A missing referenced answer never satisfies a dependency.
pub fn is_satisfied(dependency: &Dependency, answers: &AnswerMap) -> bool {
    match answers.get(&dependency.question_id) {
        Some(score) => dependency.bounds.iter().all(|bound| bound.holds(score)),
        None => false,
    }
}

/// AND across the whole list; an empty list is vacuously met.
pub fn dependencies_met(question: &Question, answers: &AnswerMap) -> bool {
    question
        .dependencies
        .iter()
        .all(|dependency| is_satisfied(dependency, answers))
}

/// Filter a category's questions down to the visible ones.
///
/// Always recomputed from the catalog-ordered input so question numbering stays
/// stable while unrelated answers change.
pub fn visible_questions<'a, I>(questions: I, answers: &AnswerMap) -> Vec<&'a Question>
where
    I: IntoIterator<Item = &'a Question>,
{
    questions
        .into_iter()
        .filter(|question| dependencies_met(question, answers))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::assessment::domain::{CategoryId, QuestionId, DONT_KNOW_SCORE};

    fn question(id: &str, dependencies: Vec<Dependency>) -> Question {
        Question {
            id: QuestionId::new(id),
            category: CategoryId::new("c1"),
            text: id.to_string(),
            options: Vec::new(),
            dependencies,
            assessment_types: Vec::new(),
        }
    }

    fn ids(questions: &[&Question]) -> Vec<String> {
        questions.iter().map(|q| q.id.0.clone()).collect()
    }

    #[test]
    fn min_value_dependency_toggles_visibility() {
        let q2 = question("q2", vec![Dependency::on("q1").at_least(3)]);

        let below: AnswerMap = [("q1", 2)].into_iter().collect();
        let at: AnswerMap = [("q1", 3)].into_iter().collect();

        assert!(!dependencies_met(&q2, &below));
        assert!(dependencies_met(&q2, &at));
    }

    #[test]
    fn unresolved_reference_is_not_satisfied() {
        let dependency = Dependency::on("q1");

        assert!(!is_satisfied(&dependency, &AnswerMap::new()));
        assert!(is_satisfied(
            &dependency,
            &[("q1", DONT_KNOW_SCORE)].into_iter().collect()
        ));
    }

    #[test]
    fn bounds_on_one_dependency_are_anded() {
        let dependency = Dependency::on("q1").at_least(2).at_most(4);

        for (score, expected) in [(1, false), (2, true), (4, true), (5, false)] {
            let answers: AnswerMap = [("q1", score)].into_iter().collect();
            assert_eq!(is_satisfied(&dependency, &answers), expected, "score {score}");
        }
    }

    #[test]
    fn specific_value_requires_exact_match() {
        let dependency = Dependency::on("q1").equals(0);

        assert!(is_satisfied(&dependency, &[("q1", 0)].into_iter().collect()));
        assert!(!is_satisfied(&dependency, &[("q1", 1)].into_iter().collect()));
    }

    #[test]
    fn dependency_list_is_anded() {
        let q3 = question(
            "q3",
            vec![Dependency::on("q1").at_least(3), Dependency::on("q2").equals(1)],
        );

        let one_met: AnswerMap = [("q1", 4), ("q2", 2)].into_iter().collect();
        let both_met: AnswerMap = [("q1", 4), ("q2", 1)].into_iter().collect();

        assert!(!dependencies_met(&q3, &one_met));
        assert!(dependencies_met(&q3, &both_met));
    }

    #[test]
    fn visibility_is_monotonic_above_minimum() {
        let q2 = question("q2", vec![Dependency::on("q1").at_least(3)]);

        let visible: Vec<bool> = (3..=10)
            .map(|score| dependencies_met(&q2, &[("q1", score)].into_iter().collect()))
            .collect();

        assert!(visible.into_iter().all(|flag| flag));
    }

    #[test]
    fn visible_set_preserves_order_and_ignores_unrelated_answers() {
        let catalog = vec![
            question("q1", Vec::new()),
            question("q2", vec![Dependency::on("q1").at_least(3)]),
            question("q3", Vec::new()),
            question("q4", Vec::new()),
        ];

        let mut answers: AnswerMap = [("q1", 4)].into_iter().collect();
        let first = ids(&visible_questions(&catalog, &answers));

        answers.insert(QuestionId::new("q4"), 2);
        answers.insert(QuestionId::new("q3"), DONT_KNOW_SCORE);
        let second = ids(&visible_questions(&catalog, &answers));

        assert_eq!(first, vec!["q1", "q2", "q3", "q4"]);
        assert_eq!(first, second);
    }

    #[test]
    fn hidden_question_reappears_in_original_position() {
        let catalog = vec![
            question("q1", Vec::new()),
            question("q2", vec![Dependency::on("q1").at_least(3)]),
            question("q3", Vec::new()),
        ];

        let mut answers: AnswerMap = [("q1", 1)].into_iter().collect();
        assert_eq!(ids(&visible_questions(&catalog, &answers)), vec!["q1", "q3"]);

        answers.insert(QuestionId::new("q1"), 5);
        assert_eq!(
            ids(&visible_questions(&catalog, &answers)),
            vec!["q1", "q2", "q3"]
        );
    }
}
