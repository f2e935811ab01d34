use super::super::domain::{AnswerMap, Question, QuestionId};
use super::dependency::dependencies_met;

/// A category form is complete when every question whose dependencies are met
/// has an answer. Questions with unmet dependencies are exempt.
pub fn is_complete<'a, I>(questions: I, answers: &AnswerMap) -> bool
where
    I: IntoIterator<Item = &'a Question>,
{
    questions
        .into_iter()
        .all(|question| !dependencies_met(question, answers) || answers.contains(&question.id))
}

/// Required questions still lacking an answer, in catalog order.
pub fn missing_answers<'a, I>(questions: I, answers: &AnswerMap) -> Vec<QuestionId>
where
    I: IntoIterator<Item = &'a Question>,
{
    questions
        .into_iter()
        .filter(|question| dependencies_met(question, answers))
        .filter(|question| !answers.contains(&question.id))
        .map(|question| question.id.clone())
        .collect()
}
