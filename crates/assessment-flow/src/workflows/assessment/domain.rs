use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved score recorded when the respondent answers "I don't know".
pub const DONT_KNOW_SCORE: i32 = -1;

/// Synthetic category prepended to every assessment sequence; never scored.
pub const ORGANIZATION_CATEGORY: &str = "organization";

/// Identifier wrapper for assessment types ("quick", "targeted", ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentTypeId(pub String);

impl AssessmentTypeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssessmentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for catalog categories.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn organization() -> Self {
        Self(ORGANIZATION_CATEGORY.to_string())
    }

    pub fn is_organization(&self) -> bool {
        self.0 == ORGANIZATION_CATEGORY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for questions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A titled group of related questions; the unit of navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Reaching this category ends the assessment even if the sequence continues.
    #[serde(default)]
    pub ends_assessment: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: i32,
    pub label: String,
}

impl AnswerOption {
    pub fn new(value: i32, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// One constraint on the referenced answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBound {
    AtLeast(i32),
    AtMost(i32),
    Equals(i32),
}

impl ScoreBound {
    pub const fn holds(self, score: i32) -> bool {
        match self {
            Self::AtLeast(min) => score >= min,
            Self::AtMost(max) => score <= max,
            Self::Equals(value) => score == value,
        }
    }
}

/// Visibility precondition on another question's answer.
///
/// Serialized as `{ questionId, minValue?, maxValue?, specificValue? }`; an
/// absent field leaves that axis unconstrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DependencyDocument", into = "DependencyDocument")]
pub struct Dependency {
    pub question_id: QuestionId,
    pub bounds: Vec<ScoreBound>,
}

impl Dependency {
    pub fn on(question_id: impl Into<String>) -> Self {
        Self {
            question_id: QuestionId::new(question_id),
            bounds: Vec::new(),
        }
    }

    pub fn at_least(mut self, min: i32) -> Self {
        self.bounds.push(ScoreBound::AtLeast(min));
        self
    }

    pub fn at_most(mut self, max: i32) -> Self {
        self.bounds.push(ScoreBound::AtMost(max));
        self
    }

    pub fn equals(mut self, value: i32) -> Self {
        self.bounds.push(ScoreBound::Equals(value));
        self
    }

    /// True when two `Equals` bounds name different values, which no answer
    /// can satisfy and the wire shape cannot express.
    pub fn has_conflicting_values(&self) -> bool {
        let mut exact = self.bounds.iter().filter_map(|bound| match bound {
            ScoreBound::Equals(value) => Some(*value),
            ScoreBound::AtLeast(_) | ScoreBound::AtMost(_) => None,
        });
        match exact.next() {
            Some(first) => exact.any(|value| value != first),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyDocument {
    question_id: QuestionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_value: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_value: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    specific_value: Option<i32>,
}

impl From<DependencyDocument> for Dependency {
    fn from(document: DependencyDocument) -> Self {
        let bounds = [
            document.min_value.map(ScoreBound::AtLeast),
            document.max_value.map(ScoreBound::AtMost),
            document.specific_value.map(ScoreBound::Equals),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            question_id: document.question_id,
            bounds,
        }
    }
}

impl From<Dependency> for DependencyDocument {
    fn from(dependency: Dependency) -> Self {
        let mut document = DependencyDocument {
            question_id: dependency.question_id,
            min_value: None,
            max_value: None,
            specific_value: None,
        };

        // Several bounds on one axis collapse to the strictest. Catalogs reject
        // conflicting exact values, so the first one stands.
        for bound in dependency.bounds {
            match bound {
                ScoreBound::AtLeast(min) => {
                    document.min_value = Some(document.min_value.map_or(min, |cur| cur.max(min)));
                }
                ScoreBound::AtMost(max) => {
                    document.max_value = Some(document.max_value.map_or(max, |cur| cur.min(max)));
                }
                ScoreBound::Equals(value) => {
                    document.specific_value.get_or_insert(value);
                }
            }
        }

        document
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub category: CategoryId,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Types this question applies to; empty means every type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assessment_types: Vec<AssessmentTypeId>,
}

impl Question {
    pub fn applies_to(&self, assessment_type: &AssessmentTypeId) -> bool {
        self.assessment_types.is_empty() || self.assessment_types.contains(assessment_type)
    }

    /// Accepts the don't-know sentinel or any configured option value.
    pub fn accepts(&self, score: i32) -> bool {
        score == DONT_KNOW_SCORE
            || self.options.is_empty()
            || self.options.iter().any(|option| option.value == score)
    }
}

/// Live answers keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<QuestionId, i32>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &QuestionId) -> Option<i32> {
        self.0.get(question_id).copied()
    }

    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.0.contains_key(question_id)
    }

    pub fn insert(&mut self, question_id: QuestionId, score: i32) -> Option<i32> {
        self.0.insert(question_id, score)
    }

    pub fn remove(&mut self, question_id: &QuestionId) -> Option<i32> {
        self.0.remove(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, i32)> {
        self.0.iter().map(|(id, score)| (id, *score))
    }

    pub fn dont_know_count(&self) -> usize {
        self.0
            .values()
            .filter(|score| **score == DONT_KNOW_SCORE)
            .count()
    }
}

impl<K: Into<String>> FromIterator<(K, i32)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, i32)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, score)| (QuestionId::new(id), score))
                .collect(),
        )
    }
}

/// Serialized answer stored in the cross-category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedResponse {
    pub question_id: QuestionId,
    pub score: i32,
    pub dont_know: bool,
}

impl PersistedResponse {
    pub fn new(question_id: QuestionId, score: i32) -> Self {
        Self {
            question_id,
            score,
            dont_know: score == DONT_KNOW_SCORE,
        }
    }
}
