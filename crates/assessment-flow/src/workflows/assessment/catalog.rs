use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    AnswerOption, AssessmentTypeId, Category, CategoryId, Dependency, Question, QuestionId,
};

/// Named ordering of scored categories selected once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentTypeDefinition {
    pub id: AssessmentTypeId,
    pub title: String,
    pub categories: Vec<CategoryId>,
}

/// On-disk catalog layout accepted by [`AssessmentCatalog::from_reader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub default_type: AssessmentTypeId,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub assessment_types: Vec<AssessmentTypeDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("category {0} is defined more than once")]
    DuplicateCategory(CategoryId),
    #[error("question {0} is defined more than once")]
    DuplicateQuestion(QuestionId),
    #[error("assessment type {0} is defined more than once")]
    DuplicateAssessmentType(AssessmentTypeId),
    #[error("{owner} references unknown category {category}")]
    UnknownCategory { owner: String, category: CategoryId },
    #[error("assessment type {assessment_type} lists category {category} more than once")]
    DuplicateCategoryInSequence {
        assessment_type: AssessmentTypeId,
        category: CategoryId,
    },
    #[error("assessment type {0} must not list the organization category")]
    OrganizationInSequence(AssessmentTypeId),
    #[error("question {question} depends on unknown question {dependency}")]
    UnknownDependency {
        question: QuestionId,
        dependency: QuestionId,
    },
    #[error("question {question} depends on {dependency} from another category")]
    CrossCategoryDependency {
        question: QuestionId,
        dependency: QuestionId,
    },
    #[error("question {question} requires {dependency} to equal more than one value")]
    ConflictingDependency {
        question: QuestionId,
        dependency: QuestionId,
    },
    #[error("default assessment type {0} is not defined")]
    UnknownDefaultType(AssessmentTypeId),
}

/// Immutable question and category configuration for a session.
#[derive(Debug, Clone)]
pub struct AssessmentCatalog {
    categories: Vec<Category>,
    questions: Vec<Question>,
    assessment_types: Vec<AssessmentTypeDefinition>,
    // Index into `assessment_types`; validated on construction.
    default_index: usize,
}

impl AssessmentCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    pub fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        let CatalogDocument {
            default_type,
            mut categories,
            questions,
            assessment_types,
        } = document;

        if !categories.iter().any(|category| category.id.is_organization()) {
            categories.insert(0, organization_category());
        }

        let mut category_ids = HashSet::new();
        for category in &categories {
            if !category_ids.insert(&category.id) {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
        }

        let mut question_ids = HashSet::new();
        for question in &questions {
            if !question_ids.insert(&question.id) {
                return Err(CatalogError::DuplicateQuestion(question.id.clone()));
            }
            if !category_ids.contains(&question.category) {
                return Err(CatalogError::UnknownCategory {
                    owner: format!("question {}", question.id),
                    category: question.category.clone(),
                });
            }
        }

        for question in &questions {
            for dependency in &question.dependencies {
                let target = questions
                    .iter()
                    .find(|candidate| candidate.id == dependency.question_id)
                    .ok_or_else(|| CatalogError::UnknownDependency {
                        question: question.id.clone(),
                        dependency: dependency.question_id.clone(),
                    })?;
                if target.category != question.category {
                    return Err(CatalogError::CrossCategoryDependency {
                        question: question.id.clone(),
                        dependency: dependency.question_id.clone(),
                    });
                }
                if dependency.has_conflicting_values() {
                    return Err(CatalogError::ConflictingDependency {
                        question: question.id.clone(),
                        dependency: dependency.question_id.clone(),
                    });
                }
            }
        }

        let mut type_ids = HashSet::new();
        for definition in &assessment_types {
            if !type_ids.insert(&definition.id) {
                return Err(CatalogError::DuplicateAssessmentType(definition.id.clone()));
            }

            let mut seen = HashSet::new();
            for category in &definition.categories {
                if category.is_organization() {
                    return Err(CatalogError::OrganizationInSequence(definition.id.clone()));
                }
                if !category_ids.contains(category) {
                    return Err(CatalogError::UnknownCategory {
                        owner: format!("assessment type {}", definition.id),
                        category: category.clone(),
                    });
                }
                if !seen.insert(category) {
                    return Err(CatalogError::DuplicateCategoryInSequence {
                        assessment_type: definition.id.clone(),
                        category: category.clone(),
                    });
                }
            }
        }

        let default_index = assessment_types
            .iter()
            .position(|definition| definition.id == default_type)
            .ok_or(CatalogError::UnknownDefaultType(default_type))?;

        Ok(Self {
            categories,
            questions,
            assessment_types,
            default_index,
        })
    }

    /// Replace the fallback type used for unknown requests.
    pub fn with_default_type(
        mut self,
        default_type: AssessmentTypeId,
    ) -> Result<Self, CatalogError> {
        self.default_index = self
            .assessment_types
            .iter()
            .position(|definition| definition.id == default_type)
            .ok_or(CatalogError::UnknownDefaultType(default_type))?;
        Ok(self)
    }

    pub fn default_type(&self) -> &AssessmentTypeId {
        &self.assessment_types[self.default_index].id
    }

    pub fn assessment_types(&self) -> &[AssessmentTypeDefinition] {
        &self.assessment_types
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn is_known_type(&self, assessment_type: &AssessmentTypeId) -> bool {
        self.assessment_types
            .iter()
            .any(|definition| &definition.id == assessment_type)
    }

    /// Look up a type, falling back to the default type for unknown ids.
    pub fn resolve_type(&self, requested: &AssessmentTypeId) -> &AssessmentTypeDefinition {
        if let Some(definition) = self
            .assessment_types
            .iter()
            .find(|definition| &definition.id == requested)
        {
            return definition;
        }

        let fallback = &self.assessment_types[self.default_index];
        warn!(
            requested = %requested,
            fallback = %fallback.id,
            "unknown assessment type; falling back to default ordering"
        );
        fallback
    }

    /// Full navigation sequence: organization first, then the scored categories.
    pub fn categories_for(&self, assessment_type: &AssessmentTypeId) -> Vec<CategoryId> {
        let definition = self.resolve_type(assessment_type);
        std::iter::once(CategoryId::organization())
            .chain(definition.categories.iter().cloned())
            .collect()
    }

    pub fn scored_categories(&self, assessment_type: &AssessmentTypeId) -> &[CategoryId] {
        &self.resolve_type(assessment_type).categories
    }

    pub fn total_count(&self, assessment_type: &AssessmentTypeId) -> usize {
        self.scored_categories(assessment_type).len()
    }

    /// 1-based index within the scored subset; `None` for organization or absent ids.
    pub fn position_of(
        &self,
        category: &CategoryId,
        assessment_type: &AssessmentTypeId,
    ) -> Option<usize> {
        self.scored_categories(assessment_type)
            .iter()
            .position(|candidate| candidate == category)
            .map(|index| index + 1)
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| &category.id == id)
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| &question.id == id)
    }

    /// Questions of a category that apply to the type, in catalog order.
    pub fn questions_for(
        &self,
        category: &CategoryId,
        assessment_type: &AssessmentTypeId,
    ) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|question| &question.category == category)
            .filter(|question| question.applies_to(assessment_type))
            .collect()
    }

    /// Every question id owned by a category regardless of type.
    pub fn category_question_ids(&self, category: &CategoryId) -> Vec<QuestionId> {
        self.questions
            .iter()
            .filter(|question| &question.category == category)
            .map(|question| question.id.clone())
            .collect()
    }

    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            default_type: self.default_type().clone(),
            categories: self.categories.clone(),
            questions: self.questions.clone(),
            assessment_types: self.assessment_types.clone(),
        }
    }

    pub fn standard() -> Self {
        Self {
            categories: standard_categories(),
            questions: standard_questions(),
            assessment_types: standard_assessment_types(),
            // comprehensive
            default_index: 2,
        }
    }
}

fn organization_category() -> Category {
    Category {
        id: CategoryId::organization(),
        title: "Organization".to_string(),
        description: "Profile of the organization taking the assessment.".to_string(),
        ends_assessment: false,
    }
}

fn category(id: &str, title: &str, description: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        title: title.to_string(),
        description: description.to_string(),
        ends_assessment: false,
    }
}

fn standard_categories() -> Vec<Category> {
    let mut data_management = category(
        "data_management",
        "Data Management",
        "Classification, retention and protection of organizational data.",
    );
    data_management.ends_assessment = true;

    vec![
        organization_category(),
        category(
            "governance",
            "Governance",
            "Policies, accountability and oversight of information security.",
        ),
        category(
            "risk_management",
            "Risk Management",
            "Identification, assessment and treatment of security risks.",
        ),
        category(
            "people",
            "People",
            "Security awareness, onboarding and offboarding practices.",
        ),
        category(
            "operations",
            "Operations",
            "Incident response, backups and operational continuity.",
        ),
        category(
            "technology",
            "Technology",
            "Technical safeguards across assets, identities and endpoints.",
        ),
        data_management,
    ]
}

fn standard_assessment_types() -> Vec<AssessmentTypeDefinition> {
    let sequence = |ids: &[&str]| ids.iter().map(|id| CategoryId::new(*id)).collect();

    vec![
        AssessmentTypeDefinition {
            id: AssessmentTypeId::new("quick"),
            title: "Quick scan".to_string(),
            categories: sequence(&["governance", "technology"]),
        },
        AssessmentTypeDefinition {
            id: AssessmentTypeId::new("targeted"),
            title: "Targeted assessment".to_string(),
            categories: sequence(&[
                "governance",
                "risk_management",
                "operations",
                "technology",
                "data_management",
            ]),
        },
        AssessmentTypeDefinition {
            id: AssessmentTypeId::new("comprehensive"),
            title: "Comprehensive assessment".to_string(),
            categories: sequence(&[
                "governance",
                "risk_management",
                "people",
                "operations",
                "technology",
                "data_management",
            ]),
        },
    ]
}

fn maturity_options() -> Vec<AnswerOption> {
    vec![
        AnswerOption::new(1, "Not in place"),
        AnswerOption::new(2, "Ad hoc"),
        AnswerOption::new(3, "Defined"),
        AnswerOption::new(4, "Managed"),
        AnswerOption::new(5, "Optimized"),
    ]
}

struct QuestionSeed {
    question: Question,
}

impl QuestionSeed {
    fn maturity(id: &str, category: &str, text: &str) -> Self {
        Self::with_options(id, category, text, maturity_options())
    }

    fn with_options(id: &str, category: &str, text: &str, options: Vec<AnswerOption>) -> Self {
        Self {
            question: Question {
                id: QuestionId::new(id),
                category: CategoryId::new(category),
                text: text.to_string(),
                options,
                dependencies: Vec::new(),
                assessment_types: Vec::new(),
            },
        }
    }

    fn depends_on(mut self, dependency: Dependency) -> Self {
        self.question.dependencies.push(dependency);
        self
    }

    fn only_for(mut self, types: &[&str]) -> Self {
        self.question.assessment_types = types
            .iter()
            .map(|id| AssessmentTypeId::new(*id))
            .collect();
        self
    }

    fn build(self) -> Question {
        self.question
    }
}

fn standard_questions() -> Vec<Question> {
    vec![
        QuestionSeed::with_options(
            "org_size",
            "organization",
            "How many people work in your organization?",
            vec![
                AnswerOption::new(1, "1-49"),
                AnswerOption::new(2, "50-249"),
                AnswerOption::new(3, "250-999"),
                AnswerOption::new(4, "1000 or more"),
            ],
        )
        .build(),
        QuestionSeed::with_options(
            "org_it_team",
            "organization",
            "Does your organization have a dedicated IT team?",
            vec![AnswerOption::new(1, "No"), AnswerOption::new(2, "Yes")],
        )
        .build(),
        QuestionSeed::with_options(
            "org_outsourced_it",
            "organization",
            "Is IT operated by an external provider?",
            vec![AnswerOption::new(1, "No"), AnswerOption::new(2, "Yes")],
        )
        .depends_on(Dependency::on("org_it_team").equals(1))
        .build(),
        QuestionSeed::maturity(
            "gov_policy",
            "governance",
            "Is there an approved information security policy?",
        )
        .build(),
        QuestionSeed::maturity(
            "gov_policy_review",
            "governance",
            "Is the security policy reviewed at least annually?",
        )
        .depends_on(Dependency::on("gov_policy").at_least(3))
        .build(),
        QuestionSeed::maturity(
            "gov_roles",
            "governance",
            "Are security roles and responsibilities assigned?",
        )
        .build(),
        QuestionSeed::maturity(
            "gov_board_reporting",
            "governance",
            "Does leadership receive regular security reporting?",
        )
        .only_for(&["targeted", "comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "risk_register",
            "risk_management",
            "Is a risk register maintained?",
        )
        .build(),
        QuestionSeed::maturity(
            "risk_appetite",
            "risk_management",
            "Is a risk appetite defined and used in decisions?",
        )
        .depends_on(Dependency::on("risk_register").at_least(3))
        .build(),
        QuestionSeed::maturity(
            "risk_third_party",
            "risk_management",
            "Are suppliers assessed for security risk?",
        )
        .build(),
        QuestionSeed::maturity(
            "people_awareness",
            "people",
            "Do staff receive security awareness training?",
        )
        .only_for(&["comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "people_phishing",
            "people",
            "Are phishing simulations run and followed up?",
        )
        .depends_on(Dependency::on("people_awareness").at_least(2))
        .only_for(&["comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "people_offboarding",
            "people",
            "Is access revoked promptly when staff leave?",
        )
        .only_for(&["comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "ops_incident_plan",
            "operations",
            "Is there a documented incident response plan?",
        )
        .only_for(&["comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "ops_incident_tested",
            "operations",
            "Is the incident response plan exercised?",
        )
        .depends_on(Dependency::on("ops_incident_plan").at_least(3))
        .only_for(&["comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "ops_backup",
            "operations",
            "Are backups taken, protected and restore-tested?",
        )
        .only_for(&["comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "tech_asset_inventory",
            "technology",
            "Is an inventory of hardware and software assets kept?",
        )
        .build(),
        QuestionSeed::maturity(
            "tech_patching",
            "technology",
            "Are security updates applied within a defined window?",
        )
        .build(),
        QuestionSeed::maturity(
            "tech_mfa",
            "technology",
            "Is multi-factor authentication used?",
        )
        .build(),
        QuestionSeed::maturity(
            "tech_mfa_coverage",
            "technology",
            "Does multi-factor authentication cover remote and admin access?",
        )
        .depends_on(Dependency::on("tech_mfa").at_least(2))
        .build(),
        QuestionSeed::maturity(
            "tech_endpoint",
            "technology",
            "Are endpoints protected and centrally monitored?",
        )
        .only_for(&["targeted", "comprehensive"])
        .build(),
        QuestionSeed::maturity(
            "data_classification",
            "data_management",
            "Is data classified by sensitivity?",
        )
        .build(),
        QuestionSeed::maturity(
            "data_remediation_plan",
            "data_management",
            "Is there a plan to introduce data classification?",
        )
        .depends_on(Dependency::on("data_classification").at_most(2))
        .build(),
        QuestionSeed::maturity(
            "data_encryption",
            "data_management",
            "Is sensitive data encrypted at rest and in transit?",
        )
        .depends_on(Dependency::on("data_classification").at_least(3))
        .build(),
        QuestionSeed::maturity(
            "data_retention",
            "data_management",
            "Are retention periods defined and enforced?",
        )
        .build(),
    ]
}
