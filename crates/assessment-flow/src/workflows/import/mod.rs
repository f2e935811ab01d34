//! Seeds a persisted response record from a CSV export of a prior assessment.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::workflows::assessment::{
    AssessmentCatalog, PersistedResponse, QuestionId, DONT_KNOW_SCORE,
};

use parser::ResponseRecord;

#[derive(Debug)]
pub enum ResponseImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidScore { line: u64, value: String },
}

impl std::fmt::Display for ResponseImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseImportError::Io(err) => write!(f, "failed to read response export: {}", err),
            ResponseImportError::Csv(err) => write!(f, "invalid response CSV data: {}", err),
            ResponseImportError::InvalidScore { line, value } => {
                write!(f, "line {}: score {:?} is not an integer", line, value)
            }
        }
    }
}

impl std::error::Error for ResponseImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResponseImportError::Io(err) => Some(err),
            ResponseImportError::Csv(err) => Some(err),
            ResponseImportError::InvalidScore { .. } => None,
        }
    }
}

impl From<std::io::Error> for ResponseImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ResponseImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Accepted responses plus counts of rows that were dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseImport {
    pub responses: Vec<PersistedResponse>,
    pub unknown_questions: usize,
    pub duplicates: usize,
    pub rejected_scores: usize,
}

pub struct CsvResponseImporter;

impl CsvResponseImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        catalog: &AssessmentCatalog,
    ) -> Result<ResponseImport, ResponseImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, catalog)
    }

    /// Columns: `question_id,score[,dont_know]`. Unknown ids are skipped and the
    /// first row for a question wins.
    pub fn from_reader<R: Read>(
        reader: R,
        catalog: &AssessmentCatalog,
    ) -> Result<ResponseImport, ResponseImportError> {
        let mut import = ResponseImport::default();
        let mut seen: HashSet<QuestionId> = HashSet::new();

        for record in parser::parse_records(reader)? {
            let question_id = QuestionId::new(record.question_id.clone());
            let Some(question) = catalog.question(&question_id) else {
                debug!(line = record.line, question = %question_id, "skipping unknown question");
                import.unknown_questions += 1;
                continue;
            };

            if seen.contains(&question_id) {
                import.duplicates += 1;
                continue;
            }

            let Some(score) = record_score(&record)? else {
                continue;
            };

            if !question.accepts(score) {
                warn!(
                    line = record.line,
                    question = %question_id,
                    score,
                    "score is not a valid option; row skipped"
                );
                import.rejected_scores += 1;
                continue;
            }

            seen.insert(question_id.clone());
            import
                .responses
                .push(PersistedResponse::new(question_id, score));
        }

        info!(
            imported = import.responses.len(),
            unknown = import.unknown_questions,
            duplicates = import.duplicates,
            rejected = import.rejected_scores,
            "response import finished"
        );
        Ok(import)
    }
}

fn record_score(record: &ResponseRecord) -> Result<Option<i32>, ResponseImportError> {
    if record.dont_know {
        return Ok(Some(DONT_KNOW_SCORE));
    }

    match record.score.as_deref() {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| ResponseImportError::InvalidScore {
                line: record.line,
                value: value.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn import(csv: &str) -> ResponseImport {
        let catalog = AssessmentCatalog::standard();
        CsvResponseImporter::from_reader(Cursor::new(csv.to_string()), &catalog)
            .expect("import succeeds")
    }

    #[test]
    fn importer_reads_scores_and_dont_know_rows() {
        let result = import(
            "question_id,score,dont_know\ngov_policy,4,\ngov_roles,,yes\ntech_mfa,-1,\n",
        );

        assert_eq!(
            result.responses,
            vec![
                PersistedResponse::new(QuestionId::new("gov_policy"), 4),
                PersistedResponse::new(QuestionId::new("gov_roles"), DONT_KNOW_SCORE),
                PersistedResponse::new(QuestionId::new("tech_mfa"), DONT_KNOW_SCORE),
            ]
        );
    }

    #[test]
    fn importer_keeps_first_duplicate_and_skips_unknown_ids() {
        let result = import("question_id,score\ngov_policy,2\ngov_policy,5\nnot_a_question,3\n");

        assert_eq!(
            result.responses,
            vec![PersistedResponse::new(QuestionId::new("gov_policy"), 2)]
        );
        assert_eq!(result.duplicates, 1);
        assert_eq!(result.unknown_questions, 1);
    }

    #[test]
    fn importer_rejects_out_of_range_scores_without_failing() {
        let result = import("question_id,score\ngov_policy,9\ngov_policy,3\n");

        assert_eq!(result.rejected_scores, 1);
        assert_eq!(
            result.responses,
            vec![PersistedResponse::new(QuestionId::new("gov_policy"), 3)]
        );
    }

    #[test]
    fn importer_reports_line_of_non_numeric_score() {
        let error = CsvResponseImporter::from_reader(
            Cursor::new("question_id,score\ngov_policy,3\ngov_roles,often\n"),
            &AssessmentCatalog::standard(),
        )
        .expect_err("expected invalid score");

        match error {
            ResponseImportError::InvalidScore { line, value } => {
                assert_eq!(line, 3);
                assert_eq!(value, "often");
            }
            other => panic!("expected invalid score, got {other:?}"),
        }
    }

    #[test]
    fn importer_from_path_propagates_io_errors() {
        let error = CsvResponseImporter::from_path(
            "./does-not-exist.csv",
            &AssessmentCatalog::standard(),
        )
        .expect_err("expected io error");

        assert!(matches!(error, ResponseImportError::Io(_)));
    }
}
