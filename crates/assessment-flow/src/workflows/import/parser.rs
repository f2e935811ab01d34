use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ResponseRecord {
    pub(crate) line: u64,
    pub(crate) question_id: String,
    pub(crate) score: Option<String>,
    pub(crate) dont_know: bool,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<ResponseRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for result in csv_reader.records() {
        let raw = result?;
        let line = raw.position().map(|position| position.line()).unwrap_or_default();
        let row: ResponseRow = raw.deserialize(Some(&headers))?;
        if row.question_id.is_empty() {
            continue;
        }

        records.push(ResponseRecord {
            line,
            question_id: row.question_id,
            score: row.score,
            dont_know: row
                .dont_know
                .as_deref()
                .map(is_truthy)
                .unwrap_or(false),
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    question_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    dont_know: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}
