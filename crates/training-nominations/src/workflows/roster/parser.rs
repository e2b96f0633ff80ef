use super::normalizer::clean_cell;
use serde::{Deserialize, Deserializer};
use std::io::Read;

pub(crate) const REQUIRED_COLUMNS: [&str; 8] = [
    "Personal Number",
    "Name",
    "GL Range",
    "Directorate",
    "Division",
    "Department",
    "Location",
    "Years of Service Left",
];

/// One nominal-roll line, or the reason it could not be read. `row` counts the header as 1.
#[derive(Debug)]
pub(crate) struct ParsedRow {
    pub(crate) row: usize,
    pub(crate) outcome: Result<RosterRow, String>,
}

pub(crate) enum ParseFailure {
    Csv(csv::Error),
    MissingColumns(Vec<String>),
}

impl From<csv::Error> for ParseFailure {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, ParseFailure> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(clean_cell).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ParseFailure::MissingColumns(missing));
    }
    csv_reader.set_headers(headers.iter().collect());

    let rows = csv_reader
        .deserialize::<RosterRow>()
        .enumerate()
        .map(|(index, record)| ParsedRow {
            row: index + 2,
            outcome: record.map_err(|err| err.to_string()),
        })
        .collect();

    Ok(rows)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RosterRow {
    #[serde(
        rename = "Personal Number",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) personal_number: Option<String>,
    #[serde(rename = "Name", default, deserialize_with = "empty_string_as_none")]
    pub(crate) name: Option<String>,
    #[serde(rename = "GL Range", default, deserialize_with = "empty_string_as_none")]
    pub(crate) grade: Option<String>,
    #[serde(
        rename = "Directorate",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) directorate: Option<String>,
    #[serde(rename = "Division", default, deserialize_with = "empty_string_as_none")]
    pub(crate) division: Option<String>,
    #[serde(
        rename = "Department",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) department: Option<String>,
    #[serde(rename = "Location", default, deserialize_with = "empty_string_as_none")]
    pub(crate) location: Option<String>,
    #[serde(
        rename = "Years of Service Left",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) years_left: Option<String>,
}

/// Spreadsheet exports write missing cells as blanks or `nan`.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .map(|value| clean_cell(&value))
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("nan")))
}
