use chrono::NaiveDate;

/// Strip spreadsheet artefacts and collapse internal whitespace.
pub(crate) fn clean_cell(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', '\u{a0}'], " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First token is the first name; the remainder is the last name.
pub(crate) fn split_name(value: &str) -> Option<(String, String)> {
    let cleaned = clean_cell(value);
    let (first, rest) = cleaned.split_once(' ')?;
    Some((first.to_string(), rest.to_string()))
}

/// Whole-number years, accepting the `12.0` spelling spreadsheets export.
pub(crate) fn parse_years(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(years) = trimmed.parse::<i64>() {
        return Some(years);
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|years| years.is_finite())
        .map(|years| years.trunc() as i64)
}

/// Back-date the join date so that `years_left` remain before retirement.
pub(crate) fn joined_on(current_year: i32, retirement_years: u32, years_left: u32) -> Option<NaiveDate> {
    let served = i32::try_from(retirement_years.saturating_sub(years_left)).ok()?;
    NaiveDate::from_ymd_opt(current_year - served, 1, 1)
}
