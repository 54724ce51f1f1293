//! Brazilian-Portuguese date rendering for mail templates.

use chrono::{DateTime, Datelike, NaiveDate};

use crate::error::HandlerError;

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Parse an ISO-8601 date out of a payload field.
///
/// Producers send either a full timestamp ("2026-03-15T00:00:00.000Z") or a
/// bare date ("2026-03-15"); both are accepted.
pub(crate) fn parse_iso_date(value: &str) -> Result<NaiveDate, HandlerError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.date_naive());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| HandlerError::failed(format!("invalid ISO-8601 date: {value}")))
}

/// Long form used in mail bodies: "Dia 12 de outubro de 2019".
pub(crate) fn long_pt_br(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("Dia {:02} de {} de {}", date.day(), month, date.year())
}
