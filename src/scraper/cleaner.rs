use crate::error::PaxError;
use crate::models::{PassengerRecord, RawPaxRow};
use tracing::debug;

/// Parse `paxCnt`: surrounding whitespace is ignored, anything that is not a
/// non-negative integer is an error.
/// "12" → 12 | " 7 " → 7 | "" / "-1" / "1.5" / "n/a" → Err
pub fn parse_count(url: &str, s: &str) -> Result<u64, PaxError> {
    s.trim().parse().map_err(|_| PaxError::Count {
        url: url.to_string(),
        value: s.to_string(),
    })
}

/// Drop rows with a null field and coerce the rest. Order is preserved.
pub fn normalize_rows(url: &str, rows: Vec<RawPaxRow>) -> Result<Vec<PassengerRecord>, PaxError> {
    let total = rows.len();
    let mut records = Vec::with_capacity(total);

    for row in rows {
        let (Some(count), Some(nationality), Some(age_bracket)) =
            (row.pax_cnt, row.nationality, row.age)
        else {
            continue;
        };

        records.push(PassengerRecord {
            count: parse_count(url, &count)?,
            nationality,
            age_bracket,
        });
    }

    if records.len() < total {
        debug!("{}: dropped {} incomplete rows of {}", url, total - records.len(), total);
    }

    Ok(records)
}
