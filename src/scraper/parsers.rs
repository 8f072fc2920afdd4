use crate::error::PaxError;
use crate::models::RawPaxRow;

/// Decode an endpoint body: a JSON array of objects whose `paxCnt`,
/// `nationality` and `age` are strings or null.
///
/// Anything else (an object, a numeric count, a nested value) is rejected
/// rather than coerced.
pub fn parse_pax_rows(url: &str, body: &str) -> Result<Vec<RawPaxRow>, PaxError> {
    serde_json::from_str(body).map_err(|source| PaxError::Body {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.org/APIS/TPE5";

    #[test]
    fn test_parse_rows_with_nulls() {
        let body = r#"[
            {"paxCnt":"5","nationality":"USA","age":"20~29"},
            {"paxCnt":null,"nationality":"JPN","age":"30~39"},
            {"nationality":"KOR","age":"40~49","extra":"ignored"}
        ]"#;

        let rows = parse_pax_rows(URL, body).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pax_cnt.as_deref(), Some("5"));
        assert_eq!(rows[1].pax_cnt, None);
        assert_eq!(rows[2].pax_cnt, None);
        assert_eq!(rows[2].nationality.as_deref(), Some("KOR"));
    }

    #[test]
    fn test_empty_array() {
        assert!(parse_pax_rows(URL, "[]").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_array() {
        let err = parse_pax_rows(URL, r#"{"message":"maintenance"}"#).unwrap_err();
        assert!(matches!(err, PaxError::Body { ref url, .. } if url == URL));
    }

    #[test]
    fn test_rejects_numeric_count() {
        let err = parse_pax_rows(URL, r#"[{"paxCnt":5,"nationality":"USA","age":"20~29"}]"#)
            .unwrap_err();
        assert!(matches!(err, PaxError::Body { .. }));
    }

    #[test]
    fn test_rejects_html() {
        assert!(parse_pax_rows(URL, "<html>502 Bad Gateway</html>").is_err());
    }
}
