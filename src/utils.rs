use std::path::PathBuf;

/// Get collection data directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("COLLECTOR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Parse a number string the way the broker API formats them ("1,234", "+56", " 78 ")
pub fn parse_number_str(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an unsigned integer count; negative or fractional input is rejected
pub fn parse_count_str(s: &str) -> Option<u64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    cleaned.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_str() {
        assert_eq!(parse_number_str("71000"), Some(71000.0));
        assert_eq!(parse_number_str(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_number_str("+45.2"), Some(45.2));
        assert_eq!(parse_number_str("-"), None);
        assert_eq!(parse_number_str(""), None);
        assert_eq!(parse_number_str("NaN"), None);
    }

    #[test]
    fn test_parse_count_str() {
        assert_eq!(parse_count_str("1,000"), Some(1000));
        assert_eq!(parse_count_str("0"), Some(0));
        assert_eq!(parse_count_str("-5"), None);
        assert_eq!(parse_count_str("abc"), None);
    }
}
