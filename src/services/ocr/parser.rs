use regex::Regex;
use std::sync::OnceLock;

/// Longest regular number on a ticket, in digits
const REGULAR_MAX_DIGITS: usize = 2;

/// Map letters OCR commonly confuses with digits to those digits
pub fn correct_confusion(c: char) -> char {
    match c {
        'O' | 'Q' | 'D' => '0',
        'I' | 'l' => '1',
        'S' => '5',
        'B' => '8',
        'G' => '6',
        'Z' => '2',
        other => other,
    }
}

/// Clean raw OCR text into the digit string of one number.
///
/// Strips whitespace, applies the confusion map and keeps only digits.
/// Regular cells keep the last 2 digits when more remain.
pub fn clean_digits(text: &str, is_special: bool) -> String {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(correct_confusion)
        .filter(|c| c.is_ascii_digit())
        .collect();

    if !is_special && digits.len() > REGULAR_MAX_DIGITS {
        digits[digits.len() - REGULAR_MAX_DIGITS..].to_string()
    } else {
        digits
    }
}

/// Parse raw OCR text as a ticket number (e.g. `"Ol"` → 1)
pub fn normalize_to_int(text: &str, is_special: bool) -> Option<i32> {
    let digits = clean_digits(text, is_special);
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn digit_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").unwrap())
}

fn number_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Digits, confusable letters, whitespace and separators only
    RE.get_or_init(|| Regex::new(r"^[0-9OQDIlSBGZ|\s,.:/\-]+$").unwrap())
}

/// Strict filter for grid candidates: digits only, value in 1..=99
pub fn parse_grid_candidate(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    if !digit_token_regex().is_match(trimmed) {
        return None;
    }
    let value: i32 = trimmed.parse().ok()?;
    (1..=99).contains(&value).then_some(value)
}

/// Loose filter for full-row OCR lines: must look like numbers and contain a digit
pub fn is_number_line(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && number_line_regex().is_match(trimmed)
        && trimmed.chars().any(|c| c.is_ascii_digit())
}

/// Split a merged row of text into numeric tokens
pub fn split_tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '-' | '/' | ':' | '|'))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_map() {
        assert_eq!(correct_confusion('O'), '0');
        assert_eq!(correct_confusion('Q'), '0');
        assert_eq!(correct_confusion('D'), '0');
        assert_eq!(correct_confusion('I'), '1');
        assert_eq!(correct_confusion('l'), '1');
        assert_eq!(correct_confusion('S'), '5');
        assert_eq!(correct_confusion('B'), '8');
        assert_eq!(correct_confusion('G'), '6');
        assert_eq!(correct_confusion('Z'), '2');
        assert_eq!(correct_confusion('7'), '7');
    }

    #[test]
    fn test_normalize_to_int_confusion() {
        assert_eq!(normalize_to_int("Ol", false), Some(1));
        assert_eq!(normalize_to_int("O7", false), Some(7));
        assert_eq!(normalize_to_int(" 4 2 ", false), Some(42));
        assert_eq!(normalize_to_int("BG", false), Some(86));
    }

    #[test]
    fn test_regular_keeps_last_two_digits() {
        assert_eq!(clean_digits("123", false), "23");
        assert_eq!(normalize_to_int("1O5", false), Some(5));
        // Special cells are not truncated
        assert_eq!(clean_digits("123", true), "123");
    }

    #[test]
    fn test_normalize_to_int_rejects_noise() {
        assert_eq!(normalize_to_int("", false), None);
        assert_eq!(normalize_to_int("#?!", false), None);
        assert_eq!(normalize_to_int("xy", true), None);
    }

    #[test]
    fn test_grid_candidate_filter() {
        assert_eq!(parse_grid_candidate("07"), Some(7));
        assert_eq!(parse_grid_candidate(" 99 "), Some(99));
        assert_eq!(parse_grid_candidate("0"), None);
        assert_eq!(parse_grid_candidate("100"), None);
        assert_eq!(parse_grid_candidate("A1"), None);
        assert_eq!(parse_grid_candidate("1 2"), None);
    }

    #[test]
    fn test_number_line_filter() {
        assert!(is_number_line("05 12 33 41 60 07"));
        assert!(is_number_line("O5-12-33"));
        assert!(!is_number_line("POWERBALL"));
        assert!(!is_number_line("---"));
        assert!(!is_number_line(""));
    }

    #[test]
    fn test_split_tokens() {
        assert_eq!(split_tokens("05 12,33-41  60/07"), vec!["05", "12", "33", "41", "60", "07"]);
        assert!(split_tokens(" , ").is_empty());
    }
}
