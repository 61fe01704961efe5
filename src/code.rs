// Participant codes: five digits followed by a checksum letter.
use regex::Regex;
use std::sync::OnceLock;

static CODE_SHAPE: OnceLock<Regex> = OnceLock::new();

fn code_shape() -> &'static Regex {
    CODE_SHAPE.get_or_init(|| Regex::new(r"^[0-9]{5}[A-Z]$").expect("code pattern is valid"))
}

/// Letter expected after the given digits: the digit sum modulo 26,
/// counted from 'A'. Non-digit characters are ignored.
pub fn checksum_letter(digits: &str) -> char {
    let sum: u32 = digits.chars().filter_map(|c| c.to_digit(10)).sum();
    (b'A' + (sum % 26) as u8) as char
}

/// True iff `code` is five ASCII digits followed by the matching
/// uppercase checksum letter. Malformed input is simply invalid.
pub fn is_valid_code(code: &str) -> bool {
    if !code_shape().is_match(code) {
        return false;
    }
    let (digits, letter) = code.split_at(5);
    letter.starts_with(checksum_letter(digits))
}

/// Upper-cases and trims user input the way the form field does.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}
