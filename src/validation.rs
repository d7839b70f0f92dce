use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Number;

pub const PASSWORD_MIN_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{9,11}$").expect("phone regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
}

/// Domestic numbers without the leading zero or dashes, 9 to 11 digits.
pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Review sub-scores: 0.0 to 5.0 in steps of one decimal.
pub fn is_valid_score(score: f64) -> bool {
    if !(0.0..=5.0).contains(&score) {
        return false;
    }
    let scaled = score * 10.0;
    (scaled - scaled.round()).abs() < 1e-9
}

/// A JSON value that clients send either as a number or as a string.
/// Numbers of any magnitude are kept, so range checks happen on the text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(Number),
    Text(String),
}

impl NumberOrText {
    pub fn to_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }

    /// Integral values only; `2.0` converts, `2.5` does not.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
            Self::Text(s) => {
                let s = s.trim();
                s.parse().ok().or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
        }
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("abc@gmail.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co.kr"));
        assert!(!is_valid_email("dnstks0204gmail.com"));
        assert!(!is_valid_email("abc@gmail"));
        assert!(!is_valid_email("@gmail.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn password_length() {
        assert!(is_valid_password("12345678"));
        assert!(!is_valid_password("12348"));
        assert!(!is_valid_password(""));
    }

    #[test]
    fn phone_number_length() {
        assert!(is_valid_phone_number("1012345678"));
        assert!(is_valid_phone_number("101363587"));
        assert!(is_valid_phone_number("01012345678"));
        assert!(!is_valid_phone_number("1013635871332321"));
        assert!(!is_valid_phone_number("010-1234-5678"));
    }

    #[test]
    fn number_or_text() {
        let n: NumberOrText = serde_json::from_str("1012345678").unwrap();
        assert_eq!(n.to_text(), "1012345678");
        let t: NumberOrText = serde_json::from_str("\" 40000 \"").unwrap();
        assert_eq!(t.to_i64(), Some(40000));
        let bad: NumberOrText = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(bad.to_i64(), None);
    }

    #[test]
    fn number_beyond_i64_is_kept() {
        let n: NumberOrText = serde_json::from_str("10136358713323211234").unwrap();
        assert_eq!(n.to_text(), "10136358713323211234");
        assert!(!is_valid_phone_number(&n.to_text()));
        assert_eq!(n.to_i64(), None);
    }

    #[test]
    fn integral_floats_convert() {
        let n: NumberOrText = serde_json::from_str("2.0").unwrap();
        assert_eq!(n.to_i64(), Some(2));
        let n: NumberOrText = serde_json::from_str("2.5").unwrap();
        assert_eq!(n.to_i64(), None);
        let t: NumberOrText = serde_json::from_str("\"3.0\"").unwrap();
        assert_eq!(t.to_i64(), Some(3));
    }

    #[test]
    fn score_range_and_precision() {
        assert!(is_valid_score(0.0));
        assert!(is_valid_score(4.5));
        assert!(is_valid_score(5.0));
        assert!(!is_valid_score(5.1));
        assert!(!is_valid_score(-0.5));
        assert!(!is_valid_score(4.25));
    }
}
