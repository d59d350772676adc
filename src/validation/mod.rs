use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const PAYMENT_CODE_MAX_LEN: usize = 64;
pub const MAJOR_ID_MAX_LEN: usize = 32;
pub const STUDENT_NUMBER_MAX_LEN: usize = 32;
pub const NAME_MAX_LEN: usize = 255;
pub const AMOUNT_INPUT_MAX_LEN: usize = 64;
pub const AMOUNT_MAX_FRACTION_DIGITS: usize = 2;
/// Components are stored as `NUMERIC(14, 2)`. Five of them always fit the
/// `NUMERIC(16, 2)` total.
pub const AMOUNT_MAX_WHOLE_DIGITS: usize = 12;
pub const SEMESTER_MIN: i32 = 1;
pub const SEMESTER_MAX: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

/// Drops control characters and collapses whitespace runs (tabs and
/// newlines included) into single spaces.
pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Sanitizes `value` and checks it is present and within `max_len`.
pub fn required_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, max_len)?;
    Ok(value)
}

pub fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ValidationError> {
    let value = value.trim();
    validate_required(field, value)?;
    Uuid::parse_str(value).map_err(|_| ValidationError::new(field, "must be a valid UUID"))
}

pub fn validate_semester(field: &'static str, semester: i32) -> ValidationResult {
    if !(SEMESTER_MIN..=SEMESTER_MAX).contains(&semester) {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}", SEMESTER_MIN, SEMESTER_MAX),
        ));
    }

    Ok(())
}

pub fn validate_payment_code(code: &str) -> Result<String, ValidationError> {
    let code = required_text("paymentCode", code, PAYMENT_CODE_MAX_LEN)?;

    if !code
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(ValidationError::new(
            "paymentCode",
            "must contain only letters, digits, '-' or '_'",
        ));
    }

    Ok(code)
}

/// Parses nonnegative decimal text such as `"1500000"` or `"1500000.50"`.
///
/// Signs, exponents and more than two fraction digits are rejected. The
/// result always carries a scale of two.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<BigDecimal, ValidationError> {
    let text = raw.trim();
    validate_required(field, text)?;
    validate_max_len(field, text, AMOUNT_INPUT_MAX_LEN)?;

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    let digits_only = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
    if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) {
        return Err(ValidationError::new(
            field,
            "must be a nonnegative decimal number",
        ));
    }

    if whole.trim_start_matches('0').len() > AMOUNT_MAX_WHOLE_DIGITS {
        return Err(ValidationError::new(
            field,
            format!("must have at most {} digits before the decimal point", AMOUNT_MAX_WHOLE_DIGITS),
        ));
    }

    if fraction.trim_end_matches('0').len() > AMOUNT_MAX_FRACTION_DIGITS {
        return Err(ValidationError::new(
            field,
            format!("must have at most {} decimal places", AMOUNT_MAX_FRACTION_DIGITS),
        ));
    }

    BigDecimal::from_str(text)
        .map(|amount| amount.with_scale(AMOUNT_MAX_FRACTION_DIGITS as i64))
        .map_err(|_| ValidationError::new(field, "must be a nonnegative decimal number"))
}

pub fn parse_optional_amount(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<BigDecimal>, ValidationError> {
    raw.map(|value| parse_amount(field, value)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("status", "paid", &["unpaid", "paid"]).is_ok());
        assert!(validate_enum("status", "refunded", &["unpaid", "paid"]).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
        assert_eq!(sanitize_string("PAY\t001"), "PAY 001");
        assert_eq!(sanitize_string("Budi\r\nSantoso"), "Budi Santoso");
    }

    #[test]
    fn parses_amounts() {
        assert_eq!(
            parse_amount("basicFee", "5000000").unwrap(),
            BigDecimal::from_str("5000000.00").unwrap()
        );
        assert_eq!(
            parse_amount("basicFee", " 1250.5 ").unwrap().to_string(),
            "1250.50"
        );
        assert_eq!(parse_amount("basicFee", "0").unwrap().to_string(), "0.00");
        assert_eq!(parse_amount("basicFee", "10.500").unwrap().to_string(), "10.50");
    }

    #[test]
    fn rejects_malformed_amounts() {
        for raw in ["", "-1", "+5", "1e6", "abc", "1.2.3", ".5", "12,5", "1.234"] {
            let err = parse_amount("labFee", raw).unwrap_err();
            assert_eq!(err.field, "labFee", "input {:?}", raw);
        }
        assert!(parse_amount("labFee", &"9".repeat(65)).is_err());
    }

    #[test]
    fn caps_amounts_at_column_precision() {
        let largest = "9".repeat(12);
        assert_eq!(
            parse_amount("basicFee", &format!("{}.99", largest)).unwrap().to_string(),
            format!("{}.99", largest)
        );
        assert!(parse_amount("basicFee", &format!("000{}", largest)).is_ok());

        let err = parse_amount("basicFee", &"9".repeat(13)).unwrap_err();
        assert_eq!(err.field, "basicFee");
        assert!(err.message.contains("12 digits"));
        assert!(parse_amount("basicFee", &"9".repeat(20)).is_err());
    }

    #[test]
    fn parses_optional_amounts() {
        assert_eq!(parse_optional_amount("examFee", None).unwrap(), None);
        assert!(parse_optional_amount("examFee", Some("300000")).unwrap().is_some());
        assert!(parse_optional_amount("examFee", Some("x")).is_err());
    }

    #[test]
    fn validates_semester_range() {
        assert!(validate_semester("semester", 1).is_ok());
        assert!(validate_semester("semester", 8).is_ok());
        assert!(validate_semester("semester", 0).is_err());
        assert!(validate_semester("semester", 9).is_err());
    }

    #[test]
    fn validates_payment_code() {
        assert_eq!(validate_payment_code("  PAY-2024-001 ").unwrap(), "PAY-2024-001");
        assert!(validate_payment_code("").is_err());
        assert!(validate_payment_code("PAY 001").is_err());
        assert!(validate_payment_code(&"P".repeat(65)).is_err());
    }

    #[test]
    fn parses_uuid_field() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid("studentId", &id.to_string()).unwrap(), id);
        assert_eq!(parse_uuid("studentId", "").unwrap_err().message, "must not be empty");
        assert!(parse_uuid("studentId", "not-a-uuid").is_err());
    }
}
