use validator::ValidateEmail;

/// Longest trial a plan may offer, counted in the plan's trial unit.
pub const MAX_TRIAL_DURATION: u32 = 365;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a phone number: optional leading `+`, then 1-16 digits not
/// starting with zero.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.is_empty() || digits.len() > 16 {
        return false;
    }
    let mut chars = digits.chars();
    matches!(chars.next(), Some('1'..='9')) && chars.all(|c| c.is_ascii_digit())
}

/// Validates an ISO-4217 style currency code (three uppercase letters).
pub fn is_valid_currency(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

/// Validates a plan code for URL-friendly characters.
/// Rules:
/// - 1-50 characters
/// - Only lowercase ASCII letters, numbers, hyphens, underscores
/// - Must start with a letter or number (not hyphen/underscore)
pub fn is_valid_plan_code(code: &str) -> bool {
    if code.is_empty() || code.len() > 50 {
        return false;
    }

    let Some(first) = code.chars().next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    code.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Validates a discount code: 3-32 uppercase letters, digits, hyphens or underscores.
pub fn is_valid_discount_code(code: &str) -> bool {
    (3..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Checks that `value` has between `min` and `max` characters after trimming.
pub fn is_within_length(value: &str, min: usize, max: usize) -> bool {
    let len = value.trim().chars().count();
    len >= min && len <= max
}
