//! Input checks shared by the services. Each returns
//! `DomainError::Validation` naming the offending field.

use domains::{DomainError, DomainResult};

pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=30;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

pub fn username(value: &str) -> DomainResult<()> {
    if !USERNAME_LEN.contains(&value.chars().count()) {
        return Err(DomainError::validation("username must be 3 to 30 characters"));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(DomainError::validation(
            "username may only contain letters, digits, underscores and hyphens",
        ));
    }
    Ok(())
}

pub fn email(value: &str) -> DomainResult<()> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation("email address is invalid"))
    }
}

pub fn password(value: &str) -> DomainResult<()> {
    let len = value.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(DomainError::validation("password must be at least 8 characters"));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(DomainError::validation("password is too long"));
    }
    Ok(())
}

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub fn text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!("{field} must be at most {max} characters")));
    }
    Ok(trimmed.to_string())
}

/// Like [`text`] for optional fields; blank input becomes `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => text(field, v, max).map(Some),
    }
}
