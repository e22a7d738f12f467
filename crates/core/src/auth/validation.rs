//! Input rules for usernames, passwords and email addresses.

use pocket_domain::constants::{PASSWORD_MIN_LENGTH, USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH};
use pocket_domain::{PocketError, Result};

/// Trim and lowercase a username as entered.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 3 to 32 characters from `[a-z0-9_.-]` (after normalization).
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len) {
        return Err(PocketError::InvalidInput(format!(
            "username must be {USERNAME_MIN_LENGTH}-{USERNAME_MAX_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    {
        return Err(PocketError::InvalidInput(
            "username may only contain a-z, 0-9, '_', '.' and '-'".into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(PocketError::InvalidInput(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Shape check only: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || PocketError::InvalidInput(format!("'{email}' is not a valid email address"));
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert_eq!(normalize_username("  Alice.B "), "alice.b");
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice:admin").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("student@uni.edu").is_ok());
        assert!(validate_email("student@localhost").is_err());
        assert!(validate_email("@uni.edu").is_err());
        assert!(validate_email("a@@uni.edu").is_err());
        assert!(validate_email("a b@uni.edu").is_err());
        assert!(validate_email("a@uni..edu").is_err());
    }
}
