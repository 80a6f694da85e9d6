//! Field rules for account requests.

use std::sync::OnceLock;

use regex::Regex;

pub const USERNAME_MAX_LENGTH: usize = 15;
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 30;

const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn password_charset() -> &'static Regex {
    static CHARSET: OnceLock<Regex> = OnceLock::new();
    CHARSET.get_or_init(|| Regex::new(r"^[A-Za-z0-9@$!%*?&]+$").expect("charset pattern is valid"))
}

pub fn check_username(username: &str, errors: &mut Vec<String>) {
    if username.trim().is_empty() {
        errors.push("Username is required".to_string());
    } else if username.chars().count() > USERNAME_MAX_LENGTH {
        errors.push(format!(
            "Username cannot be more than {} characters long",
            USERNAME_MAX_LENGTH
        ));
    }
}

pub fn check_email(email: &str, errors: &mut Vec<String>) {
    if email.trim().is_empty() {
        errors.push("Email is required".to_string());
    } else if !email_regex().is_match(email.trim()) {
        errors.push("Invalid email".to_string());
    }
}

pub fn check_password(password: &str, errors: &mut Vec<String>) {
    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        errors.push(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LENGTH
        ));
    }
    if length > PASSWORD_MAX_LENGTH {
        errors.push(format!(
            "Password cannot be more than {} characters long",
            PASSWORD_MAX_LENGTH
        ));
    }

    let complex = password_charset().is_match(password)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !complex {
        errors.push(
            "Password must contain at least one uppercase letter, one number, and one special character"
                .to_string(),
        );
    }
}

/// Joins collected messages, or `None` when there are none.
pub fn summarize(errors: Vec<String>) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_errors(p: &str) -> Vec<String> {
        let mut errors = Vec::new();
        check_password(p, &mut errors);
        errors
    }

    #[test]
    fn test_valid_password() {
        assert!(password_errors("Secret1!").is_empty());
        assert!(password_errors("johnDoe20!@").is_empty());
    }

    #[test]
    fn test_password_rules() {
        assert!(!password_errors("Se1!").is_empty()); // too short
        assert!(!password_errors("secret1!").is_empty()); // no uppercase
        assert!(!password_errors("Secret!!").is_empty()); // no digit
        assert!(!password_errors("Secret11").is_empty()); // no special
        assert!(!password_errors("Secret1!#").is_empty()); // '#' not allowed
        assert!(!password_errors(&format!("Secret1!{}", "a".repeat(30))).is_empty());
    }

    #[test]
    fn test_email_rules() {
        let mut errors = Vec::new();
        check_email("johndoe@mail.com", &mut errors);
        assert!(errors.is_empty());

        check_email("", &mut errors);
        check_email("not-an-email", &mut errors);
        assert_eq!(errors, vec!["Email is required", "Invalid email"]);
    }

    #[test]
    fn test_username_rules() {
        let mut errors = Vec::new();
        check_username("johndoe", &mut errors);
        assert!(errors.is_empty());

        check_username("  ", &mut errors);
        check_username("a_very_long_username", &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_summarize() {
        assert_eq!(summarize(Vec::new()), None);
        assert_eq!(
            summarize(vec!["a".to_string(), "b".to_string()]),
            Some("a; b".to_string())
        );
    }
}
