//! Input validation shared by the HTTP request types and the services
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use validator::ValidationError;

use crate::error::{AppError, Result};
use crate::models::{COMMENT_TEXT_MAX_CHARS, POST_TEXT_MAX_CHARS};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

pub const USERNAME_MIN_CHARS: usize = 3;
pub const PASSWORD_MIN_CHARS: usize = 6;

pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Trim and lower-case an email, rejecting malformed addresses
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !validate_email(&email) {
        return Err(AppError::Validation("Please provide a valid email".into()));
    }
    Ok(email)
}

/// Trimmed username of at least three characters
pub fn normalize_username(username: &str) -> Result<String> {
    let username = username.trim();
    if username.chars().count() < USERNAME_MIN_CHARS {
        return Err(AppError::Validation(
            "Username must be at least 3 characters".into(),
        ));
    }
    Ok(username.to_string())
}

pub fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

/// Trim `raw` and require 1..=max characters
fn bounded_text(raw: &str, max: usize, message: &str) -> Result<String> {
    let text = raw.trim();
    let len = text.chars().count();
    if len == 0 || len > max {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(text.to_string())
}

pub fn normalize_post_text(raw: &str) -> Result<String> {
    bounded_text(
        raw,
        POST_TEXT_MAX_CHARS,
        "Post text must be between 1 and 5000 characters",
    )
}

pub fn normalize_comment_text(raw: &str) -> Result<String> {
    bounded_text(
        raw,
        COMMENT_TEXT_MAX_CHARS,
        "Comment text must be between 1 and 1000 characters",
    )
}

/// validator crate compatible: username length after trimming
pub fn validate_username_field(username: &str) -> std::result::Result<(), ValidationError> {
    if username.trim().chars().count() >= USERNAME_MIN_CHARS {
        Ok(())
    } else {
        let mut err = ValidationError::new("username_too_short");
        err.message = Some(Cow::from("Username must be at least 3 characters"));
        Err(err)
    }
}

/// validator crate compatible: the same check `normalize_email` applies
pub fn validate_email_field(email: &str) -> std::result::Result<(), ValidationError> {
    if validate_email(&email.trim().to_lowercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email_invalid");
        err.message = Some(Cow::from("Please provide a valid email"));
        Err(err)
    }
}
