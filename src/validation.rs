//! Field rules shared by the user directory and the blog store.
//!
//! Each check returns the message to report for the field, or `None` when
//! the value passes.

use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MIN_TITLE_LENGTH: usize = 3;
pub const MIN_DESCRIPTION_LENGTH: usize = 10;
pub const MAX_TAGS: usize = 10;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn char_len(s: &str) -> usize {
    s.trim().chars().count()
}

pub fn check_name(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some("Name is required")
    } else if char_len(name) < MIN_NAME_LENGTH {
        Some("Name must be at least 2 characters long")
    } else {
        None
    }
}

pub fn check_email(email: &str) -> Option<&'static str> {
    if email.trim().is_empty() {
        Some("Email is required")
    } else if !is_valid_email(email.trim()) {
        Some("Please provide a valid email address")
    } else {
        None
    }
}

pub fn check_password(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password is required")
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        Some("Password must be at least 6 characters long")
    } else {
        None
    }
}

pub fn check_title(title: &str) -> Option<&'static str> {
    if title.trim().is_empty() {
        Some("Blog title is required")
    } else if char_len(title) < MIN_TITLE_LENGTH {
        Some("Title must be at least 3 characters long")
    } else {
        None
    }
}

pub fn check_description(description: &str) -> Option<&'static str> {
    if description.trim().is_empty() {
        Some("Blog description is required")
    } else if char_len(description) < MIN_DESCRIPTION_LENGTH {
        Some("Description must be at least 10 characters long")
    } else {
        None
    }
}

pub fn check_tag_count(count: usize) -> Option<&'static str> {
    (count > MAX_TAGS).then_some("Maximum 10 tags allowed")
}

pub fn check_comment(text: &str) -> Option<&'static str> {
    text.trim().is_empty().then_some("Comment text is required")
}
