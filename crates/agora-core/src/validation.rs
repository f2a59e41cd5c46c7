use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, CoreResult};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,4}$").expect("email pattern compiles")
});

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_TITLE_CHARS: usize = 25;

/// Characters that render as nothing: format controls, zero-width spaces,
/// Hangul fillers and the BOM.
fn is_invisible(c: char) -> bool {
    (c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        || matches!(
            c,
            '\u{00AD}'
                | '\u{115F}'
                | '\u{1160}'
                | '\u{180E}'
                | '\u{200B}'..='\u{200F}'
                | '\u{2028}'..='\u{202E}'
                | '\u{2060}'..='\u{2064}'
                | '\u{2066}'..='\u{206F}'
                | '\u{3164}'
                | '\u{FEFF}'
                | '\u{FFA0}'
        )
}

/// True when `s` is empty after trimming or contains any invisible character.
/// Spaces, tabs and line breaks between words are allowed.
pub fn is_blank_or_invisible(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || trimmed.chars().any(is_invisible)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_username(username: &str) -> CoreResult<()> {
    if username.chars().any(char::is_whitespace) {
        return Err(CoreError::invalid("username cannot contain spaces"));
    }
    if is_blank_or_invisible(username) {
        return Err(CoreError::invalid("username cannot be blank or contain invisible characters"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> CoreResult<()> {
    if !is_valid_email(email) {
        return Err(CoreError::invalid("malformed email address"));
    }
    Ok(())
}

pub fn validate_new_password(password: &str, confirmation: &str) -> CoreResult<()> {
    if is_blank_or_invisible(password) {
        return Err(CoreError::invalid("password cannot be blank or contain invisible characters"));
    }
    if password.chars().any(char::is_whitespace) {
        return Err(CoreError::invalid("password cannot contain spaces"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(CoreError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != confirmation {
        return Err(CoreError::invalid("password and confirmation do not match"));
    }
    Ok(())
}

/// Cut a title to at most [`MAX_TITLE_CHARS`] characters.
pub fn truncate_title(title: &str) -> &str {
    match title.char_indices().nth(MAX_TITLE_CHARS) {
        Some((idx, _)) => &title[..idx],
        None => title,
    }
}
