//! Client text sanitization

use super::directory::Registration;
use crate::error::InputError;
use regex::Regex;
use std::sync::OnceLock;

/// Default maximum accepted message length in characters
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1000;
/// Maximum length of a registration kind or capability label
pub const MAX_LABEL_LEN: usize = 100;
/// Maximum number of capabilities one client may advertise
pub const MAX_CAPABILITIES: usize = 16;

fn script_vectors() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[<>]|javascript:|on\w+=|data:|vbscript:").expect("static sanitizer pattern")
    })
}

/// Strip angle brackets, script protocols and inline event handlers
pub fn sanitize(text: &str) -> String {
    script_vectors().replace_all(text, "").into_owned()
}

/// Reject oversized input, then sanitize and reject what is left empty
pub fn validate_text(text: &str, max_len: usize) -> Result<String, InputError> {
    if text.chars().count() > max_len {
        return Err(InputError::TooLarge { max: max_len });
    }
    let cleaned = sanitize(text);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(trimmed.to_string())
}

/// Validate every client-supplied field of a registration
///
/// The name is bounded by `max_name_len`; the kind and each capability by
/// [`MAX_LABEL_LEN`]. A kind that sanitizes to nothing is dropped.
pub fn validate_registration(
    registration: Registration,
    max_name_len: usize,
) -> Result<Registration, InputError> {
    if registration.capabilities.len() > MAX_CAPABILITIES {
        return Err(InputError::TooManyCapabilities {
            max: MAX_CAPABILITIES,
        });
    }

    let name = validate_text(&registration.name, max_name_len)?;
    let kind = match registration.kind {
        Some(kind) => match validate_text(&kind, MAX_LABEL_LEN) {
            Ok(kind) => Some(kind),
            Err(InputError::Empty) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };
    let capabilities = registration
        .capabilities
        .iter()
        .map(|c| validate_text(c, MAX_LABEL_LEN))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Registration {
        name,
        kind,
        capabilities,
    })
}
