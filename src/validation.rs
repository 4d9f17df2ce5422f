//! Identifier validation.
//!
//! Participant and session ids become directory names, so anything that is
//! not a plain token is rejected before it reaches path construction.

use anyhow::{bail, Result};

/// Maximum allowed length for participant and session ids.
pub const MAX_ID_LENGTH: usize = 128;

/// Validates that an ID is safe for use as a single path component.
///
/// An ID is valid if it is non-empty, at most [`MAX_ID_LENGTH`] characters,
/// and made only of ASCII alphanumerics, dashes and underscores.
///
/// ```
/// use turnfile::validation::validate_id;
///
/// assert!(validate_id("p1").is_ok());
/// assert!(validate_id("3f2a-b1_c").is_ok());
/// assert!(validate_id("").is_err());
/// assert!(validate_id("../server.heartbeat").is_err());
/// ```
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("ID cannot be empty");
    }

    if id.len() > MAX_ID_LENGTH {
        bail!(
            "ID too long: {} characters (max {})",
            id.len(),
            MAX_ID_LENGTH
        );
    }

    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_chars {
        bail!("ID '{id}' contains invalid characters. Use only alphanumeric characters, dashes (-), and underscores (_)");
    }

    Ok(())
}

/// Clap value parser for validating ID arguments.
pub fn clap_id_validator(s: &str) -> Result<String, String> {
    validate_id(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}
