use validator::ValidationError;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, dangerous tags (like
/// <script>, <iframe>) and attributes (like onclick) are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitises and trims user text, returning `None` when nothing is left.
pub fn clean_text(input: &str) -> Option<String> {
    let cleaned = clean_html(input.trim());
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Rejects strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Content is required".into()));
    }
    Ok(())
}
