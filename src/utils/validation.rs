use crate::error::AppError;
use crate::services::naming;

/// Reduces an uploaded filename to a safe base name and checks it against
/// the video allow-list. This runs before the namer, which only ever sees an
/// opaque base name.
pub fn sanitize_video_filename(filename: &str) -> Result<String, AppError> {
    // Strip any path components the client sent along. Both separator styles
    // are split, whatever the server platform.
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::BadRequest("Filename cannot be empty".to_string()));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path components stripped from upload filename: {}", filename);
    }

    // Replace control characters and filesystem-reserved punctuation.
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.starts_with('.') {
        return Err(AppError::BadRequest(
            "Hidden files (starting with '.') are not allowed".to_string(),
        ));
    }

    if !naming::is_permitted_media_type(&sanitized) {
        return Err(AppError::BadRequest(format!(
            "Unsupported file format; allowed extensions: {}",
            naming::PERMITTED_EXTENSIONS.join(", ")
        )));
    }

    Ok(sanitized)
}

/// Usernames become partition directory names, so the charset is strict:
/// ASCII alphanumerics plus `.`, `_`, `-`, at most 32 chars, no leading dot.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.len() > 32 {
        return Err(AppError::BadRequest(
            "Username must be 1-32 characters".to_string(),
        ));
    }
    if username.starts_with('.') {
        return Err(AppError::BadRequest(
            "Username cannot start with '.'".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Search keywords must be non-empty after trimming; the ranker never sees
/// an empty keyword.
pub fn validate_search_keyword(keyword: &str) -> Result<&str, AppError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::BadRequest(
            "Search keyword cannot be empty".to_string(),
        ));
    }
    Ok(keyword)
}
