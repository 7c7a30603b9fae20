use super::ApiError;

pub fn validate_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if !(3..=20).contains(&username.chars().count()) {
        return Err(ApiError::validation(
            "Username must be between 3 and 20 characters",
        ));
    }
    Ok(username)
}

pub fn validate_title(title: &str) -> Result<&str, ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    if trimmed.chars().count() > 100 {
        return Err(ApiError::validation("Title must be 100 characters or less"));
    }
    Ok(trimmed)
}

pub fn validate_text(text: &str) -> Result<&str, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Text cannot be empty"));
    }
    Ok(trimmed)
}

pub fn validate_max_comments(max_comments: Option<i32>) -> Result<Option<i32>, ApiError> {
    if let Some(max) = max_comments
        && max < 0
    {
        return Err(ApiError::validation(
            "maxComments must be zero or a positive integer",
        ));
    }
    Ok(max_comments)
}

pub fn validate_totp_code(code: &str) -> Result<&str, ApiError> {
    if !crate::services::totp::code_is_well_formed(code) {
        return Err(ApiError::validation("Code must be exactly 6 digits"));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id(1).is_ok());
        assert!(validate_id(12345).is_ok());
        assert!(validate_id(0).is_err());
        assert!(validate_id(-1).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("a".repeat(20).as_str()).is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Hello").is_ok());
        assert!(validate_title("a".repeat(100).as_str()).is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("a".repeat(101).as_str()).is_err());
    }

    #[test]
    fn test_validate_text() {
        assert!(validate_text("a comment").is_ok());
        assert!(validate_text("").is_err());
        assert!(validate_text("  \n ").is_err());
    }

    #[test]
    fn test_validate_max_comments() {
        assert!(validate_max_comments(None).is_ok());
        assert!(validate_max_comments(Some(0)).is_ok());
        assert!(validate_max_comments(Some(10)).is_ok());
        assert!(validate_max_comments(Some(-1)).is_err());
    }

    #[test]
    fn test_validate_totp_code() {
        assert!(validate_totp_code("123456").is_ok());
        assert!(validate_totp_code("000000").is_ok());
        assert!(validate_totp_code("12345").is_err());
        assert!(validate_totp_code("1234567").is_err());
        assert!(validate_totp_code("12345a").is_err());
    }
}
