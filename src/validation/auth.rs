use crate::error::{AppError, Result};

/// Validates a display name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    if name.len() > 100 {
        return Err(AppError::Validation(
            "Name must be at most 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a user-chosen public identifier.
pub fn validate_user_id(id: &str) -> Result<()> {
    if id.len() < 3 {
        return Err(AppError::Validation(
            "Id must be at least 3 characters long".to_string(),
        ));
    }

    if id.len() > 64 {
        return Err(AppError::Validation(
            "Id must be at most 64 characters".to_string(),
        ));
    }

    if !id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::Validation(
            "Id can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}
