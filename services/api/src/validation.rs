//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password length for registration
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();
    if !(8..=32).contains(&length) {
        return Err("Password length must be between 8 and 32 characters".to_string());
    }

    Ok(())
}

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    let length = name.chars().count();
    if !(2..=60).contains(&length) {
        return Err("name must be between 2 and 60 characters".to_string());
    }
    Ok(())
}

/// Validate body weight
pub fn validate_weight(weight: f64) -> Result<(), String> {
    if !(10.0..=1000.0).contains(&weight) {
        return Err("weight must be between 10 and 1000".to_string());
    }
    Ok(())
}

/// Validate body height
pub fn validate_height(height: f64) -> Result<(), String> {
    if !(3.0..=250.0).contains(&height) {
        return Err("height must be between 3 and 250".to_string());
    }
    Ok(())
}

/// Validate a profile image URI
pub fn validate_image_uri(uri: &str) -> Result<(), String> {
    static URI_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URI_REGEX.get_or_init(|| {
        Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("Failed to compile URI regex")
    });

    if !regex.is_match(uri) {
        return Err("imageUri must be a valid URI".to_string());
    }
    Ok(())
}
