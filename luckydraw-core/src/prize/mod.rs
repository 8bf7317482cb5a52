pub mod engine;
pub mod registry;

pub use engine::DrawEngine;
pub use registry::PrizeRegistry;

use crate::error::{ValidationError, MAX_NAME_LEN, MAX_PRIZE_COUNT};
use uuid::Uuid;

pub fn generate_prize_id() -> String {
    format!("prize-{}", Uuid::new_v4().simple())
}

pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    Ok(())
}

/// Trimmed name, 1 to 50 characters.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let len = trimmed.chars().count();
    if len > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { len });
    }

    Ok(trimmed.to_string())
}

/// Count for a new prize: integer in 1..=10000.
pub fn validate_total_count(count: f64) -> Result<u32, ValidationError> {
    check_integer(count)?;
    if count <= 0.0 {
        return Err(ValidationError::CountNotPositive);
    }
    check_upper_bound(count)
}

/// Administrative remaining count: integer in 0..=10000.
pub fn validate_remaining_count(count: f64) -> Result<u32, ValidationError> {
    check_integer(count)?;
    if count < 0.0 {
        return Err(ValidationError::CountNegative);
    }
    check_upper_bound(count)
}

/// Blank descriptions are dropped.
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Parse a count typed by a user. Anything that is not a number is rejected
/// here so the range rules can report integer and sign problems separately.
pub fn parse_count(raw: &str) -> Result<f64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::CountNotNumber);
    }
    match raw.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(value),
        _ => Err(ValidationError::CountNotNumber),
    }
}

fn check_integer(count: f64) -> Result<(), ValidationError> {
    if count.is_nan() {
        return Err(ValidationError::CountNotNumber);
    }
    if !count.is_finite() || count.fract() != 0.0 {
        return Err(ValidationError::CountNotInteger);
    }
    Ok(())
}

fn check_upper_bound(count: f64) -> Result<u32, ValidationError> {
    if count > MAX_PRIZE_COUNT as f64 {
        return Err(ValidationError::CountTooLarge);
    }
    Ok(count as u32)
}
