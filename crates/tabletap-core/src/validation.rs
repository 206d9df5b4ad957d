//! # Validation Module
//!
//! Input validation utilities for TableTap.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Routing layer (out of scope)                                 │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine entry points (Rust)                                   │
//! │  └── THIS MODULE: business rule validation, before any transaction     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (unit_code per table, pos_reference)           │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tabletap_core::validation::{validate_pax, validate_unit_code};
//!
//! // Validate a party size before opening a session
//! validate_pax(4).unwrap();
//!
//! // Validate a unit code before table registration
//! validate_unit_code("seat-3").unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_NOTES_LEN, MAX_PARTY_SIZE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a party size.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed [`MAX_PARTY_SIZE`]
///
/// ## Example
/// ```rust
/// use tabletap_core::validation::validate_pax;
///
/// assert!(validate_pax(2).is_ok());
/// assert!(validate_pax(0).is_err());
/// assert!(validate_pax(-3).is_err());
/// assert!(validate_pax(500).is_err());
/// ```
pub fn validate_pax(pax: i64) -> ValidationResult<()> {
    if pax <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "pax".to_string(),
        });
    }

    if pax > MAX_PARTY_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "pax".to_string(),
            min: 1,
            max: MAX_PARTY_SIZE,
        });
    }

    Ok(())
}

/// Validates a table's seat capacity.
///
/// ## Rules
/// - Must be positive (a zero-seat table can never host a session)
pub fn validate_seat_count(seat_count: i64) -> ValidationResult<()> {
    if seat_count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "seat_count".to_string(),
        });
    }
    Ok(())
}

/// Validates a monetary amount supplied by a caller (payment, discount).
///
/// ## Rules
/// - Must not be negative. Zero is fine: a fully comped bill pays 0.
pub fn validate_amount_cents(field: &str, amount_cents: i64) -> ValidationResult<()> {
    if amount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a unit code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 32 characters
/// - Only alphanumeric characters, hyphens, underscores (it ends up inside
///   QR URLs and staff displays)
///
/// ## Example
/// ```rust
/// use tabletap_core::validation::validate_unit_code;
///
/// assert!(validate_unit_code("seat-3").is_ok());
/// assert!(validate_unit_code("").is_err());
/// assert!(validate_unit_code("seat 3!").is_err());
/// ```
pub fn validate_unit_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "unit_code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "unit_code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "unit_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a table or unit display name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 100 characters
pub fn validate_display_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates closure notes.
///
/// ## Rules
/// - Optional; when present, at most [`MAX_NOTES_LEN`] characters
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    if let Some(notes) = notes {
        if notes.len() > MAX_NOTES_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES_LEN,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pax() {
        assert!(validate_pax(1).is_ok());
        assert!(validate_pax(MAX_PARTY_SIZE).is_ok());
        assert!(validate_pax(0).is_err());
        assert!(validate_pax(-1).is_err());
        assert!(validate_pax(MAX_PARTY_SIZE + 1).is_err());
    }

    #[test]
    fn test_validate_seat_count() {
        assert!(validate_seat_count(1).is_ok());
        assert!(validate_seat_count(12).is_ok());
        assert!(validate_seat_count(0).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents("amount_paid", 0).is_ok());
        assert!(validate_amount_cents("amount_paid", 1200).is_ok());
        assert!(validate_amount_cents("discount", -1).is_err());
    }

    #[test]
    fn test_validate_unit_code() {
        assert!(validate_unit_code("A").is_ok());
        assert!(validate_unit_code("seat-3").is_ok());
        assert!(validate_unit_code("bar_7").is_ok());
        assert!(validate_unit_code("").is_err());
        assert!(validate_unit_code("   ").is_err());
        assert!(validate_unit_code("seat 3").is_err());
        assert!(validate_unit_code(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert!(validate_display_name("name", "T1").is_ok());
        assert!(validate_display_name("name", "").is_err());
        assert!(validate_display_name("name", &"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("paid in two cards")).is_ok());
        assert!(validate_notes(Some(&"x".repeat(MAX_NOTES_LEN + 1))).is_err());
    }
}
