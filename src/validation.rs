//! Request validation
//!
//! Pure functions over request data. Each check appends to a [`Validator`],
//! which turns into a single `Validation` error listing every failed field.

use chrono::NaiveDate;

use crate::auth::user::{Address, Budget, EmergencyContact};
use crate::error::{FieldError, Result, RoomStayError};

pub const FULL_NAME_MIN: usize = 2;
pub const FULL_NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;

/// Collects field errors across several checks
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field` unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(RoomStayError::validation(self.errors))
        }
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(idx, c)| c == '.' && idx > 0 && idx + 1 < domain.len())
}

/// 10 or 11 ASCII digits
pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    (10..=11).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_full_name(name: &str) -> bool {
    let len = name.trim().chars().count();
    (FULL_NAME_MIN..=FULL_NAME_MAX).contains(&len)
}

/// At least six characters with a lowercase letter, an uppercase letter and a digit
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn within_len(value: Option<&str>, max: usize) -> bool {
    value.map_or(true, |v| v.trim().chars().count() <= max)
}

pub fn is_past_date(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

/// Shared checks for a new password and its confirmation
pub fn check_new_password(
    validator: &mut Validator,
    field: &str,
    password: &str,
    confirm_field: &str,
    confirmation: &str,
) {
    validator
        .check(
            password.chars().count() >= PASSWORD_MIN,
            field,
            "Password must be at least 6 characters",
        )
        .check(
            is_strong_password(password) || password.chars().count() < PASSWORD_MIN,
            field,
            "Password must contain at least one uppercase letter, one lowercase letter and one digit",
        )
        .check(
            password == confirmation,
            confirm_field,
            "Password confirmation does not match",
        );
}

pub fn check_address(validator: &mut Validator, address: &Address) {
    validator
        .check(
            within_len(address.street.as_deref(), 200),
            "address.street",
            "Street must be at most 200 characters",
        )
        .check(
            within_len(address.ward.as_deref(), 100),
            "address.ward",
            "Ward must be at most 100 characters",
        )
        .check(
            within_len(address.district.as_deref(), 100),
            "address.district",
            "District must be at most 100 characters",
        )
        .check(
            within_len(address.city.as_deref(), 100),
            "address.city",
            "City must be at most 100 characters",
        );
}

pub fn check_emergency_contact(validator: &mut Validator, contact: &EmergencyContact) {
    validator
        .check(
            within_len(contact.name.as_deref(), 50),
            "emergencyContact.name",
            "Emergency contact name must be at most 50 characters",
        )
        .check(
            contact.phone.as_deref().map_or(true, is_valid_phone),
            "emergencyContact.phone",
            "Emergency contact phone number is invalid",
        )
        .check(
            within_len(contact.relationship.as_deref(), 50),
            "emergencyContact.relationship",
            "Relationship must be at most 50 characters",
        );
}

/// Non-negative, finite bounds with `min <= max` when both are given
pub fn check_budget(validator: &mut Validator, budget: &Budget) {
    let sane = |v: Option<f64>| v.map_or(true, |v| v.is_finite() && v >= 0.0);
    validator
        .check(sane(budget.min), "budget.min", "Minimum budget must be a non-negative number")
        .check(sane(budget.max), "budget.max", "Maximum budget must be a non-negative number")
        .check(
            match (budget.min, budget.max) {
                (Some(min), Some(max)) => min <= max,
                _ => true,
            },
            "budget",
            "Minimum budget cannot exceed maximum budget",
        );
}
