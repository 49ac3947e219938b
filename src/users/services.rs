use lazy_static::lazy_static;
use regex::Regex;

use super::dto::RegisterRequest;
use super::repo::ProfileChanges;
use crate::error::{ApiError, FieldErrors};

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 30;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration input that passed validation; the password is still plain.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidRegistration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Field-level validation of a registration request. Every problem is
/// reported at once; nothing here touches storage.
pub fn validate_registration(req: RegisterRequest) -> Result<ValidRegistration, ApiError> {
    let mut errors = FieldErrors::new();
    let email = normalize_email(&req.email);

    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    if req.password.is_empty() {
        errors.add("password", "This field is required.");
    } else if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
    if req.password2.is_empty() {
        errors.add("password2", "This field is required.");
    } else if req.password != req.password2 {
        errors.add("password", "Password fields don't match.");
    }

    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    check_name(&mut errors, "first_name", &first_name);
    check_name(&mut errors, "last_name", &last_name);

    errors.into_result()?;
    Ok(ValidRegistration {
        email,
        password: req.password,
        first_name,
        last_name,
    })
}

pub fn validate_profile(changes: &ProfileChanges) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();
    if let Some(first) = &changes.first_name {
        check_name(&mut errors, "first_name", first);
    }
    if let Some(last) = &changes.last_name {
        check_name(&mut errors, "last_name", last);
    }
    errors.into_result()
}

fn check_name(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() > MAX_NAME_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", MAX_NAME_LEN),
        );
    }
}
