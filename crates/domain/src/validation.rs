//! Input validation and sanitization.
//!
//! Every check runs before storage is touched and reports the first
//! offending field. Lengths are counted in characters after trimming.

use std::collections::HashSet;
use std::sync::LazyLock;

use common::PetId;
use regex::Regex;

use crate::catalog::{CreatePetInput, CreateStoreInput};
use crate::error::ValidationError;
use crate::order::CreateOrderInput;

pub const MAX_PETS_PER_ORDER: usize = 10;
pub const MAX_CUSTOMER_ID_LEN: usize = 50;
pub const MAX_OWNER_ID_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_AGE: i32 = 50;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_PICTURE_URL_LEN: usize = 500;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Strips NUL bytes and surrounding whitespace.
pub fn sanitize(s: &str) -> String {
    s.replace('\0', "").trim().to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.chars().count() <= MAX_EMAIL_LEN && EMAIL.is_match(email)
}

fn required(field: &'static str, value: &str, max: usize, label: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::new(
            field,
            format!("{label} is required and cannot be empty"),
        ));
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("{label} cannot exceed {max} characters"),
        ));
    }
    Ok(())
}

pub fn validate_create_order(input: &CreateOrderInput) -> Result<(), ValidationError> {
    required(
        "customer_id",
        &input.customer_id,
        MAX_CUSTOMER_ID_LEN,
        "customer ID",
    )?;

    if input.pet_ids.is_empty() {
        return Err(ValidationError::new(
            "pet_ids",
            "at least one pet ID is required",
        ));
    }
    if input.pet_ids.len() > MAX_PETS_PER_ORDER {
        return Err(ValidationError::new(
            "pet_ids",
            format!("cannot purchase more than {MAX_PETS_PER_ORDER} pets in a single order"),
        ));
    }

    let mut seen: HashSet<PetId> = HashSet::with_capacity(input.pet_ids.len());
    for pet_id in &input.pet_ids {
        if pet_id.is_nil() {
            return Err(ValidationError::new("pet_ids", "pet ID cannot be empty"));
        }
        if !seen.insert(*pet_id) {
            return Err(ValidationError::new(
                "pet_ids",
                "duplicate pet IDs are not allowed",
            ));
        }
    }

    if input.store_id.is_nil() {
        return Err(ValidationError::new("store_id", "store ID cannot be empty"));
    }

    Ok(())
}

pub fn validate_create_pet(input: &CreatePetInput) -> Result<(), ValidationError> {
    required("name", &input.name, MAX_NAME_LEN, "pet name")?;

    if input.age < 0 {
        return Err(ValidationError::new("age", "pet age cannot be negative"));
    }
    if input.age > MAX_AGE {
        return Err(ValidationError::new(
            "age",
            format!("pet age cannot exceed {MAX_AGE} years"),
        ));
    }

    required(
        "breeder_name",
        &input.breeder_name,
        MAX_NAME_LEN,
        "breeder name",
    )?;

    if !is_valid_email(&input.breeder_email) {
        return Err(ValidationError::new(
            "breeder_email",
            "breeder email must be a valid email address",
        ));
    }

    if let Some(description) = &input.description
        && description.chars().count() > MAX_DESCRIPTION_LEN
    {
        return Err(ValidationError::new(
            "description",
            format!("description cannot exceed {MAX_DESCRIPTION_LEN} characters"),
        ));
    }

    if let Some(url) = &input.picture_url
        && url.chars().count() > MAX_PICTURE_URL_LEN
    {
        return Err(ValidationError::new(
            "picture_url",
            format!("picture URL cannot exceed {MAX_PICTURE_URL_LEN} characters"),
        ));
    }

    if input.store_id.is_nil() {
        return Err(ValidationError::new("store_id", "store ID cannot be empty"));
    }

    Ok(())
}

pub fn validate_create_store(input: &CreateStoreInput) -> Result<(), ValidationError> {
    required("name", &input.name, MAX_NAME_LEN, "store name")?;
    required("owner_id", &input.owner_id, MAX_OWNER_ID_LEN, "owner ID")
}
