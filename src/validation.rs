use rocket::serde::json::Json;
use tracing::instrument;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";

#[derive(Debug)]
pub struct ValidationErrorWrapper(pub ValidationErrors);

impl From<ValidationErrorWrapper> for AppError {
    #[instrument]
    fn from(wrapper: ValidationErrorWrapper) -> Self {
        let errors = wrapper.0.field_errors();

        // Report the first failing field by name so the message is stable.
        let mut fields: Vec<_> = errors.keys().collect();
        fields.sort();

        let message = fields
            .first()
            .and_then(|field| errors.get(*field))
            .and_then(|field_errors| field_errors.first())
            .and_then(|error| error.message.clone())
            .map(|m| m.to_string())
            .unwrap_or_else(|| MISSING_FIELDS_MESSAGE.to_string());

        AppError::Validation(message)
    }
}

/// Runs the `validator` rules of a JSON body and unwraps it.
pub trait JsonValidateExt<T> {
    fn validate_body(self) -> Result<T, AppError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validate_body(self) -> Result<T, AppError> {
        let inner = self.into_inner();
        inner.validate().map_err(ValidationErrorWrapper)?;
        Ok(inner)
    }
}

/// Rejects blank strings, which serde happily fills in from `#[serde(default)]`.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new("blank");
        error.message = Some(MISSING_FIELDS_MESSAGE.into());
        return Err(error);
    }
    Ok(())
}
