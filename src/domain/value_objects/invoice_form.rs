//! Validation of the invoice create/edit form.
//!
//! The browser posts every field as a string and may leave any of them out.
//! [`validate_invoice_form`] checks the submission against a declarative
//! schema and either yields a typed [`ValidatedInvoice`] or the per-field
//! messages to show next to each input.

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::value_objects::{
    action_state::InvoiceFieldErrors, enums::invoice_statuses::InvoiceStatus,
};

pub const CUSTOMER_REQUIRED: &str = "Please select a customer.";
pub const AMOUNT_GREATER_THAN_ZERO: &str = "Please enter a value greater than $0.";
pub const AMOUNT_TOO_LARGE: &str = "Please enter a value no greater than $21,474,836.47.";
pub const STATUS_REQUIRED: &str = "Please select the status of the invoice.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceForm {
    pub customer_id: Option<String>,
    pub amount: Option<String>,
    pub status: Option<String>,
}

impl InvoiceForm {
    /// Builds the form from decoded `application/x-www-form-urlencoded` pairs.
    /// A repeated field keeps its first value; unknown fields are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut form = Self::default();

        for (key, value) in pairs {
            let field = match key.as_str() {
                "customerId" => &mut form.customer_id,
                "amount" => &mut form.amount,
                "status" => &mut form.status,
                _ => continue,
            };
            field.get_or_insert(value);
        }

        form
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInvoice {
    pub customer_id: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    amount_in_cents: i32,
}

impl ValidatedInvoice {
    pub fn amount_in_cents(&self) -> i32 {
        self.amount_in_cents
    }
}

// Literal messages must stay in sync with the constants above.
#[derive(Debug, Validate)]
struct InvoiceFormSchema {
    #[validate(length(min = 1, message = "Please select a customer."))]
    customer_id: String,
    #[validate(
        required(message = "Please enter a value greater than $0."),
        range(exclusive_min = 0.0, message = "Please enter a value greater than $0.")
    )]
    amount: Option<f64>,
    #[validate(custom(function = "validate_status"))]
    status: String,
}

fn validate_status(status: &str) -> Result<(), ValidationError> {
    match InvoiceStatus::from_str(status) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("invalid_selection")
            .with_message(Cow::Borrowed(STATUS_REQUIRED))),
    }
}

/// Numeric coercion of the raw amount: blank coerces to zero, anything that
/// is not a finite number becomes `None`.
fn coerce_amount(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Converts major units to the integer cents stored in `invoices.amount`.
pub fn to_minor_units(amount: f64) -> Result<i32, &'static str> {
    let cents = (amount * 100.0).round();
    if cents < 1.0 {
        return Err(AMOUNT_GREATER_THAN_ZERO);
    }
    if cents > f64::from(i32::MAX) {
        return Err(AMOUNT_TOO_LARGE);
    }

    Ok(cents as i32)
}

fn collect_field_errors(report: &ValidationErrors) -> InvoiceFieldErrors {
    let mut errors = InvoiceFieldErrors::default();

    for (field, field_errors) in report.field_errors() {
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|message| message.to_string())
                .unwrap_or_else(|| error.code.to_string());

            match &*field {
                "customer_id" => errors.push_customer_id(message),
                "amount" => errors.push_amount(message),
                "status" => errors.push_status(message),
                _ => {}
            }
        }
    }

    errors
}

pub fn validate_invoice_form(form: &InvoiceForm) -> Result<ValidatedInvoice, InvoiceFieldErrors> {
    let schema = InvoiceFormSchema {
        customer_id: form.customer_id.clone().unwrap_or_default(),
        amount: coerce_amount(form.amount.as_deref()),
        status: form.status.clone().unwrap_or_default(),
    };

    let mut errors = schema
        .validate()
        .err()
        .map(|report| collect_field_errors(&report))
        .unwrap_or_default();

    let amount_in_cents = match schema.amount {
        Some(amount) if errors.amount.is_none() => to_minor_units(amount)
            .map_err(|message| errors.push_amount(message))
            .ok(),
        _ => None,
    };
    let status = InvoiceStatus::from_str(&schema.status);

    match (schema.amount, amount_in_cents, status) {
        (Some(amount), Some(amount_in_cents), Some(status)) if errors.is_empty() => {
            Ok(ValidatedInvoice {
                customer_id: schema.customer_id,
                amount,
                status,
                amount_in_cents,
            })
        }
        _ => Err(errors),
    }
}
