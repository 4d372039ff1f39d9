use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::InvoiceStatus;

pub const CUSTOMER_MESSAGE: &str = "Please select a customer";
pub const AMOUNT_MESSAGE: &str = "Please enter an amount greater than $0.";
pub const AMOUNT_NAN_MESSAGE: &str = "Expected number, received nan";
pub const AMOUNT_TOO_LARGE_MESSAGE: &str = "Please enter a smaller amount.";
pub const STATUS_MESSAGE: &str = "Please select a status";

/// Amount as submitted: a form field is always text, a JSON body may carry a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn as_text(&self) -> String {
        match self {
            RawAmount::Number(n) => n.to_string(),
            RawAmount::Text(s) => s.clone(),
        }
    }
}

/// Invoice form submission before validation. Every field may be missing.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceForm {
    pub customer_id: Option<String>,
    pub amount: Option<RawAmount>,
    pub status: Option<String>,
}

/// A submission that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInvoice {
    pub customer_id: String,
    /// Major units, always finite and greater than zero.
    pub amount: f64,
    pub status: InvoiceStatus,
}

impl ValidatedInvoice {
    /// Amount in minor units (cents).
    pub fn amount_in_cents(&self) -> i64 {
        to_minor_units(self.amount)
    }
}

/// Field name to the ordered list of messages for that field.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn push(&mut self, field: &str, message: String) {
        self.0.entry(field.to_string()).or_default().push(message);
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut formatted = FieldErrors::default();

        for (field, field_errors) in errors.field_errors() {
            let name = field.to_string();
            let key = match name.as_str() {
                "customer_id" => "customerId",
                other => other,
            };

            for error in field_errors.iter() {
                let message = match error.message {
                    Some(ref msg) => msg.to_string(),
                    None => "Invalid value".to_string(),
                };
                formatted.push(key, message);
            }
        }

        formatted
    }
}

// Present-or-empty view of the form that the rules run against.
#[derive(Debug, Validate)]
struct InvoiceFields {
    #[validate(custom(function = "validate_customer_id"))]
    customer_id: String,

    #[validate(custom(function = "validate_amount"))]
    amount: String,
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn validate_customer_id(customer_id: &str) -> Result<(), ValidationError> {
    if customer_id.trim().is_empty() {
        return Err(rule_error("invalid_type_error", CUSTOMER_MESSAGE));
    }
    Ok(())
}

fn validate_amount(amount: &str) -> Result<(), ValidationError> {
    let value = coerce_amount(amount);

    if !value.is_finite() {
        return Err(rule_error("invalid_type", AMOUNT_NAN_MESSAGE));
    }
    if value <= 0.0 {
        return Err(rule_error("too_small", AMOUNT_MESSAGE));
    }
    // Cents must fit the BIGINT column
    if (value * 100.0).round() >= i64::MAX as f64 {
        return Err(rule_error("too_big", AMOUNT_TOO_LARGE_MESSAGE));
    }
    Ok(())
}

/// Numeric coercion of a submitted amount. Blank input counts as zero, anything
/// that does not parse becomes NaN.
pub fn coerce_amount(raw: &str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    raw.parse::<f64>().unwrap_or(f64::NAN)
}

/// Major units to minor units, rounded to the nearest cent.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

impl InvoiceForm {
    /// Run every rule and collect all field errors instead of stopping at the first.
    pub fn validate(&self) -> Result<ValidatedInvoice, FieldErrors> {
        let fields = InvoiceFields {
            customer_id: self.customer_id.as_deref().unwrap_or_default().trim().to_string(),
            amount: self.amount.as_ref().map(RawAmount::as_text).unwrap_or_default(),
        };

        let mut errors = match Validate::validate(&fields) {
            Ok(()) => FieldErrors::default(),
            Err(errors) => FieldErrors::from(&errors),
        };

        let status = self.status.as_deref().unwrap_or_default().parse::<InvoiceStatus>();
        if status.is_err() {
            errors.push("status", STATUS_MESSAGE.to_string());
        }

        match status {
            Ok(status) if errors.0.is_empty() => Ok(ValidatedInvoice {
                customer_id: fields.customer_id,
                amount: coerce_amount(&fields.amount),
                status,
            }),
            _ => Err(errors),
        }
    }
}
