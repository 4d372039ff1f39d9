use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::schema::{FieldErrors, InvoiceForm};
use crate::cache::Revalidate;
use crate::db::{InvoiceChanges, InvoiceStore};
use crate::models::NewInvoice;

pub const INVOICES_PATH: &str = "/dashboard/invoices";
pub const DASHBOARD_PATH: &str = "/dashboard";

const CREATE_MISSING_FIELDS: &str = "Missing Fields. Failed to Create Invoice.";
const UPDATE_MISSING_FIELDS: &str = "Missing Fields. Failed to Update Invoice.";
pub const CREATE_FAILED: &str = "Database Error: Failed to Create Invoice.";
pub const UPDATE_FAILED: &str = "Database Error: Failed to Update Invoice.";
pub const DELETE_FAILED: &str = "Database Error: Failed to Delete Invoice.";

/// What the form re-renders with after a failed submission.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct FormState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    pub message: Option<String>,
}

impl FormState {
    fn rejected(errors: FieldErrors, message: &str) -> Self {
        Self {
            errors: Some(errors),
            message: Some(message.to_string()),
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            errors: None,
            message: Some(message.to_string()),
        }
    }
}

/// Result of one invoice action. The caller decides how to act on success.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The write committed. `redirect` names the view to go to, if any.
    Success { redirect: Option<String> },
    /// At least one field failed validation; nothing was written.
    ValidationFailure(FormState),
    /// The write statement failed; nothing was invalidated.
    PersistenceFailure(FormState),
}

/// Create, update and delete for invoices.
///
/// Each call validates, issues at most one write, then marks the invoice views
/// stale. Every failure comes back as an `ActionOutcome`.
#[derive(Clone)]
pub struct InvoiceActions {
    store: Arc<dyn InvoiceStore>,
    views: Arc<dyn Revalidate>,
}

impl InvoiceActions {
    pub fn new(store: Arc<dyn InvoiceStore>, views: Arc<dyn Revalidate>) -> Self {
        Self { store, views }
    }

    pub async fn create(&self, form: &InvoiceForm) -> ActionOutcome {
        let validated = match form.validate() {
            Ok(validated) => validated,
            Err(errors) => {
                warn!(?errors, "invoice create rejected");
                return ActionOutcome::ValidationFailure(FormState::rejected(errors, CREATE_MISSING_FIELDS));
            }
        };

        let invoice = NewInvoice {
            amount: validated.amount_in_cents(),
            customer_id: validated.customer_id,
            status: validated.status,
            date: chrono::Utc::now().date_naive(),
        };

        if let Err(e) = self.store.insert_invoice(&invoice).await {
            error!("Failed to create invoice: {:?}", e);
            return ActionOutcome::PersistenceFailure(FormState::failed(CREATE_FAILED));
        }

        info!(customer_id = %invoice.customer_id, amount = invoice.amount, "invoice created");
        self.committed(Some(INVOICES_PATH))
    }

    /// `id` comes from the route, never from the form body.
    pub async fn update(&self, id: &str, form: &InvoiceForm) -> ActionOutcome {
        let validated = match form.validate() {
            Ok(validated) => validated,
            Err(errors) => {
                warn!(id, ?errors, "invoice update rejected");
                return ActionOutcome::ValidationFailure(FormState::rejected(errors, UPDATE_MISSING_FIELDS));
            }
        };

        let changes = InvoiceChanges {
            amount: validated.amount_in_cents(),
            customer_id: validated.customer_id,
            status: validated.status,
        };

        if let Err(e) = self.store.update_invoice(id, &changes).await {
            error!("Failed to update invoice {}: {:?}", id, e);
            return ActionOutcome::PersistenceFailure(FormState::failed(UPDATE_FAILED));
        }

        info!(id, "invoice updated");
        self.committed(Some(INVOICES_PATH))
    }

    /// Leaves the caller on the current view.
    pub async fn delete(&self, id: &str) -> ActionOutcome {
        if let Err(e) = self.store.delete_invoice(id).await {
            error!("Failed to delete invoice {}: {:?}", id, e);
            return ActionOutcome::PersistenceFailure(FormState::failed(DELETE_FAILED));
        }

        info!(id, "invoice deleted");
        self.committed(None)
    }

    fn committed(&self, redirect: Option<&str>) -> ActionOutcome {
        self.views.revalidate_path(INVOICES_PATH);
        // Card totals are derived from the same rows
        self.views.revalidate_path(DASHBOARD_PATH);

        ActionOutcome::Success {
            redirect: redirect.map(str::to_string),
        }
    }
}
