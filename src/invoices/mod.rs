mod actions;
mod schema;

pub use actions::{ActionOutcome, DASHBOARD_PATH, INVOICES_PATH, InvoiceActions};
pub use schema::InvoiceForm;
