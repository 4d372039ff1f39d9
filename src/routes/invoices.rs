use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::AppState;
use crate::cache::ViewCache;
use crate::error::AppError;
use crate::invoices::{ActionOutcome, INVOICES_PATH, InvoiceForm};
use crate::models::{Customer, Invoice};

impl IntoResponse for ActionOutcome {
    fn into_response(self) -> Response {
        match self {
            ActionOutcome::Success { redirect: Some(to) } => Redirect::to(&to).into_response(),
            ActionOutcome::Success { redirect: None } => StatusCode::NO_CONTENT.into_response(),
            ActionOutcome::ValidationFailure(state) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(state)).into_response()
            }
            ActionOutcome::PersistenceFailure(state) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(state)).into_response()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceSearch {
    pub query: Option<String>,
    pub page: Option<i64>,
}

impl InvoiceSearch {
    fn query(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }

    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Cache key for the page this search resolves to. Unknown parameters and
    /// out-of-range pages collapse onto the same key.
    fn cache_key(&self) -> String {
        ViewCache::key(
            INVOICES_PATH,
            Some(&format!("query={}&page={}", self.query(), self.page())),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct EditInvoiceView {
    pub invoice: Invoice,
    pub customers: Vec<Customer>,
}

/// Invoice ids are UUIDs. Anything else cannot name an invoice.
fn parse_invoice_id(id: &str) -> Result<String, AppError> {
    Uuid::parse_str(id)
        .map(|id| id.to_string())
        .map_err(|_| AppError::InvoiceNotFound)
}

/// GET /dashboard/invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(search): Query<InvoiceSearch>,
) -> Result<Json<Value>, AppError> {
    let key = search.cache_key();
    if let Some(view) = state.views.get(&key) {
        debug!(key = %key, "serving cached invoice list");
        return Ok(Json(view));
    }

    let generation = state.views.generation(INVOICES_PATH);

    let invoices = state
        .queries
        .fetch_filtered_invoices(search.query(), search.page())
        .await
        .map_err(|e| AppError::database("Failed to fetch invoices.", e))?;

    let view = serde_json::to_value(&invoices)
        .map_err(|e| AppError::database("Failed to fetch invoices.", e.into()))?;
    state.views.insert(key, generation, view.clone());

    Ok(Json(view))
}

/// POST /dashboard/invoices
pub async fn create_invoice(State(state): State<AppState>, Form(form): Form<InvoiceForm>) -> ActionOutcome {
    state.actions.create(&form).await
}

/// GET /dashboard/invoices/:id/edit
pub async fn edit_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EditInvoiceView>, AppError> {
    let id = parse_invoice_id(&id)?;

    let (invoice, customers) = tokio::join!(
        state.queries.fetch_invoice_by_id(&id),
        state.queries.fetch_customers(),
    );

    // A missing invoice wins over any other failure
    let invoice = match invoice {
        Ok(Some(invoice)) => invoice,
        Ok(None) => return Err(AppError::InvoiceNotFound),
        Err(e) => return Err(AppError::database("Failed to fetch invoice.", e)),
    };
    let customers = customers.map_err(|e| AppError::database("Failed to fetch all customers.", e))?;

    Ok(Json(EditInvoiceView { invoice, customers }))
}

/// POST /dashboard/invoices/:id/edit
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<InvoiceForm>,
) -> Result<ActionOutcome, AppError> {
    let id = parse_invoice_id(&id)?;
    Ok(state.actions.update(&id, &form).await)
}

/// POST /dashboard/invoices/:id/delete
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ActionOutcome, AppError> {
    let id = parse_invoice_id(&id)?;
    Ok(state.actions.delete(&id).await)
}
