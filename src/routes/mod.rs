mod dashboard;
mod invoices;

use std::sync::Arc;

use axum::{Json, Router, middleware, routing::get, routing::post};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AccessGate};
use crate::cache::ViewCache;
use crate::db::InvoiceQueries;
use crate::invoices::InvoiceActions;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub actions: InvoiceActions,
    pub queries: Arc<dyn InvoiceQueries>,
    pub views: ViewCache,
}

pub fn create_router(state: AppState, gate: Option<AccessGate>) -> Router {
    let router = Router::new()
        .route("/login", get(login))
        .route("/dashboard", get(dashboard::overview))
        .route(
            "/dashboard/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/dashboard/invoices/:id/edit",
            get(invoices::edit_invoice).post(invoices::update_invoice),
        )
        .route("/dashboard/invoices/:id/delete", post(invoices::delete_invoice))
        .with_state(state);

    let router = match gate {
        Some(gate) => router.layer(middleware::from_fn_with_state(gate, auth::require_session)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

// Credential checks belong to the identity provider; this only marks the page.
async fn login() -> Json<Value> {
    Json(json!({ "message": "Sign in to continue." }))
}
