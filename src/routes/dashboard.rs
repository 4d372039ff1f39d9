use axum::{Json, extract::State};
use serde::Serialize;
use serde_json::Value;

use super::AppState;
use crate::error::AppError;
use crate::invoices::DASHBOARD_PATH;
use crate::models::{CardData, LatestInvoice, Revenue};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverviewView {
    cards: CardData,
    revenue: Vec<Revenue>,
    latest_invoices: Vec<LatestInvoice>,
}

/// GET /dashboard
pub async fn overview(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    if let Some(view) = state.views.get(DASHBOARD_PATH) {
        return Ok(Json(view));
    }

    let generation = state.views.generation(DASHBOARD_PATH);

    let (cards, revenue, latest_invoices) = tokio::try_join!(
        state.queries.fetch_card_data(),
        state.queries.fetch_revenue(),
        state.queries.fetch_latest_invoices(),
    )
    .map_err(|e| AppError::database("Failed to fetch dashboard data.", e))?;

    let view = serde_json::to_value(OverviewView {
        cards,
        revenue,
        latest_invoices,
    })
    .map_err(|e| AppError::database("Failed to fetch dashboard data.", e.into()))?;
    state
        .views
        .insert(DASHBOARD_PATH.to_string(), generation, view.clone());

    Ok(Json(view))
}
