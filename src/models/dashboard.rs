use serde::Serialize;

/// Totals shown on the dashboard overview. Amounts are in minor units.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub number_of_invoices: i64,
    pub number_of_customers: i64,
    pub total_paid_invoices: i64,
    pub total_pending_invoices: i64,
}

/// Revenue booked in one month, in minor units.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Revenue {
    pub month: String,
    pub revenue: i64,
}

/// One of the most recent invoices, joined with its customer.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestInvoice {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub amount: i64,
}
