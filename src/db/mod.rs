#[cfg(test)]
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::models::{
    CardData, Customer, Invoice, InvoiceRow, InvoiceStatus, LatestInvoice, NewInvoice, Revenue,
};

/// Rows per page of the invoice list
pub const ITEMS_PER_PAGE: i64 = 6;

/// Invoices shown in the overview's latest list
pub const LATEST_INVOICES: i64 = 5;

/// Columns written by the update path. `id` and `date` never change.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceChanges {
    pub customer_id: String,
    pub amount: i64,
    pub status: InvoiceStatus,
}

/// Write capability consumed by the invoice actions. Each call is one statement.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<()>;

    async fn update_invoice(&self, id: &str, changes: &InvoiceChanges) -> Result<()>;

    /// Deleting an id that does not exist is not an error.
    async fn delete_invoice(&self, id: &str) -> Result<()>;
}

/// Read side used by the dashboard views.
#[async_trait]
pub trait InvoiceQueries: Send + Sync {
    async fn fetch_invoice_by_id(&self, id: &str) -> Result<Option<Invoice>>;

    async fn fetch_customers(&self) -> Result<Vec<Customer>>;

    /// One page of invoices whose customer, amount, date or status matches `query`.
    async fn fetch_filtered_invoices(&self, query: &str, page: i64) -> Result<Vec<InvoiceRow>>;

    async fn fetch_card_data(&self) -> Result<CardData>;

    /// Monthly revenue, in table order.
    async fn fetch_revenue(&self) -> Result<Vec<Revenue>>;

    /// The most recent invoices by date, joined with their customer.
    async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>>;
}

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InvoiceStore for Database {
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (customer_id, amount, status, date)
            VALUES ($1::uuid, $2, $3, $4)
            "#,
        )
        .bind(&invoice.customer_id)
        .bind(invoice.amount)
        .bind(invoice.status.as_str())
        .bind(invoice.date)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    async fn update_invoice(&self, id: &str, changes: &InvoiceChanges) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE invoices
            SET customer_id = $1::uuid, amount = $2, status = $3
            WHERE id = $4::uuid
            "#,
        )
        .bind(&changes.customer_id)
        .bind(changes.amount)
        .bind(changes.status.as_str())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    async fn delete_invoice(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM invoices WHERE id = $1::uuid")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl InvoiceQueries for Database {
    async fn fetch_invoice_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT
                id::text AS id,
                customer_id::text AS customer_id,
                amount,
                status,
                date
            FROM invoices
            WHERE id = $1::uuid
            "#,
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(invoice)
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT id::text AS id, name, email, image_url FROM customers ORDER BY name ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(customers)
    }

    async fn fetch_filtered_invoices(&self, query: &str, page: i64) -> Result<Vec<InvoiceRow>> {
        let offset = (page.max(1) - 1) * ITEMS_PER_PAGE;

        let invoices = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT
                invoices.id::text AS id,
                invoices.customer_id::text AS customer_id,
                customers.name,
                customers.email,
                invoices.amount,
                invoices.status,
                invoices.date
            FROM invoices
            JOIN customers ON invoices.customer_id = customers.id
            WHERE
                customers.name ILIKE $1 OR
                customers.email ILIKE $1 OR
                invoices.amount::text ILIKE $1 OR
                invoices.date::text ILIKE $1 OR
                invoices.status ILIKE $1
            ORDER BY invoices.date DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(format!("%{query}%"))
        .bind(ITEMS_PER_PAGE)
        .bind(offset)
        .fetch_all(self.get_pool())
        .await?;

        Ok(invoices)
    }

    async fn fetch_card_data(&self) -> Result<CardData> {
        let invoice_count = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM invoices")
            .fetch_one(self.get_pool());
        let customer_count = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM customers")
            .fetch_one(self.get_pool());
        let totals = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END), 0)::bigint,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0)::bigint
            FROM invoices
            "#,
        )
        .fetch_one(self.get_pool());

        // Independent reads, run together
        let ((number_of_invoices,), (number_of_customers,), (total_paid_invoices, total_pending_invoices)) =
            tokio::try_join!(invoice_count, customer_count, totals)?;

        Ok(CardData {
            number_of_invoices,
            number_of_customers,
            total_paid_invoices,
            total_pending_invoices,
        })
    }

    async fn fetch_revenue(&self) -> Result<Vec<Revenue>> {
        let revenue = sqlx::query_as::<_, Revenue>("SELECT month::text AS month, revenue FROM revenue")
            .fetch_all(self.get_pool())
            .await?;

        Ok(revenue)
    }

    async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>> {
        let invoices = sqlx::query_as::<_, LatestInvoice>(
            r#"
            SELECT
                invoices.id::text AS id,
                customers.name,
                customers.email,
                customers.image_url,
                invoices.amount
            FROM invoices
            JOIN customers ON invoices.customer_id = customers.id
            ORDER BY invoices.date DESC
            LIMIT $1
            "#,
        )
        .bind(LATEST_INVOICES)
        .fetch_all(self.get_pool())
        .await?;

        Ok(invoices)
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;

    if config.run_migrations {
        sqlx::migrate!().run(db.get_pool()).await?;
        info!("database migrations applied");
    }

    Ok(db)
}
