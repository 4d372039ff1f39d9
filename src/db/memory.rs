//! In-memory store for tests. Implements the same traits as `Database`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use uuid::Uuid;

use super::{ITEMS_PER_PAGE, InvoiceChanges, InvoiceQueries, InvoiceStore, LATEST_INVOICES};
use crate::models::{
    CardData, Customer, Invoice, InvoiceRow, InvoiceStatus, LatestInvoice, NewInvoice, Revenue,
};

#[derive(Default)]
pub struct MemoryStore {
    invoices: RwLock<Vec<Invoice>>,
    customers: RwLock<Vec<Customer>>,
    revenue: RwLock<Vec<Revenue>>,
    write_attempts: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: Vec<Customer>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.customers.write() {
            *guard = customers;
        }
        store
    }

    /// Make every subsequent write fail, as a lost connection would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write statements issued, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        self.invoices.read().map(|i| i.clone()).unwrap_or_default()
    }

    /// Insert a row directly, bypassing the write counter.
    pub fn seed(&self, invoice: Invoice) {
        if let Ok(mut guard) = self.invoices.write() {
            guard.push(invoice);
        }
    }

    pub fn seed_revenue(&self, month: &str, revenue: i64) {
        if let Ok(mut guard) = self.revenue.write() {
            guard.push(Revenue {
                month: month.to_string(),
                revenue,
            });
        }
    }

    fn begin_write(&self) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<()> {
        self.begin_write()?;

        let mut invoices = self
            .invoices
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        invoices.push(Invoice {
            id: Uuid::new_v4().to_string(),
            customer_id: invoice.customer_id.clone(),
            amount: invoice.amount,
            status: invoice.status,
            date: invoice.date,
        });

        Ok(())
    }

    async fn update_invoice(&self, id: &str, changes: &InvoiceChanges) -> Result<()> {
        self.begin_write()?;

        let mut invoices = self
            .invoices
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if let Some(invoice) = invoices.iter_mut().find(|i| i.id == id) {
            invoice.customer_id = changes.customer_id.clone();
            invoice.amount = changes.amount;
            invoice.status = changes.status;
        }

        Ok(())
    }

    async fn delete_invoice(&self, id: &str) -> Result<()> {
        self.begin_write()?;

        let mut invoices = self
            .invoices
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        invoices.retain(|i| i.id != id);

        Ok(())
    }
}

#[async_trait]
impl InvoiceQueries for MemoryStore {
    async fn fetch_invoice_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let invoices = self
            .invoices
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>> {
        let customers = self
            .customers
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut customers = customers.clone();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn fetch_filtered_invoices(&self, query: &str, page: i64) -> Result<Vec<InvoiceRow>> {
        let invoices = self
            .invoices
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let customers = self
            .customers
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let needle = query.to_lowercase();
        let mut rows: Vec<InvoiceRow> = invoices
            .iter()
            .filter_map(|invoice| {
                let customer = customers.iter().find(|c| c.id == invoice.customer_id)?;
                Some(InvoiceRow {
                    id: invoice.id.clone(),
                    customer_id: invoice.customer_id.clone(),
                    name: customer.name.clone(),
                    email: customer.email.clone(),
                    amount: invoice.amount,
                    status: invoice.status,
                    date: invoice.date,
                })
            })
            .filter(|row| {
                [
                    row.name.to_lowercase(),
                    row.email.to_lowercase(),
                    row.amount.to_string(),
                    row.date.to_string(),
                    row.status.to_string(),
                ]
                .iter()
                .any(|field| field.contains(&needle))
            })
            .collect();

        rows.sort_by(|a, b| b.date.cmp(&a.date));

        let offset = ((page.max(1) - 1) * ITEMS_PER_PAGE) as usize;
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(ITEMS_PER_PAGE as usize)
            .collect())
    }

    async fn fetch_card_data(&self) -> Result<CardData> {
        let invoices = self
            .invoices
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let customers = self
            .customers
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let total = |status: InvoiceStatus| {
            invoices
                .iter()
                .filter(|i| i.status == status)
                .map(|i| i.amount)
                .sum::<i64>()
        };

        Ok(CardData {
            number_of_invoices: invoices.len() as i64,
            number_of_customers: customers.len() as i64,
            total_paid_invoices: total(InvoiceStatus::Paid),
            total_pending_invoices: total(InvoiceStatus::Pending),
        })
    }

    async fn fetch_revenue(&self) -> Result<Vec<Revenue>> {
        let revenue = self
            .revenue
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(revenue.clone())
    }

    async fn fetch_latest_invoices(&self) -> Result<Vec<LatestInvoice>> {
        let invoices = self
            .invoices
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        let customers = self
            .customers
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut recent: Vec<&Invoice> = invoices.iter().collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(recent
            .into_iter()
            .filter_map(|invoice| {
                let customer = customers.iter().find(|c| c.id == invoice.customer_id)?;
                Some(LatestInvoice {
                    id: invoice.id.clone(),
                    name: customer.name.clone(),
                    email: customer.email.clone(),
                    image_url: customer.image_url.clone(),
                    amount: invoice.amount,
                })
            })
            .take(LATEST_INVOICES as usize)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            image_url: String::new(),
        }
    }

    fn invoice(id: &str, customer_id: &str, amount: i64, status: InvoiceStatus, day: u32) -> Invoice {
        Invoice {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            amount,
            status,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn filtered_invoices_match_customer_and_status() {
        let store = MemoryStore::with_customers(vec![customer("c1", "Delba"), customer("c2", "Lee")]);
        store.seed(invoice("i1", "c1", 1000, InvoiceStatus::Paid, 1));
        store.seed(invoice("i2", "c2", 2500, InvoiceStatus::Pending, 2));

        let rows = store.fetch_filtered_invoices("delba", 1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "i1");

        let rows = store.fetch_filtered_invoices("pend", 1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Lee");

        let rows = store.fetch_filtered_invoices("", 1).await.unwrap();
        assert_eq!(rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["i2", "i1"]);
    }

    #[tokio::test]
    async fn filtered_invoices_are_paged() {
        let store = MemoryStore::with_customers(vec![customer("c1", "Delba")]);
        for day in 1..=8 {
            store.seed(invoice(&format!("i{day}"), "c1", 100, InvoiceStatus::Paid, day));
        }

        assert_eq!(store.fetch_filtered_invoices("", 1).await.unwrap().len(), 6);
        assert_eq!(store.fetch_filtered_invoices("", 2).await.unwrap().len(), 2);
        assert_eq!(store.fetch_filtered_invoices("", 0).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn card_data_sums_by_status() {
        let store = MemoryStore::with_customers(vec![customer("c1", "Delba")]);
        store.seed(invoice("i1", "c1", 1000, InvoiceStatus::Paid, 1));
        store.seed(invoice("i2", "c1", 250, InvoiceStatus::Pending, 2));
        store.seed(invoice("i3", "c1", 750, InvoiceStatus::Pending, 3));

        let cards = store.fetch_card_data().await.unwrap();
        assert_eq!(
            cards,
            CardData {
                number_of_invoices: 3,
                number_of_customers: 1,
                total_paid_invoices: 1000,
                total_pending_invoices: 1000,
            }
        );
    }

    #[tokio::test]
    async fn latest_invoices_are_the_five_newest() {
        let store = MemoryStore::with_customers(vec![customer("c1", "Delba")]);
        for day in 1..=7 {
            store.seed(invoice(&format!("i{day}"), "c1", 100 * day as i64, InvoiceStatus::Paid, day));
        }

        let latest = store.fetch_latest_invoices().await.unwrap();
        assert_eq!(
            latest.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            ["i7", "i6", "i5", "i4", "i3"]
        );
        assert_eq!(latest[0].name, "Delba");
        assert_eq!(latest[0].amount, 700);
    }

    #[tokio::test]
    async fn revenue_keeps_seeded_order() {
        let store = MemoryStore::new();
        store.seed_revenue("Jan", 2000);
        store.seed_revenue("Feb", 1800);

        let revenue = store.fetch_revenue().await.unwrap();
        assert_eq!(revenue.len(), 2);
        assert_eq!(revenue[0].month, "Jan");
        assert_eq!(revenue[1].revenue, 1800);
    }

    #[tokio::test]
    async fn failing_writes_are_counted() {
        let store = MemoryStore::new();
        store.fail_writes(true);

        assert!(store.delete_invoice("missing").await.is_err());
        assert_eq!(store.write_attempts(), 1);
    }
}
