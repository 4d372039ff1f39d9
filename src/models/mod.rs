mod customer;
mod dashboard;
mod invoice;

pub use customer::Customer;
pub use dashboard::{CardData, LatestInvoice, Revenue};
pub use invoice::{Invoice, InvoiceRow, InvoiceStatus, NewInvoice};
