pub mod campus;
pub mod invoices;
