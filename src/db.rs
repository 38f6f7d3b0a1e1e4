pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod campus_repo;
pub use campus_repo::CampusRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;

pub mod store;
pub use store::{InvoiceScope, WorkflowStore, WorkflowTx};
pub mod pg_store;
pub use pg_store::PgWorkflowStore;

#[cfg(test)]
pub mod memory_store;
