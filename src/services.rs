pub mod auth;
pub mod authorization;
pub mod campus_service;
pub use campus_service::CampusService;
pub mod invoice_service;
pub use invoice_service::InvoiceService;
pub mod workflow_service;
pub use workflow_service::WorkflowService;

#[cfg(test)]
pub mod test_support;
