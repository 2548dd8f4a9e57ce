pub mod access_policy;
pub mod appointment_service;
pub mod auth_service;
pub mod case_service;
pub mod constitution_service;
pub mod document_service;
pub mod mailer;
pub mod notification_service;
pub mod populate;

pub use notification_service::Notifier;
