// Background jobs
pub mod notification_dispatcher;
