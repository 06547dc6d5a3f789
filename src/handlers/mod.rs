pub mod gallery_handlers;
pub mod health_handlers;
pub mod metrics_handlers;
pub mod page;
