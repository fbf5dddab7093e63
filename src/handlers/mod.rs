pub mod bucket_handlers;
pub mod fruit_handlers;
pub mod health_handlers;
