// keep public for OpenAPI docs
pub mod credits;
pub mod health;
pub mod interviews;
pub mod webhooks;
