pub mod memory;
pub mod postgres_sqlx;
