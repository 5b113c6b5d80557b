//! In-memory store adapters backing the `memory` storage backend and the
//! integration tests. Same contracts as the Postgres adapters, with a
//! per-user mutex standing in for the database row lock.

pub mod ledger_store_memory;
pub mod payment_store_memory;
pub mod session_store_memory;
