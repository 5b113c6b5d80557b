pub mod credits;
pub mod sessions;
