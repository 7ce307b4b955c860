pub mod dose_logs;
pub mod health;
pub mod medications;
pub mod notes;

pub(crate) mod validate;
