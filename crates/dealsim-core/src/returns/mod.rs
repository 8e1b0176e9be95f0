pub mod alerts;
pub mod exit;
pub mod metrics;
