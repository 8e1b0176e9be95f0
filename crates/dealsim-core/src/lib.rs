pub mod analysis;
pub mod deal;
pub mod error;
pub mod financing;
pub mod proforma;
pub mod returns;
pub mod scenarios;
pub mod settings;
pub mod storage;
pub mod time_value;
pub mod types;
pub mod waterfall;

pub use error::DealSimError;
pub use types::*;

/// Standard result type for all dealsim operations
pub type DealSimResult<T> = Result<T, DealSimError>;
