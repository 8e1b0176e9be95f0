pub mod annual;
pub mod projection;
