pub mod inputs;
pub mod validation;
