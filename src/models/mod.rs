pub mod enums;
pub mod health_parameter;
pub mod trend;

pub use enums::*;
pub use health_parameter::*;
pub use trend::*;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
