pub mod affinity;
pub mod coefficients;
pub mod config;
pub mod design_matrix;
pub mod error;
pub mod estimator;
pub mod history;
pub mod long_format;
pub mod render;
pub mod round_fetch;
pub mod round_record;

pub use error::DatasetError;
