pub mod generate;
pub mod scan;

pub use generate::{GenerateOptions, GenerateReport, generate};
pub use scan::scan;
