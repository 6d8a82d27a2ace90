pub mod metadata;
pub mod parse;
pub mod postprocess;
pub mod validate;

pub use metadata::{Metadata, NOT_SPECIFIED, extract_metadata};
pub use parse::{ParsedResponse, parse_response};
pub use postprocess::post_process_response;
pub use validate::{ValidationReport, validate_response};
