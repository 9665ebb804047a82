//! Reading oracle output and preparing text for it.

pub mod repair;
pub mod response;
pub mod values;

pub use repair::{repair_broken_lines, RepairConfig};
pub use response::{parse_response, strip_code_fence, ResponseError};
pub use values::{amount_of, parse_amount, parse_scaled, scaled_amount_of, Scale};
