use nyckeltal_core::error::NyckeltalError;
use std::path::Path;

use super::config_or_default;
use crate::output;

pub fn show(path: Option<&Path>) -> Result<(), NyckeltalError> {
    let config = config_or_default(path)?;
    output::json::print(&config)
}
