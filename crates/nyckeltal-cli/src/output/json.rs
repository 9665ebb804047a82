use nyckeltal_core::error::NyckeltalError;
use serde::Serialize;
use std::path::Path;

pub fn print<T: Serialize>(value: &T) -> Result<(), NyckeltalError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Pretty UTF-8 JSON; non-ASCII is written literally.
pub fn write<T: Serialize>(value: &T, path: &Path) -> Result<(), NyckeltalError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
