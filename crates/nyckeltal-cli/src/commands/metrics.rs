use nyckeltal_core::error::NyckeltalError;
use nyckeltal_core::metrics::load_metrics;
use std::path::Path;

use super::metrics_or_builtin;

pub fn list(path: Option<&Path>) -> Result<(), NyckeltalError> {
    let dict = metrics_or_builtin(path)?;

    let mut groups: Vec<&str> = Vec::new();
    for metric in dict.iter() {
        if !groups.contains(&metric.group.as_str()) {
            groups.push(&metric.group);
        }
    }

    for group in groups {
        println!("{group}");
        for metric in dict.iter().filter(|m| m.group == group) {
            if metric.aliases.is_empty() {
                println!("  {}", metric.name);
            } else {
                println!("  {:<28} (även: {})", metric.name, metric.aliases.join(", "));
            }
        }
        println!();
    }
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), NyckeltalError> {
    let dict = load_metrics(file)?;
    let mut groups: Vec<&str> = dict.iter().map(|m| m.group.as_str()).collect();
    groups.sort_unstable();
    groups.dedup();
    println!(
        "Valid metric dictionary: {} metric(s) in {} group(s)",
        dict.len(),
        groups.len()
    );
    Ok(())
}
