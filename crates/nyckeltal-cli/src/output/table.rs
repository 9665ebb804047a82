use nyckeltal_core::analysis::{DocumentOutcome, RunOutcome};
use nyckeltal_core::consolidate::{Dataset, Row};
use nyckeltal_core::metrics::schema::MetricDictionary;

const UNGROUPED: &str = "Övrigt";

pub fn print_documents(outcome: &RunOutcome) {
    println!("=== Dokument ===\n");
    for doc in &outcome.documents {
        match doc {
            DocumentOutcome::Analyzed(r) => {
                let year = r.year.map(|y| y.to_string()).unwrap_or_else(|| "?".into());
                println!(
                    "  {}  år {}, förskjutning {}, {} segment ({} utan svar), {} konflikt(er), {} sammanslagna",
                    r.name, year, r.offset, r.segments, r.skipped_segments, r.conflicts, r.merged
                );
            }
            DocumentOutcome::SkippedEmpty { name } => println!("  {name}  hoppades över: ingen text"),
            DocumentOutcome::SkippedUnreadable { name, reason } => {
                println!("  {name}  hoppades över: {reason}")
            }
        }
    }
    println!();
}

/// Rows per entity, grouped under the metric groups in dictionary order;
/// metrics the dictionary does not know go last.
pub fn print_dataset(dataset: &Dataset, metrics: &MetricDictionary) {
    let rows = dataset.rows();
    let mut groups: Vec<&str> = Vec::new();
    for metric in metrics.iter() {
        if !groups.contains(&metric.group.as_str()) {
            groups.push(&metric.group);
        }
    }
    groups.push(UNGROUPED);

    for entity in dataset.entities.keys() {
        println!("=== {entity} ===\n");
        let entity_rows: Vec<(&str, &Row)> = rows
            .iter()
            .filter(|r| &r.entity == entity)
            .map(|r| (metrics.group_of(&r.metric).unwrap_or(UNGROUPED), r))
            .collect();
        let width = entity_rows
            .iter()
            .map(|(_, r)| r.metric.chars().count())
            .max()
            .unwrap_or(10);

        for group in &groups {
            let in_group: Vec<&Row> = entity_rows
                .iter()
                .filter(|(g, _)| g == group)
                .map(|(_, r)| *r)
                .collect();
            if in_group.is_empty() {
                continue;
            }
            println!("  {group}");
            for row in in_group {
                let value = match &row.value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                println!(
                    "    {}  {:<width$}  {:>14}  {}",
                    row.year,
                    row.metric,
                    value,
                    row.source,
                    width = width
                );
            }
            println!();
        }
    }

    let conflicts = dataset.conflict_count();
    if conflicts > 0 {
        println!("  {conflicts} nyckeltal har fler än ett värde (se rader med samma år och namn)\n");
    }
}
