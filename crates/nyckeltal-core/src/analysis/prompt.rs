/// System instructions for one document: the extraction instructions, the
/// metric dictionary and, when known, the reporting year.
pub fn system_prompt(instructions: &str, metrics_json: &str, year: Option<i32>) -> String {
    let mut prompt = format!(
        "{}\n-------------\nFöljande nyckeltal ska extraheras:\n-------------\n{}\n",
        instructions.trim_end(),
        metrics_json
    );
    if let Some(year) = year {
        prompt.push_str(&format!(
            "-------------\nRapportens huvudsakliga räkenskapsår är {year}. \
             Använd {year} som år för värden där inget annat år anges.\n"
        ));
    }
    prompt
}

/// User message wrapping one segment of report text.
pub fn request_text(segment: &str) -> String {
    format!(
        "Analysera följande årsredovisningsutdrag:\n----------------\n{segment}\n----------------\n\
         Returnera endast en giltig JSON-struktur enligt instruktionerna, ingen annan text.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_hint_only_when_known() {
        let with = system_prompt("Instruktion", "[]", Some(2023));
        let without = system_prompt("Instruktion", "[]", None);
        assert!(with.contains("räkenskapsår är 2023"));
        assert!(!without.contains("räkenskapsår"));
        assert!(without.starts_with("Instruktion\n"));
        assert!(without.contains("[]"));
    }

    #[test]
    fn test_request_embeds_segment() {
        let req = request_text("[Sida 3]\nFondförmögenhet 1 234");
        assert!(req.contains("----------------\n[Sida 3]\nFondförmögenhet 1 234\n----------------"));
    }
}
