use crate::extraction::Page;

/// Render pages as one text with a `[<marker> <label>]` line before each page.
///
/// The label is the printed page number (physical number minus `offset`).
/// Pages in front of printed page 1 get lowercase Roman numerals, the usual
/// numbering for a report's preface.
pub fn label_pages(pages: &[Page], offset: i32, marker: &str) -> String {
    let offset = offset.max(0) as usize;
    pages
        .iter()
        .map(|page| format!("[{} {}]\n{}", marker, page_label(page.number, offset), page.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn page_label(physical: usize, offset: usize) -> String {
    if physical > offset {
        (physical - offset).to_string()
    } else {
        roman(physical)
    }
}

/// Lowercase Roman numeral; 0 renders as an empty string.
pub fn roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}
