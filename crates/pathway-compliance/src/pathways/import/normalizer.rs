/// Strip invisible characters and collapse runs of whitespace; case is preserved
/// because pathway labels match case-sensitively.
pub(crate) fn normalize_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| normalize_label(&text))
        .filter(|text| !text.is_empty())
}
