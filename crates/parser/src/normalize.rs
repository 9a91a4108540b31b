/// Case-fold a message and collapse every whitespace run to a single space.
///
/// Punctuation and digit grouping are left untouched so that amounts
/// (`1,200.00`) and dates (`15/01/2024`) survive for later stages.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
