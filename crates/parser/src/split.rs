/// Split a pasted blob into individual messages.
///
/// A boundary is a blank line (whitespace-only lines count) or a line made only
/// of three or more `-` or `=` characters. Segments are trimmed and empty ones
/// are dropped; input order is kept.
pub fn split_messages(blob: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in blob.lines() {
        if line.trim().is_empty() || is_separator_line(line) {
            flush(&mut current, &mut segments);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut segments);

    segments
}

fn flush(current: &mut Vec<&str>, segments: &mut Vec<String>) {
    let joined = current.join("\n");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

fn is_separator_line(line: &str) -> bool {
    let l = line.trim();
    l.len() >= 3 && (l.chars().all(|c| c == '-') || l.chars().all(|c| c == '='))
}
