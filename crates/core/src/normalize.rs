/// Collapses a T-SQL definition to a comparison-stable form: line endings
/// unified, runs of whitespace collapsed to a single space, leading and
/// trailing whitespace trimmed, and case folded to uppercase.
///
/// This is used only to decide "did this object change", never to produce
/// output DDL — the original definition text is always what gets emitted.
pub fn normalize(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_uppercase()
}
