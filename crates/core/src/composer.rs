//! Assembles the final script text from a diff's drop and create
//! fragments: header, drops section, creates section.

use chrono::{DateTime, Utc};

use crate::model::quote_identifier;

/// `-- SQLDiff source: [<db>]` header plus drops/creates sections, each
/// with its own header emitted only when that section is non-empty.
pub fn compose_script(
    source_db: &str,
    target_db: &str,
    generated_at_utc: DateTime<Utc>,
    drops: &[String],
    creates: &[String],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("-- SQLDiff source: {}\n", quote_identifier(source_db)));
    out.push_str(&format!("-- SQLDiff target: {}\n", quote_identifier(target_db)));
    out.push_str(&format!(
        "-- Generated (UTC): {}\n",
        generated_at_utc.format("%Y-%m-%d %H:%M:%S")
    ));

    if !drops.is_empty() {
        out.push('\n');
        out.push_str("-- Drops\n");
        for line in drops {
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push('\n');
            }
        }
    }

    if !creates.is_empty() {
        out.push('\n');
        out.push_str("-- Creates/Alters\n");
        for line in creates {
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push('\n');
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn omits_empty_sections() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let text = compose_script("Src", "Tgt", ts, &[], &[]);
        assert!(!text.contains("Drops"));
        assert!(!text.contains("Creates"));
        assert!(text.contains("2026-01-01 12:00:00"));
    }

    #[test]
    fn includes_non_empty_sections() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let text = compose_script("Src", "Tgt", ts, &["DROP X;\nGO".to_string()], &["CREATE Y;\nGO".to_string()]);
        assert!(text.contains("-- Drops"));
        assert!(text.contains("-- Creates/Alters"));
        assert!(text.contains("DROP X;"));
        assert!(text.contains("CREATE Y;"));
    }
}
