//! Splits a script on batch-separator lines and runs each chunk in order —
//! the same loop the `apply` command and `sync --apply`/`deploy` drive.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::time::timeout;

use crate::connection::SqlClient;
use crate::error::map_tiberius;

/// Matches a line containing only the separator token, optionally followed
/// by a `--` comment, with surrounding whitespace tolerated.
static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*GO[ \t]*(--.*)?$").unwrap());

/// Splits `script` into executable chunks on batch-separator lines. Empty
/// chunks (consecutive separators, leading/trailing blank batches) are
/// dropped.
pub fn split_batches(script: &str) -> Vec<String> {
    SEPARATOR_LINE
        .split(script)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOutcome {
    pub batches_total: usize,
    pub batches_executed: usize,
}

/// Executes `script`'s batches in order against `client`. With `dry_run`,
/// batches are counted but never sent. Each batch is bounded by
/// `timeout_seconds`; the first failing or timed-out batch aborts the run.
pub async fn apply_script(
    client: &mut SqlClient,
    script: &str,
    dry_run: bool,
    timeout_seconds: u64,
) -> sqldiff_core::Result<ApplyOutcome> {
    let batches = split_batches(script);
    let batches_total = batches.len();
    if dry_run {
        return Ok(ApplyOutcome { batches_total, batches_executed: 0 });
    }

    for (index, batch) in batches.iter().enumerate() {
        let exec = async {
            client
                .execute(batch.as_str(), &[])
                .await
                .map_err(|e| map_tiberius(&format!("batch {} failed", index + 1), e))
        };
        timeout(Duration::from_secs(timeout_seconds), exec)
            .await
            .map_err(|_| {
                sqldiff_core::SqlDiffError::Catalog(format!(
                    "batch {} timed out after {timeout_seconds}s",
                    index + 1
                ))
            })??;
    }

    Ok(ApplyOutcome { batches_total, batches_executed: batches_total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_go_lines() {
        let script = "CREATE TABLE T (Id int);\nGO\nALTER TABLE T ADD CONSTRAINT PK PRIMARY KEY (Id);\nGO\n";
        let batches = split_batches(script);
        assert_eq!(batches.len(), 2);
        assert!(batches[0].contains("CREATE TABLE T"));
        assert!(batches[1].contains("ADD CONSTRAINT PK"));
    }

    #[test]
    fn tolerates_trailing_comment_on_separator() {
        let script = "SELECT 1;\nGO -- comment\nSELECT 2;\nGO\n";
        let batches = split_batches(script);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn drops_empty_batches() {
        let script = "GO\nGO\nSELECT 1;\nGO\n";
        let batches = split_batches(script);
        assert_eq!(batches, vec!["SELECT 1;".to_string()]);
    }

    #[test]
    fn is_case_insensitive_on_separator_token() {
        let script = "SELECT 1;\ngo\nSELECT 2;\n";
        let batches = split_batches(script);
        assert_eq!(batches.len(), 2);
    }
}
