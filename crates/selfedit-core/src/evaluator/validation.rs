//! Validation set loading (JSONL of `{prompt, completion}`).

use std::path::Path;

use selfedit_state::ValidationExample;

use crate::error::{Result, SelfEditError};

/// Load the validation set. A missing file is an empty set.
pub async fn load_validation_set(path: &Path) -> Result<Vec<ValidationExample>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    parse_validation_set(&content)
}

/// Parse JSONL content, skipping blank lines.
pub fn parse_validation_set(content: &str) -> Result<Vec<ValidationExample>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| {
                SelfEditError::Config(format!("validation line {}: {e}", idx + 1))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_and_skips_blanks() {
        let content = "{\"prompt\":\"q1\",\"completion\":\"a1\"}\n\n{\"prompt\":\"q2\",\"completion\":\"a2\"}\n";
        let set = parse_validation_set(content).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[1].prompt, "q2");
    }

    #[test]
    fn bad_line_reports_line_number() {
        let err = parse_validation_set("{\"prompt\":\"q\",\"completion\":\"a\"}\nnot json\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = load_validation_set(&dir.path().join("none.jsonl")).await.unwrap();
        assert!(set.is_empty());
    }
}
