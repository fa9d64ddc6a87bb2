//! Training data file: one `{"prompt","completion"}` JSON object per line.

use std::path::Path;

use selfedit_state::{ContentDigest, TrainingPair};

use crate::error::Result;

/// Encode `pairs` as JSON lines.
pub fn encode_jsonl(pairs: &[TrainingPair]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for pair in pairs {
        serde_json::to_writer(&mut buf, pair)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

/// Write the training file and return the digest of its bytes.
pub async fn write_training_data(path: &Path, pairs: &[TrainingPair]) -> Result<ContentDigest> {
    let buf = encode_jsonl(pairs)?;
    tokio::fs::write(path, &buf).await?;
    Ok(ContentDigest::from_bytes(&buf))
}

/// Decode a JSON-lines training file, skipping blank lines.
pub fn decode_jsonl(content: &str) -> Result<Vec<TrainingPair>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Ok(serde_json::from_str(line)?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_object_per_line() {
        let pairs = vec![
            TrainingPair {
                prompt: "What is SEAL?".into(),
                completion: "Self-adapting LLMs".into(),
            },
            TrainingPair {
                prompt: "multi\nline".into(),
                completion: "ok".into(),
            },
        ];
        let bytes = encode_jsonl(&pairs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "{\"prompt\":\"What is SEAL?\",\"completion\":\"Self-adapting LLMs\"}\n\
             {\"prompt\":\"multi\\nline\",\"completion\":\"ok\"}\n"
        );
        assert_eq!(decode_jsonl(&text).unwrap(), pairs);
    }

    #[test]
    fn empty_pairs_make_empty_file() {
        assert!(encode_jsonl(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn digest_matches_written_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.jsonl");
        let pairs = vec![TrainingPair {
            prompt: "p".into(),
            completion: "c".into(),
        }];
        let digest = write_training_data(&path, &pairs).await.unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(digest, ContentDigest::from_bytes(&written));
    }
}
