//! Component F: conversation capture — tolerant JSONL transcript parsing
//! and atomic capture-metadata updates.
//!
//! The parsing contract (index fallback, content-field fallback, skip
//! malformed/empty lines) follows spec §4.F directly; it's a deliberately
//! different, more tolerant model than the teacher's tagged `Message` enum
//! in `authorship/transcript.rs`, since this crate ingests conversation
//! logs produced by third-party AI assistants with inconsistent schemas.
//! Atomic metadata writes reuse `mdm/utils.rs::write_atomic`.

use crate::error::GraphitiError;
use crate::mdm::utils::write_atomic;
use crate::models::{CaptureMetadata, TranscriptTurn};
use std::path::Path;

/// Parse one JSONL transcript, skipping malformed lines (best-effort) and
/// turns whose extracted text is empty. Turn index falls back to
/// `index || turn || 1-based line number`; text falls back to
/// `content || message || text || ""`.
pub fn parse_transcript(jsonl: &str) -> Vec<TranscriptTurn> {
    let mut turns = Vec::new();
    for (line_no, line) in jsonl.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        let index = value
            .get("index")
            .and_then(|v| v.as_u64())
            .or_else(|| value.get("turn").and_then(|v| v.as_u64()))
            .unwrap_or((line_no + 1) as u64);

        let role = value
            .get("role")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let content = value
            .get("content")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()))
            .or_else(|| value.get("text").and_then(|v| v.as_str()))
            .unwrap_or("")
            .to_string();

        if content.is_empty() {
            continue;
        }

        turns.push(TranscriptTurn {
            index,
            role,
            content,
        });
    }
    turns
}

/// Join turns into the transcript's output text representation.
pub fn render_turns(turns: &[TranscriptTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("\n---\nTurn {}:\n{}", t.index, t.content))
        .collect::<Vec<_>>()
        .join("")
}

pub fn load_metadata(path: &Path) -> Result<CaptureMetadata, GraphitiError> {
    if !path.exists() {
        return Ok(CaptureMetadata::default());
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(CaptureMetadata::default());
    }
    Ok(serde_json::from_str(&data)?)
}

pub fn save_metadata(path: &Path, metadata: &CaptureMetadata) -> Result<(), GraphitiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_atomic(path, serde_json::to_vec_pretty(metadata)?.as_slice())
}

/// `capture(transcript_path, session_id, auto)`: in auto mode, only turns
/// past the last captured index are returned and the metadata high-water
/// mark is advanced on success; in manual mode all turns are returned and
/// metadata is left untouched.
pub fn capture(
    transcript_path: &Path,
    session_id: &str,
    auto: bool,
    metadata_path: &Path,
) -> Result<Option<String>, GraphitiError> {
    let jsonl = std::fs::read_to_string(transcript_path)?;
    let all_turns = parse_transcript(&jsonl);

    if auto {
        let metadata = load_metadata(metadata_path)?;
        let last = metadata.last_captured_turn(session_id);
        let new_turns: Vec<TranscriptTurn> =
            all_turns.into_iter().filter(|t| t.index > last).collect();
        if new_turns.is_empty() {
            return Ok(None);
        }
        let max_index = new_turns.iter().map(|t| t.index).max().unwrap_or(last);
        let rendered = render_turns(&new_turns);

        let mut metadata = metadata;
        metadata.record(session_id, max_index);
        save_metadata(metadata_path, &metadata)?;
        Ok(Some(rendered))
    } else if all_turns.is_empty() {
        Ok(None)
    } else {
        Ok(Some(render_turns(&all_turns)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_index_content_fallbacks() {
        let jsonl = "{\"index\": 1, \"role\": \"user\", \"content\": \"hello\"}\n{\"turn\": 2, \"role\": \"assistant\", \"message\": \"hi\"}\n";
        let turns = parse_transcript(jsonl);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].index, 1);
        assert_eq!(turns[1].index, 2);
        assert_eq!(turns[1].content, "hi");
    }

    #[test]
    fn skips_malformed_and_empty_text_lines() {
        let jsonl = "not json\n{\"role\": \"user\"}\n{\"role\": \"user\", \"text\": \"ok\"}\n";
        let turns = parse_transcript(jsonl);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "ok");
    }

    #[test]
    fn falls_back_to_line_number_index() {
        let jsonl = "{\"role\": \"user\", \"content\": \"a\"}\n{\"role\": \"user\", \"content\": \"b\"}\n";
        let turns = parse_transcript(jsonl);
        assert_eq!(turns[0].index, 1);
        assert_eq!(turns[1].index, 2);
    }

    #[test]
    fn auto_capture_returns_only_new_turns_and_advances_metadata() {
        let temp = TempDir::new().unwrap();
        let transcript_path = temp.path().join("session.jsonl");
        std::fs::write(
            &transcript_path,
            "{\"index\": 1, \"content\": \"a\"}\n{\"index\": 2, \"content\": \"b\"}\n",
        )
        .unwrap();
        let metadata_path = temp.path().join("meta.json");

        let first = capture(&transcript_path, "s1", true, &metadata_path).unwrap();
        assert!(first.unwrap().contains("Turn 2"));

        let second = capture(&transcript_path, "s1", true, &metadata_path).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn manual_capture_does_not_touch_metadata() {
        let temp = TempDir::new().unwrap();
        let transcript_path = temp.path().join("session.jsonl");
        std::fs::write(&transcript_path, "{\"index\": 1, \"content\": \"a\"}\n").unwrap();
        let metadata_path = temp.path().join("meta.json");

        capture(&transcript_path, "s1", false, &metadata_path).unwrap();
        assert!(!metadata_path.exists());
    }
}
