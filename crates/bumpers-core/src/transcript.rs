//! Session transcript tail reading and intent extraction
//!
//! The transcript is an append-only JSONL log of the host agent's
//! conversation. For PostToolUse rules tagged `intent`, Bumpers recovers the
//! free-form text the agent wrote just before requesting the tool call now
//! being evaluated: the entry carrying the `tool_use` item links back to its
//! producing assistant message via `parentUuid`.
//!
//! Everything here is fail-safe. A missing file, a malformed line, or an
//! absent link yields an empty string, never an error: transcript trouble
//! must degrade a rule to "no match", not break the hook. Reads walk the
//! file backwards in chunks under a byte budget, so extraction cost is
//! bounded by how far back the entry sits, not by file size. Files are never
//! kept open across calls.

use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::constants::{TRANSCRIPT_CHUNK_BYTES, TRANSCRIPT_READ_BUDGET};

/// One content item of an assistant message.
///
/// The list is heterogeneous; unknown item types collapse into `Other` so
/// future Claude Code versions do not break parsing.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    Thinking { thinking: String },
    ToolUse { id: String },
    #[serde(other)]
    Other,
}

/// Message content: either a plain string or a list of content items.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Items(Vec<ContentItem>),
    Text(String),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Items(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscriptMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: MessageContent,
}

/// One line of the transcript file.
#[derive(Debug, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(rename = "parentUuid", default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub message: Option<TranscriptMessage>,
}

impl TranscriptEntry {
    fn is_assistant(&self) -> bool {
        self.kind == "assistant"
    }

    /// The id carried by a `tool_use` content item, if any.
    fn tool_use_id(&self) -> Option<&str> {
        match &self.message.as_ref()?.content {
            MessageContent::Items(items) => items.iter().find_map(|item| match item {
                ContentItem::ToolUse { id } => Some(id.as_str()),
                _ => None,
            }),
            MessageContent::Text(_) => None,
        }
    }

    /// Concatenated `text` and `thinking` items in order.
    fn intent_text(&self) -> String {
        let Some(message) = &self.message else {
            return String::new();
        };
        match &message.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Items(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::Text { text } => Some(text.as_str()),
                        ContentItem::Thinking { thinking } => Some(thinking.as_str()),
                        _ => None,
                    })
                    .filter(|s| !s.is_empty())
                    .collect();
                parts.join("\n")
            }
        }
    }
}

/// Reads complete lines from the end of a file backwards, in fixed-size
/// chunks, stopping once a byte budget is spent.
struct RevLineReader {
    file: File,
    pos: u64,
    carry: Vec<u8>,
    chunk_size: usize,
    budget: u64,
    bytes_read: u64,
    done: bool,
}

impl RevLineReader {
    fn open(path: &Path, chunk_size: usize, budget: u64) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let pos = file.metadata()?.len();
        Ok(Self {
            file,
            pos,
            carry: Vec::new(),
            chunk_size,
            budget,
            bytes_read: 0,
            done: false,
        })
    }

    /// Pull one more chunk in front of the carry buffer. Returns false when
    /// the start of file has been reached or the budget is spent.
    fn fill(&mut self) -> std::io::Result<bool> {
        if self.pos == 0 || self.bytes_read >= self.budget {
            return Ok(false);
        }
        let want = (self.chunk_size as u64).min(self.pos);
        let start = self.pos - want;
        self.file.seek(SeekFrom::Start(start))?;
        let mut chunk = vec![0u8; want as usize];
        self.file.read_exact(&mut chunk)?;
        self.pos = start;
        self.bytes_read += want;
        chunk.extend_from_slice(&self.carry);
        self.carry = chunk;
        Ok(true)
    }
}

impl Iterator for RevLineReader {
    type Item = String;

    /// Next line, last-first. A partial line left over when the budget runs
    /// out is dropped rather than returned truncated.
    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        loop {
            if let Some(idx) = self.carry.iter().rposition(|&b| b == b'\n') {
                let line = self.carry.split_off(idx + 1);
                self.carry.pop(); // the newline itself
                return Some(String::from_utf8_lossy(&line).into_owned());
            }
            match self.fill() {
                Ok(true) => continue,
                Ok(false) => {
                    self.done = true;
                    if self.pos == 0 && !self.carry.is_empty() {
                        let line = std::mem::take(&mut self.carry);
                        return Some(String::from_utf8_lossy(&line).into_owned());
                    }
                    return None;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "transcript read failed mid-scan");
                    self.done = true;
                    return None;
                }
            }
        }
    }
}

fn parse_entry(line: &str) -> Option<TranscriptEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Garbage lines are expected in the wild; skip, never fail.
    serde_json::from_str(trimmed).ok()
}

/// What the backward scan is looking for in phase one.
enum ScanTarget<'a> {
    ToolUseId(&'a str),
    MostRecentToolUse,
}

/// Tail reader over a session transcript.
#[derive(Debug, Clone, Copy)]
pub struct TailReader {
    chunk_size: usize,
    budget: u64,
}

impl Default for TailReader {
    fn default() -> Self {
        Self {
            chunk_size: TRANSCRIPT_CHUNK_BYTES,
            budget: TRANSCRIPT_READ_BUDGET,
        }
    }
}

impl TailReader {
    pub fn new(chunk_size: usize, budget: u64) -> Self {
        Self { chunk_size, budget }
    }

    /// Intent text for the assistant message that produced the given tool
    /// call. Authoritative path when the hook payload carries a
    /// `tool_use_id`.
    pub fn intent_by_tool_use_id(&self, path: &Path, tool_use_id: &str) -> String {
        self.scan_for_intent(path, ScanTarget::ToolUseId(tool_use_id))
            .0
    }

    /// Fallback when no id is known: resolve the most recent `tool_use` in
    /// the tail window and extract its parent's text.
    pub fn recent_intent(&self, path: &Path) -> String {
        self.scan_for_intent(path, ScanTarget::MostRecentToolUse).0
    }

    /// Bulk extraction: concatenated `text` and `thinking` content of the
    /// assistant entries among the last `max_lines` lines, in chronological
    /// order.
    pub fn recent_intent_text(&self, path: &Path, max_lines: usize) -> String {
        let reader = match RevLineReader::open(path, self.chunk_size, self.budget) {
            Ok(reader) => reader,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "transcript unavailable");
                return String::new();
            }
        };

        let mut lines: Vec<String> = reader
            .filter(|line| !line.trim().is_empty())
            .take(max_lines)
            .collect();
        lines.reverse();

        let parts: Vec<String> = lines
            .iter()
            .filter_map(|line| parse_entry(line))
            .filter(TranscriptEntry::is_assistant)
            .map(|entry| entry.intent_text())
            .filter(|text| !text.is_empty())
            .collect();
        parts.join("\n")
    }

    /// Backward scan: find the entry carrying the target `tool_use`, then
    /// keep walking back to the entry whose `uuid` matches its `parentUuid`.
    /// Returns the intent text and the bytes read (for budget assertions).
    fn scan_for_intent(&self, path: &Path, target: ScanTarget<'_>) -> (String, u64) {
        let mut reader = match RevLineReader::open(path, self.chunk_size, self.budget) {
            Ok(reader) => reader,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "transcript unavailable");
                return (String::new(), 0);
            }
        };

        let mut wanted_uuid: Option<String> = None;
        while let Some(line) = reader.next() {
            let Some(entry) = parse_entry(&line) else {
                continue;
            };
            if !entry.is_assistant() {
                continue;
            }

            match &wanted_uuid {
                None => {
                    let hit = match (&target, entry.tool_use_id()) {
                        (ScanTarget::ToolUseId(id), Some(found)) => found == *id,
                        (ScanTarget::MostRecentToolUse, Some(_)) => true,
                        _ => false,
                    };
                    if hit {
                        match entry.parent_uuid {
                            Some(parent) => wanted_uuid = Some(parent),
                            // No link back to a producing message: nothing
                            // to extract.
                            None => return (String::new(), reader.bytes_read),
                        }
                    }
                }
                Some(wanted) => {
                    if entry.uuid.as_deref() == Some(wanted.as_str()) {
                        return (entry.intent_text(), reader.bytes_read);
                    }
                }
            }
        }

        (String::new(), reader.bytes_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn assistant_text(uuid: &str, text: &str) -> String {
        format!(
            r#"{{"type":"assistant","uuid":"{uuid}","message":{{"role":"assistant","content":[{{"type":"text","text":"{text}"}}]}}}}"#
        )
    }

    fn assistant_tool_use(uuid: &str, parent: &str, tool_use_id: &str) -> String {
        format!(
            r#"{{"type":"assistant","uuid":"{uuid}","parentUuid":"{parent}","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"{tool_use_id}","name":"Bash","input":{{"command":"go test"}}}}]}}}}"#
        )
    }

    fn write_transcript(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_intent_by_tool_use_id() {
        let file = write_transcript(&[
            assistant_text("aaa", "These failures are not related to my changes"),
            assistant_tool_use("bbb", "aaa", "toolu_01"),
            r#"{"type":"user","uuid":"ccc","message":{"role":"user","content":"ok"}}"#.into(),
        ]);

        let intent = TailReader::default().intent_by_tool_use_id(file.path(), "toolu_01");
        assert_eq!(intent, "These failures are not related to my changes");
    }

    #[test]
    fn test_intent_concatenates_text_and_thinking() {
        let file = write_transcript(&[
            r#"{"type":"assistant","uuid":"aaa","message":{"role":"assistant","content":[{"type":"thinking","thinking":"let me retry"},{"type":"text","text":"running tests again"}]}}"#.into(),
            assistant_tool_use("bbb", "aaa", "toolu_02"),
        ]);

        let intent = TailReader::default().intent_by_tool_use_id(file.path(), "toolu_02");
        assert_eq!(intent, "let me retry\nrunning tests again");
    }

    #[test]
    fn test_unknown_id_returns_empty() {
        let file = write_transcript(&[
            assistant_text("aaa", "hello"),
            assistant_tool_use("bbb", "aaa", "toolu_01"),
        ]);
        let intent = TailReader::default().intent_by_tool_use_id(file.path(), "toolu_99");
        assert_eq!(intent, "");
    }

    #[test]
    fn test_missing_parent_link_returns_empty() {
        let file = write_transcript(&[format!(
            r#"{{"type":"assistant","uuid":"bbb","message":{{"role":"assistant","content":[{{"type":"tool_use","id":"toolu_01"}}]}}}}"#
        )]);
        let intent = TailReader::default().intent_by_tool_use_id(file.path(), "toolu_01");
        assert_eq!(intent, "");
    }

    #[test]
    fn test_missing_file_returns_empty() {
        let reader = TailReader::default();
        assert_eq!(
            reader.intent_by_tool_use_id(Path::new("/nonexistent/transcript.jsonl"), "x"),
            ""
        );
        assert_eq!(reader.recent_intent(Path::new("/nonexistent/t.jsonl")), "");
        assert_eq!(
            reader.recent_intent_text(Path::new("/nonexistent/t.jsonl"), 50),
            ""
        );
    }

    #[test]
    fn test_recent_intent_resolves_latest_tool_use() {
        let file = write_transcript(&[
            assistant_text("old", "earlier message"),
            assistant_tool_use("old-use", "old", "toolu_01"),
            assistant_text("new", "latest message"),
            assistant_tool_use("new-use", "new", "toolu_02"),
        ]);
        let intent = TailReader::default().recent_intent(file.path());
        assert_eq!(intent, "latest message");
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let file = write_transcript(&[
            "not json at all".into(),
            assistant_text("aaa", "the real intent"),
            "{\"type\":\"assistant\",truncated-garbage".into(),
            assistant_tool_use("bbb", "aaa", "toolu_01"),
            "{}".into(),
        ]);
        let intent = TailReader::default().intent_by_tool_use_id(file.path(), "toolu_01");
        assert_eq!(intent, "the real intent");
    }

    #[test]
    fn test_oversized_line_does_not_break_extraction() {
        let huge = format!(r#"{{"type":"user","uuid":"pad","message":{{"role":"user","content":"{}"}}}}"#,
            "a".repeat(1024 * 1024 + 512));
        let file = write_transcript(&[
            huge,
            assistant_text("aaa", "after the monster line"),
            assistant_tool_use("bbb", "aaa", "toolu_01"),
        ]);

        let reader = TailReader::new(TRANSCRIPT_CHUNK_BYTES, 4 * 1024 * 1024);
        let intent = reader.intent_by_tool_use_id(file.path(), "toolu_01");
        assert_eq!(intent, "after the monster line");
    }

    #[test]
    fn test_budget_bounds_reads_for_tail_entries() {
        // Pad the front of the file with noise, keep the relevant pair in
        // the last 4 KiB, and verify the scan stays within 64 KiB of I/O.
        let mut lines: Vec<String> = (0..2000)
            .map(|i| format!(r#"{{"type":"user","uuid":"u{i}","message":{{"role":"user","content":"filler filler filler"}}}}"#))
            .collect();
        lines.push(assistant_text("aaa", "tail intent"));
        lines.push(assistant_tool_use("bbb", "aaa", "toolu_tail"));
        let file = write_transcript(&lines);

        let reader = TailReader::default();
        let (intent, bytes_read) =
            reader.scan_for_intent(file.path(), ScanTarget::ToolUseId("toolu_tail"));
        assert_eq!(intent, "tail intent");
        assert!(
            bytes_read <= 64 * 1024,
            "read {bytes_read} bytes, expected <= 64KiB"
        );
    }

    #[test]
    fn test_budget_exhaustion_returns_empty_not_error() {
        let file = write_transcript(&[
            assistant_text("aaa", "unreachable"),
            assistant_tool_use("bbb", "aaa", "toolu_01"),
            format!(r#"{{"type":"user","uuid":"pad","message":{{"role":"user","content":"{}"}}}}"#, "z".repeat(8192)),
        ]);
        // Budget too small to reach past the padding line.
        let reader = TailReader::new(1024, 2048);
        assert_eq!(reader.intent_by_tool_use_id(file.path(), "toolu_01"), "");
    }

    #[test]
    fn test_recent_intent_text_is_chronological() {
        let file = write_transcript(&[
            assistant_text("aaa", "first"),
            r#"{"type":"user","uuid":"u1","message":{"role":"user","content":"noise"}}"#.into(),
            assistant_text("bbb", "second"),
        ]);
        let text = TailReader::default().recent_intent_text(file.path(), 50);
        assert_eq!(text, "first\nsecond");
    }

    #[test]
    fn test_recent_intent_text_honors_line_window() {
        let file = write_transcript(&[
            assistant_text("aaa", "outside window"),
            assistant_text("bbb", "inside window"),
        ]);
        let text = TailReader::default().recent_intent_text(file.path(), 1);
        assert_eq!(text, "inside window");
    }

    #[test]
    fn test_unknown_content_tags_are_ignored() {
        let file = write_transcript(&[
            r#"{"type":"assistant","uuid":"aaa","message":{"role":"assistant","content":[{"type":"server_tool_use","id":"srv"},{"type":"text","text":"kept"}]}}"#.into(),
            assistant_tool_use("bbb", "aaa", "toolu_01"),
        ]);
        let intent = TailReader::default().intent_by_tool_use_id(file.path(), "toolu_01");
        assert_eq!(intent, "kept");
    }
}
