//! Append-only JSONL event streams
//!
//! One stream per agent in `events/{agent_id}.jsonl`. Writers take an
//! exclusive advisory lock for the duration of a single append; the reader
//! never locks and only consumes complete (newline-terminated) lines, so a
//! half-written line is picked up on the next read.

use super::{ensure_dir, read_json_opt, write_json, FileResult};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Stream name used for coordinator-issued events
pub const COORDINATOR_STREAM: &str = "_coordinator";

const STREAM_EXTENSION: &str = "jsonl";

/// Get the events directory path
pub fn get_events_dir(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("events")
}

/// Get the stream file for an agent
pub fn get_stream_path(coordination_dir: &Path, agent_id: &str) -> PathBuf {
    get_events_dir(coordination_dir).join(format!("{}.{}", agent_id, STREAM_EXTENSION))
}

/// Get the persisted fold checkpoint path
pub fn get_checkpoint_path(coordination_dir: &Path) -> PathBuf {
    get_events_dir(coordination_dir).join("checkpoints.json")
}

/// Read position within one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCheckpoint {
    /// Byte offset of the first unread line
    pub offset: u64,
    /// Number of lines consumed so far
    pub line: usize,
}

/// Lines read past a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    /// (1-based line number, raw bytes without the line terminator).
    /// Bytes are not required to be UTF-8; decoding is the reader's job.
    pub lines: Vec<(usize, Vec<u8>)>,
    pub next: StreamCheckpoint,
}

/// Append one serialized record as a single line
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> FileResult<()> {
    let line = serde_json::to_string(record)
        .map_err(|e| format!("Failed to serialize event: {}", e))?;
    append_line(path, &line)
}

/// Append a raw line under an exclusive lock
pub fn append_line(path: &Path, line: &str) -> FileResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open event stream {:?}: {}", path, e))?;

    file.lock_exclusive()
        .map_err(|e| format!("Failed to lock event stream {:?}: {}", path, e))?;

    let result = writeln!(file, "{}", line)
        .and_then(|_| file.flush())
        .map_err(|e| format!("Failed to append to {:?}: {}", path, e));

    let _ = fs2::FileExt::unlock(&file);
    result
}

/// Read complete lines written after `from`
pub fn read_from(path: &Path, from: StreamCheckpoint) -> FileResult<StreamChunk> {
    if !path.exists() {
        return Ok(StreamChunk {
            lines: Vec::new(),
            next: from,
        });
    }

    let mut file =
        File::open(path).map_err(|e| format!("Failed to open event stream {:?}: {}", path, e))?;
    let len = file
        .metadata()
        .map_err(|e| format!("Failed to stat event stream {:?}: {}", path, e))?
        .len();

    // A truncated stream cannot be resumed; keep the checkpoint
    if len < from.offset {
        log::warn!(
            "[FileStorage] Event stream {:?} shrank below checkpoint ({} < {})",
            path,
            len,
            from.offset
        );
        return Ok(StreamChunk {
            lines: Vec::new(),
            next: from,
        });
    }

    file.seek(SeekFrom::Start(from.offset))
        .map_err(|e| format!("Failed to seek event stream {:?}: {}", path, e))?;

    let mut reader = BufReader::new(file);
    let mut next = from;
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| format!("Failed to read event stream {:?}: {}", path, e))?;
        if read == 0 || buf.last() != Some(&b'\n') {
            break;
        }
        next.offset += read as u64;
        next.line += 1;
        while buf.last().map_or(false, u8::is_ascii_whitespace) {
            buf.pop();
        }
        if !buf.is_empty() {
            lines.push((next.line, buf.clone()));
        }
    }

    Ok(StreamChunk { lines, next })
}

pub fn load_checkpoint<T: serde::de::DeserializeOwned>(
    coordination_dir: &Path,
) -> FileResult<Option<T>> {
    read_json_opt(&get_checkpoint_path(coordination_dir))
}

pub fn save_checkpoint<T: Serialize>(coordination_dir: &Path, checkpoint: &T) -> FileResult<()> {
    write_json(&get_checkpoint_path(coordination_dir), checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_from_checkpoint() {
        let temp_dir = TempDir::new().unwrap();
        let path = get_stream_path(temp_dir.path(), "agent-1");

        append_line(&path, r#"{"n":1}"#).unwrap();
        append_line(&path, r#"{"n":2}"#).unwrap();

        let first = read_from(&path, StreamCheckpoint::default()).unwrap();
        assert_eq!(first.lines.len(), 2);
        assert_eq!(first.lines[1], (2, br#"{"n":2}"#.to_vec()));
        assert_eq!(first.next.line, 2);

        let again = read_from(&path, first.next).unwrap();
        assert!(again.lines.is_empty());
        assert_eq!(again.next, first.next);

        append_line(&path, r#"{"n":3}"#).unwrap();
        let third = read_from(&path, first.next).unwrap();
        assert_eq!(third.lines, vec![(3, br#"{"n":3}"#.to_vec())]);
    }

    #[test]
    fn test_partial_line_is_not_consumed() {
        let temp_dir = TempDir::new().unwrap();
        let path = get_stream_path(temp_dir.path(), "agent-1");
        append_line(&path, "complete").unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "partial").unwrap();

        let chunk = read_from(&path, StreamCheckpoint::default()).unwrap();
        assert_eq!(chunk.lines.len(), 1);
        assert_eq!(chunk.next.offset, "complete\n".len() as u64);
    }

    #[test]
    fn test_invalid_utf8_line_is_consumed() {
        let temp_dir = TempDir::new().unwrap();
        let path = get_stream_path(temp_dir.path(), "agent-1");
        append_line(&path, "first").unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"\xff\xfe garbage\r\n").unwrap();
        append_line(&path, "third").unwrap();

        let chunk = read_from(&path, StreamCheckpoint::default()).unwrap();
        assert_eq!(chunk.lines.len(), 3);
        assert_eq!(chunk.lines[1], (2, b"\xff\xfe garbage".to_vec()));
        assert_eq!(chunk.lines[2], (3, b"third".to_vec()));
        assert_eq!(chunk.next.line, 3);
        assert_eq!(chunk.next.offset, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_missing_stream_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let chunk = read_from(
            &get_stream_path(temp_dir.path(), "ghost"),
            StreamCheckpoint::default(),
        )
        .unwrap();
        assert!(chunk.lines.is_empty());
    }
}
