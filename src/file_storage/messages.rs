//! Direct agent-to-agent messages in `messages/MSG-*.json`

use super::{read_json_dir, read_json_opt, write_json, FileResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MESSAGE_PREFIX: &str = "MSG-";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Unread,
    Read,
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::Unread
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub from: String,
    pub to: String,
    pub body: String,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn new(from: &str, to: &str, body: &str) -> Self {
        let now = Utc::now();
        let short = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!(
                "{}{}-{}",
                MESSAGE_PREFIX,
                now.format("%Y%m%d%H%M%S%3f"),
                &short[..8]
            ),
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
            status: MessageStatus::Unread,
            created_at: now,
            read_at: None,
        }
    }
}

pub fn get_messages_dir(coordination_dir: &Path) -> PathBuf {
    coordination_dir.join("messages")
}

fn get_message_path(coordination_dir: &Path, message_id: &str) -> PathBuf {
    get_messages_dir(coordination_dir).join(format!("{}.json", message_id))
}

pub fn save_message(coordination_dir: &Path, message: &MessageRecord) -> FileResult<PathBuf> {
    let path = get_message_path(coordination_dir, &message.id);
    write_json(&path, message)?;
    Ok(path)
}

/// Messages addressed to `agent_id`, optionally filtered by status, oldest first
pub fn list_messages(
    coordination_dir: &Path,
    agent_id: &str,
    status: Option<MessageStatus>,
) -> FileResult<Vec<MessageRecord>> {
    let mut messages: Vec<MessageRecord> =
        read_json_dir(&get_messages_dir(coordination_dir), MESSAGE_PREFIX)?;
    messages.retain(|m| m.to == agent_id && status.map_or(true, |s| m.status == s));
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(messages)
}

/// Count unread messages across all recipients
pub fn count_unread(coordination_dir: &Path) -> FileResult<usize> {
    let messages: Vec<MessageRecord> =
        read_json_dir(&get_messages_dir(coordination_dir), MESSAGE_PREFIX)?;
    Ok(messages
        .iter()
        .filter(|m| m.status == MessageStatus::Unread)
        .count())
}

/// Returns false if the message does not exist
pub fn mark_message_read(coordination_dir: &Path, message_id: &str) -> FileResult<bool> {
    let path = get_message_path(coordination_dir, message_id);
    let Some(mut message) = read_json_opt::<MessageRecord>(&path)? else {
        return Ok(false);
    };
    if message.status == MessageStatus::Unread {
        message.status = MessageStatus::Read;
        message.read_at = Some(Utc::now());
        write_json(&path, &message)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_message_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let msg = MessageRecord::new("agent-1", "agent-2", "User model is ready");
        assert!(msg.id.starts_with("MSG-"));
        save_message(temp_dir.path(), &msg).unwrap();
        save_message(
            temp_dir.path(),
            &MessageRecord::new("agent-2", "agent-1", "Thanks"),
        )
        .unwrap();

        let inbox = list_messages(temp_dir.path(), "agent-2", Some(MessageStatus::Unread)).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(count_unread(temp_dir.path()).unwrap(), 2);

        assert!(mark_message_read(temp_dir.path(), &msg.id).unwrap());
        assert!(list_messages(temp_dir.path(), "agent-2", Some(MessageStatus::Unread))
            .unwrap()
            .is_empty());
        assert_eq!(count_unread(temp_dir.path()).unwrap(), 1);
        assert!(!mark_message_read(temp_dir.path(), "MSG-missing").unwrap());
    }
}
