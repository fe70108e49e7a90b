//! Thread and agent domain models.
//!
//! A thread is a named, ordered container of messages scoped to one
//! (agent, user) pair. Its id only exists once the backend has confirmed it.

use crate::ids::{AgentId, ThreadId};
use crate::message::WireMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Title pattern used for the default thread of an agent.
pub const DEFAULT_THREAD_TITLE_PATTERN: &str = "General Conversation ({agent})";

/// Renders the default thread title for an agent name.
pub fn default_thread_title(pattern: &str, agent_name: &str) -> String {
    pattern.replace("{agent}", agent_name)
}

/// An agent the user can chat with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub id: AgentId,
    pub name: String,
}

impl AgentRef {
    pub fn new(id: impl Into<AgentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Thread metadata as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Server id; `None` until the backend has created the thread
    #[serde(default)]
    pub id: Option<ThreadId>,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub title: String,
    #[serde(default)]
    pub message_count: u32,
    /// Last update timestamp (ISO 8601 format)
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub is_archived: bool,
    /// Opaque sender key the backend uses to scope memory
    #[serde(default)]
    pub recipient: Option<String>,
}

impl Thread {
    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    /// Orders by `updated_at`, newest first.
    ///
    /// RFC 3339 timestamps compare as instants. Unparseable ones sort after
    /// every parseable one, among themselves by their raw text.
    pub fn newest_first(a: &Thread, b: &Thread) -> Ordering {
        b.recency().cmp(&a.recency())
    }

    fn recency(&self) -> (Option<DateTime<Utc>>, &str) {
        let instant = DateTime::parse_from_rfc3339(&self.updated_at)
            .ok()
            .map(|time| time.with_timezone(&Utc));
        (instant, &self.updated_at)
    }

    /// Picks the most recently updated thread.
    pub fn most_recent(threads: &[Thread]) -> Option<&Thread> {
        threads.iter().min_by(|a, b| Thread::newest_first(a, b))
    }
}

/// Response of `getThread`: the thread plus its messages.
///
/// `messages` is optional on purpose. A response without a message array is
/// malformed and must not be rendered as an empty thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDetail {
    #[serde(flatten)]
    pub thread: Thread,
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Payload of `createThread`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThread {
    pub agent_id: AgentId,
    pub title: String,
}

/// Payload of `updateThread`; unset fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl ThreadUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn archived(is_archived: bool) -> Self {
        Self {
            is_archived: Some(is_archived),
            ..Default::default()
        }
    }
}

/// Response of `listThreads`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadList {
    #[serde(default)]
    pub threads: Vec<Thread>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(id: i64, updated_at: &str, count: u32) -> Thread {
        Thread {
            id: Some(ThreadId::from(id)),
            agent_id: None,
            title: format!("t{id}"),
            message_count: count,
            updated_at: updated_at.to_string(),
            is_archived: false,
            recipient: None,
        }
    }

    #[test]
    fn test_default_thread_title() {
        assert_eq!(
            default_thread_title(DEFAULT_THREAD_TITLE_PATTERN, "A"),
            "General Conversation (A)"
        );
    }

    #[test]
    fn test_most_recent_compares_instants() {
        let threads = vec![
            thread(1, "2024-05-01T10:00:00+02:00", 3),
            // Earlier wall-clock string but later instant
            thread(2, "2024-05-01T09:30:00Z", 0),
        ];
        let newest = Thread::most_recent(&threads).unwrap();
        assert_eq!(newest.id, Some(ThreadId::from(2)));
    }

    #[test]
    fn test_mixed_timestamps_sort_consistently() {
        let mut threads = vec![
            thread(1, "2024-05-01T10:00:00+02:00", 0),
            thread(2, "2024-05-01T09:30:00Z", 0),
            thread(3, "2024-05-01T09:45:00", 0),
            thread(4, "", 0),
            thread(5, "2024-05-01T09:50:00", 0),
        ];
        threads.sort_by(Thread::newest_first);

        let order: Vec<_> = threads.iter().filter_map(|t| t.id.clone()).collect();
        let expected: Vec<_> = [2i64, 1, 5, 3, 4].into_iter().map(ThreadId::from).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_thread_detail_without_messages_is_none() {
        let detail: ThreadDetail =
            serde_json::from_str(r#"{"id": 4, "title": "x", "message_count": 0}"#).unwrap();
        assert!(detail.messages.is_none());
        assert_eq!(detail.thread.id, Some(ThreadId::from(4)));
    }

    #[test]
    fn test_thread_update_skips_unset_fields() {
        let json = serde_json::to_string(&ThreadUpdate::title("Renamed")).unwrap();
        assert_eq!(json, r#"{"title":"Renamed"}"#);
    }
}
