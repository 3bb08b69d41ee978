use chrono::{DateTime, Duration, Utc};

use crate::constants::MESSAGE_EDIT_WINDOW_SECS;

/// Whether `current_user` may still edit a message.
///
/// Only the author may edit, never after deletion, and only strictly inside
/// the edit window: a message exactly `MESSAGE_EDIT_WINDOW_SECS` old is locked.
pub fn is_editable(
    author_id: &str,
    current_user_id: &str,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    author_id == current_user_id
        && !is_deleted
        && now - created_at < Duration::seconds(MESSAGE_EDIT_WINDOW_SECS)
}

/// Same rule for timestamps stored as RFC 3339 text. Unparsable timestamps are never editable.
pub fn is_editable_at(
    author_id: &str,
    current_user_id: &str,
    is_deleted: bool,
    created_at: &str,
    now: DateTime<Utc>,
) -> bool {
    DateTime::parse_from_rfc3339(created_at)
        .map(|created| {
            is_editable(
                author_id,
                current_user_id,
                is_deleted,
                created.with_timezone(&Utc),
                now,
            )
        })
        .unwrap_or(false)
}
