use helpdesk_db::queries::{messages, users};
use helpdesk_db::{now_millis, to_datetime};
use helpdesk_types::{HelpMessage, MessageType, UserId};
use tracing::info;

use crate::error::{HelpDeskError, Result};
use crate::{HelpDesk, required};

/// Largest accepted request body, in bytes.
pub const MAX_HELP_MESSAGE_BYTES: usize = 65_535;

impl HelpDesk {
    /// Append a help request. `message_type` is `general` or `specific`.
    pub fn submit_help_request(&self, user: &UserId, message_type: &str, content: &str) -> Result<i64> {
        let message_type: MessageType = message_type
            .parse()
            .map_err(|e| HelpDeskError::Validation(format!("{}", e)))?;
        let content = required("message", content)?;
        if content.len() > MAX_HELP_MESSAGE_BYTES {
            return Err(HelpDeskError::Validation(format!(
                "message exceeds {} bytes",
                MAX_HELP_MESSAGE_BYTES
            )));
        }

        let id = self.db.with_conn(|conn| {
            if users::get_user_by_id(conn, user)?.is_none() {
                return Err(HelpDeskError::NotFound(format!("user {}", user)));
            }
            Ok(messages::insert_help_message(conn, user, message_type.as_str(), content, now_millis())?)
        })?;

        info!("Help request {} ({}) from {}", id, message_type.as_str(), user);
        Ok(id)
    }

    /// The user's requests, newest first.
    pub fn help_history(&self, user: &UserId) -> Result<Vec<HelpMessage>> {
        let rows = self.db.with_conn(|conn| messages::list_help_messages(conn, user))?;
        rows.into_iter()
            .map(|row| {
                let message_type = row.message_type.parse().map_err(|e| {
                    HelpDeskError::Storage(anyhow::anyhow!("help message {}: {}", row.id, e))
                })?;
                Ok(HelpMessage {
                    id: row.id,
                    user_id: row.user_id,
                    message_type,
                    content: row.content,
                    created_at: to_datetime(row.created_at),
                })
            })
            .collect()
    }
}
