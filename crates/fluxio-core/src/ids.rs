//! Session id generation
//!
//! Session ids group the tasks of one submission batch for polling. The
//! epoch prefix keeps them roughly sortable in table scans; the uuid suffix
//! keeps concurrent submissions distinct.

use chrono::Utc;
use uuid::Uuid;

/// Generate a fresh session id of the form `session-{epoch}-{uuid prefix}`.
pub fn new_session_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("session-{}-{}", Utc::now().timestamp(), &uuid[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let id = new_session_id();
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_session_ids_are_distinct() {
        assert_ne!(new_session_id(), new_session_id());
    }
}
