//! Relay state: which connections receive broadcasts for which chat.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sender half of a connected client's outbound channel.
pub type ConnectionSender = mpsc::UnboundedSender<String>;

/// Identifier assigned to each socket connection at upgrade time.
pub type ConnectionId = Uuid;

struct RoomMember {
    conn: ConnectionId,
    tx: ConnectionSender,
}

/// Group-membership map keyed by chat identifier. Join and connection
/// teardown are the only mutators; closed channels are pruned during
/// broadcast.
pub struct RelayState {
    rooms: DashMap<String, Vec<RoomMember>>,
}

impl RelayState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Subscribe a connection to a chat's broadcasts. Joining the same
    /// room twice is a no-op. The chat is not validated to exist and
    /// rooms have no size limit.
    pub fn join(&self, chat_id: &str, conn: ConnectionId, tx: ConnectionSender) {
        let mut members = self.rooms.entry(chat_id.to_string()).or_default();
        if members.iter().any(|m| m.conn == conn) {
            return;
        }
        members.push(RoomMember { conn, tx });
    }

    /// Drop a connection from every room it joined.
    pub fn leave_all(&self, conn: ConnectionId) {
        self.rooms.retain(|_, members| {
            members.retain(|m| m.conn != conn);
            !members.is_empty()
        });
    }

    /// Send a message to every live member of the room, the sender's
    /// connection included. Closed channels are dropped along the way.
    pub fn broadcast(&self, chat_id: &str, message: &str) {
        let mut empty = false;
        if let Some(mut members) = self.rooms.get_mut(chat_id) {
            members.retain(|m| !m.tx.is_closed());
            for member in members.iter() {
                let _ = member.tx.send(message.to_string());
            }
            empty = members.is_empty();
        }
        if empty {
            self.rooms.remove_if(chat_id, |_, members| members.is_empty());
        }
    }

    /// Number of live members in a room.
    pub fn room_size(&self, chat_id: &str) -> usize {
        self.rooms
            .get(chat_id)
            .map(|members| members.iter().filter(|m| !m.tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> (ConnectionId, ConnectionSender, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }

    #[test]
    fn test_new_relay_state_is_empty() {
        let state = RelayState::new();
        assert_eq!(state.room_size("c1"), 0);
    }

    #[test]
    fn test_join_and_broadcast_reaches_all_members() {
        let state = RelayState::new();
        let (conn1, tx1, mut rx1) = member();
        let (conn2, tx2, mut rx2) = member();

        state.join("c1", conn1, tx1);
        state.join("c1", conn2, tx2);
        assert_eq!(state.room_size("c1"), 2);

        state.broadcast("c1", "hello");
        assert_eq!(rx1.try_recv().unwrap(), "hello");
        assert_eq!(rx2.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_duplicate_join_is_noop() {
        let state = RelayState::new();
        let (conn, tx, mut rx) = member();

        state.join("c1", conn, tx.clone());
        state.join("c1", conn, tx);
        assert_eq!(state.room_size("c1"), 1);

        state.broadcast("c1", "once");
        assert_eq!(rx.try_recv().unwrap(), "once");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_rooms_are_isolated() {
        let state = RelayState::new();
        let (conn1, tx1, mut rx1) = member();
        let (conn2, tx2, mut rx2) = member();

        state.join("c1", conn1, tx1);
        state.join("c2", conn2, tx2);

        state.broadcast("c1", "for c1 only");
        assert_eq!(rx1.try_recv().unwrap(), "for c1 only");
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_leave_all_removes_connection_everywhere() {
        let state = RelayState::new();
        let (conn, tx, mut rx) = member();

        state.join("c1", conn, tx.clone());
        state.join("c2", conn, tx);
        state.leave_all(conn);

        state.broadcast("c1", "gone");
        state.broadcast("c2", "gone");
        assert!(rx.try_recv().is_err());
        assert_eq!(state.room_size("c1"), 0);
        assert_eq!(state.room_size("c2"), 0);
    }

    #[test]
    fn test_broadcast_prunes_closed_channels() {
        let state = RelayState::new();
        let (conn1, tx1, rx1) = member();
        let (conn2, tx2, mut rx2) = member();

        state.join("c1", conn1, tx1);
        state.join("c1", conn2, tx2);

        drop(rx1);
        state.broadcast("c1", "still here");

        assert_eq!(state.room_size("c1"), 1);
        assert_eq!(rx2.try_recv().unwrap(), "still here");
    }

    #[test]
    fn test_broadcast_to_unknown_room_is_noop() {
        let state = RelayState::new();
        state.broadcast("nowhere", "into the void");
    }

    #[test]
    fn test_default_impl() {
        let state = RelayState::default();
        assert_eq!(state.room_size("c1"), 0);
    }
}
