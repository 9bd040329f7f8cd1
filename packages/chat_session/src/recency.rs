//! Recency ordering for chat lists.
//!
//! Every list pushed after a new message is ordered by the timestamp of each
//! chat's last message, newest first. Chats without a last message count as
//! timestamp 0. The sort is stable, so ties keep the account's order.

use std::cmp::Reverse;

use crate::types::{Chat, Message};

pub fn sort_by_recency(chats: &mut [Chat]) {
    chats.sort_by_key(|chat| Reverse(chat.last_activity()));
}

/// Set `message` as the last message of the chat it belongs to.
/// Returns false when no chat in the list matches.
pub fn attach_last_message(chats: &mut [Chat], message: &Message) -> bool {
    match chats.iter_mut().find(|chat| chat.id == message.chat_id) {
        Some(chat) => {
            chat.last_message = Some(message.clone());
            true
        }
        None => false,
    }
}

/// Attach `message` to its chat and re-sort the whole list.
pub fn with_new_message(mut chats: Vec<Chat>, message: &Message) -> Vec<Chat> {
    attach_last_message(&mut chats, message);
    sort_by_recency(&mut chats);
    chats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: &str, ts: Option<i64>) -> Chat {
        let c = Chat::new(id, id.to_uppercase());
        match ts {
            Some(ts) => c.with_last_message(Message::text(id, "x", ts, false)),
            None => c,
        }
    }

    fn ids(chats: &[Chat]) -> Vec<&str> {
        chats.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn newest_first() {
        let mut chats = vec![chat("a", Some(10)), chat("b", Some(30)), chat("c", Some(20))];
        sort_by_recency(&mut chats);
        assert_eq!(ids(&chats), vec!["b", "c", "a"]);
    }

    #[test]
    fn chats_without_messages_sort_last() {
        let mut chats = vec![chat("empty", None), chat("a", Some(1))];
        sort_by_recency(&mut chats);
        assert_eq!(ids(&chats), vec!["a", "empty"]);
    }

    #[test]
    fn ties_keep_original_order() {
        let mut chats = vec![chat("x", None), chat("y", None), chat("z", Some(0))];
        sort_by_recency(&mut chats);
        assert_eq!(ids(&chats), vec!["x", "y", "z"]);
    }

    #[test]
    fn new_message_moves_chat_to_front() {
        let chats = vec![chat("a", Some(100)), chat("b", Some(50))];
        let msg = Message::text("b", "new", 200, true);
        let sorted = with_new_message(chats, &msg);
        assert_eq!(ids(&sorted), vec!["b", "a"]);
        assert_eq!(sorted[0].last_message.as_ref().unwrap().body, "new");
    }

    #[test]
    fn message_for_unknown_chat_only_sorts() {
        let chats = vec![chat("a", Some(1)), chat("b", Some(2))];
        let msg = Message::text("ghost", "boo", 999, false);
        let mut copy = chats.clone();
        assert!(!attach_last_message(&mut copy, &msg));
        let sorted = with_new_message(chats, &msg);
        assert_eq!(ids(&sorted), vec!["b", "a"]);
        assert!(sorted.iter().all(|c| c.last_message.as_ref().unwrap().body == "x"));
    }
}
