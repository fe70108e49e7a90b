//! Matching optimistic messages against the server's canonical list.

use agentdeck_core::ids::{ClientMessageId, ServerMessageId};
use agentdeck_core::message::Message;

/// Pairs local optimistic messages with their confirmed counterparts.
///
/// Walks both lists in order; each local message with a client identity is
/// matched to the next server message with the same role and content. A
/// local message without a counterpart stays unmapped.
pub fn map_identifiers(local: &[Message], server: &[Message]) -> Vec<(ClientMessageId, ServerMessageId)> {
    let mut mapped = Vec::new();
    let mut cursor = 0;
    for message in local {
        let Some(offset) = server[cursor..]
            .iter()
            .position(|candidate| candidate.same_content(message))
        else {
            continue;
        };
        let matched = &server[cursor + offset];
        cursor += offset + 1;
        if let (Some(client_id), Some(server_id)) = (message.id.client_id(), matched.id.server_id()) {
            mapped.push((client_id, server_id.clone()));
        }
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdeck_core::ids::MessageId;
    use agentdeck_core::message::MessageRole;

    fn confirmed(id: &str, role: MessageRole, content: &str) -> Message {
        Message {
            id: MessageId::Server(ServerMessageId::from(id)),
            ..Message::optimistic(role, content)
        }
    }

    #[test]
    fn test_maps_optimistic_pair() {
        let question = Message::optimistic_user("hi");
        let answer = Message::optimistic(MessageRole::Assistant, "hello");
        let server = vec![
            confirmed("m1", MessageRole::User, "hi"),
            confirmed("m2", MessageRole::Assistant, "hello"),
        ];

        let mapped = map_identifiers(&[question.clone(), answer.clone()], &server);
        assert_eq!(
            mapped,
            vec![
                (question.id.client_id().unwrap(), ServerMessageId::from("m1")),
                (answer.id.client_id().unwrap(), ServerMessageId::from("m2")),
            ]
        );
    }

    #[test]
    fn test_repeated_text_maps_in_order() {
        let older = confirmed("m1", MessageRole::User, "again");
        let newer = Message::optimistic_user("again");
        let server = vec![
            confirmed("m1", MessageRole::User, "again"),
            confirmed("m2", MessageRole::User, "again"),
        ];

        let mapped = map_identifiers(&[older, newer.clone()], &server);
        assert_eq!(
            mapped,
            vec![(newer.id.client_id().unwrap(), ServerMessageId::from("m2"))]
        );
    }

    #[test]
    fn test_unmatched_message_stays_unmapped() {
        let local = Message::optimistic_user("never arrived");
        let server = vec![confirmed("m1", MessageRole::User, "something else")];
        assert!(map_identifiers(&[local], &server).is_empty());
    }
}
