//! Pairing graph.
//!
//! A pairing is a permanent, symmetric edge between two codes and the only
//! thing that authorizes direct messages. Requests and declines are
//! stateless: they are forwarded live and forgotten, so a request to an
//! offline identity is simply lost.
//!
//! # Invariants
//!
//! - `is_paired(a, b) == is_paired(b, a)`
//! - Edges are created only by an accept, both directions at once
//! - Edges are never removed

use ghostchat_proto::{Code, ServerFrame};

use crate::{
    action::Notice,
    error::StoreError,
    store::{MemoryPairingStore, PairingStore},
};

/// Body of a direct message relayed between paired identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectPayload {
    /// Text message
    Text(String),
    /// Encoded audio, never inspected
    Voice(String),
}

/// Accepted pairings and the handlers that depend on them.
#[derive(Debug, Default)]
pub struct PairingGraph<S = MemoryPairingStore>
where
    S: PairingStore,
{
    store: S,
}

impl<S> PairingGraph<S>
where
    S: PairingStore,
{
    /// Create a graph over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Forward a pairing request from `from` to `to`. Records nothing.
    pub fn request_pairing(&self, from: &Code, to: &Code) -> Vec<Notice> {
        vec![Notice::to(to.clone(), ServerFrame::PairRequest { from: from.clone() })]
    }

    /// Create the edge `accepter ↔ requester` and confirm to both sides.
    ///
    /// Re-accepting an existing edge changes nothing but sends the
    /// confirmations again.
    pub fn accept_pairing(
        &mut self,
        accepter: &Code,
        requester: &Code,
    ) -> Result<Vec<Notice>, StoreError> {
        if self.store.insert_pair(accepter, requester)? {
            tracing::info!(accepter = %accepter, requester = %requester, "pairing established");
        }

        Ok(vec![
            Notice::to(accepter.clone(), ServerFrame::PairAccept { from: requester.clone() }),
            Notice::to(requester.clone(), ServerFrame::PairAccept { from: accepter.clone() }),
        ])
    }

    /// Tell `requester` that `decliner` declined. Records nothing.
    pub fn decline_pairing(&self, decliner: &Code, requester: &Code) -> Vec<Notice> {
        vec![Notice::to(requester.clone(), ServerFrame::PairDecline { from: decliner.clone() })]
    }

    /// Whether `a` and `b` are paired.
    pub fn is_paired(&self, a: &Code, b: &Code) -> Result<bool, StoreError> {
        self.store.contains_pair(a, b)
    }

    /// Every identity paired with `code`.
    pub fn partners(&self, code: &Code) -> Result<Vec<Code>, StoreError> {
        self.store.partners(code)
    }

    /// Relay a direct message from `from` to `to`, stamped with `now`.
    ///
    /// Fails closed: unpaired identities get no notices at all. Paired ones
    /// get the identical frame delivered to the recipient and echoed back on
    /// the sender's originating connection.
    pub fn relay_direct_message(
        &self,
        from: &Code,
        to: &Code,
        payload: DirectPayload,
        now: u64,
    ) -> Result<Vec<Notice>, StoreError> {
        if !self.is_paired(from, to)? {
            tracing::debug!(from = %from, to = %to, "unpaired direct message dropped");
            return Ok(Vec::new());
        }

        let frame = match payload {
            DirectPayload::Text(text) => {
                ServerFrame::DirectMsg { from: from.clone(), to: to.clone(), text, ts: now }
            },
            DirectPayload::Voice(audio) => {
                ServerFrame::VoiceMsg { from: from.clone(), to: to.clone(), audio, ts: now }
            },
        };

        Ok(vec![Notice::to(to.clone(), frame.clone()), Notice::origin(frame)])
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::action::Recipient;

    fn code(raw: &str) -> Code {
        Code::new(raw)
    }

    #[test]
    fn request_is_forwarded_without_state() {
        let graph = PairingGraph::<MemoryPairingStore>::default();
        let notices = graph.request_pairing(&code("01"), &code("02"));

        assert_eq!(
            notices,
            vec![Notice::to(code("02"), ServerFrame::PairRequest { from: code("01") })]
        );
        assert!(!graph.is_paired(&code("01"), &code("02")).unwrap());
    }

    #[test]
    fn accept_notifies_both_sides() {
        let mut graph = PairingGraph::<MemoryPairingStore>::default();
        let notices = graph.accept_pairing(&code("02"), &code("01")).unwrap();

        assert_eq!(
            notices,
            vec![
                Notice::to(code("02"), ServerFrame::PairAccept { from: code("01") }),
                Notice::to(code("01"), ServerFrame::PairAccept { from: code("02") }),
            ]
        );
        assert!(graph.is_paired(&code("01"), &code("02")).unwrap());
        assert!(graph.is_paired(&code("02"), &code("01")).unwrap());
    }

    #[test]
    fn re_accept_resends_confirmations() {
        let mut graph = PairingGraph::<MemoryPairingStore>::default();
        let first = graph.accept_pairing(&code("02"), &code("01")).unwrap();
        let second = graph.accept_pairing(&code("02"), &code("01")).unwrap();

        assert_eq!(first, second);
        assert_eq!(graph.partners(&code("01")).unwrap(), vec![code("02")]);
    }

    #[test]
    fn decline_records_nothing() {
        let graph = PairingGraph::<MemoryPairingStore>::default();
        let notices = graph.decline_pairing(&code("02"), &code("01"));

        assert_eq!(
            notices,
            vec![Notice::to(code("01"), ServerFrame::PairDecline { from: code("02") })]
        );
        assert!(!graph.is_paired(&code("01"), &code("02")).unwrap());
    }

    #[test]
    fn unpaired_direct_message_yields_nothing() {
        let graph = PairingGraph::<MemoryPairingStore>::default();
        let notices = graph
            .relay_direct_message(&code("01"), &code("02"), DirectPayload::Text("hi".into()), 1)
            .unwrap();
        assert!(notices.is_empty());
    }

    #[test]
    fn paired_direct_message_goes_to_recipient_and_origin() {
        let mut graph = PairingGraph::<MemoryPairingStore>::default();
        graph.accept_pairing(&code("02"), &code("01")).unwrap();

        let notices = graph
            .relay_direct_message(&code("01"), &code("02"), DirectPayload::Text("hi".into()), 99)
            .unwrap();

        let expected = ServerFrame::DirectMsg {
            from: code("01"),
            to: code("02"),
            text: "hi".to_string(),
            ts: 99,
        };
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].recipient, Recipient::Identity(code("02")));
        assert_eq!(notices[1].recipient, Recipient::Origin);
        assert!(notices.iter().all(|n| n.frame == expected));
    }

    #[test]
    fn voice_messages_follow_the_same_gate() {
        let mut graph = PairingGraph::<MemoryPairingStore>::default();
        let denied = graph
            .relay_direct_message(&code("01"), &code("02"), DirectPayload::Voice("AAAA".into()), 1)
            .unwrap();
        assert!(denied.is_empty());

        graph.accept_pairing(&code("01"), &code("02")).unwrap();
        let allowed = graph
            .relay_direct_message(&code("01"), &code("02"), DirectPayload::Voice("AAAA".into()), 1)
            .unwrap();
        assert!(matches!(allowed[0].frame, ServerFrame::VoiceMsg { .. }));
    }

    proptest! {
        #[test]
        fn pairing_is_symmetric_and_permanent(
            edges in proptest::collection::vec((0u8..8, 0u8..8), 0..32),
        ) {
            let mut graph = PairingGraph::<MemoryPairingStore>::default();
            for (a, b) in &edges {
                graph.accept_pairing(&code(&a.to_string()), &code(&b.to_string())).unwrap();
            }

            for (a, b) in &edges {
                let a = code(&a.to_string());
                let b = code(&b.to_string());
                prop_assert!(graph.is_paired(&a, &b).unwrap());
                prop_assert!(graph.is_paired(&b, &a).unwrap());
            }

            for a in 0u8..8 {
                for b in 0u8..8 {
                    let a = code(&a.to_string());
                    let b = code(&b.to_string());
                    prop_assert_eq!(
                        graph.is_paired(&a, &b).unwrap(),
                        graph.is_paired(&b, &a).unwrap()
                    );
                }
            }
        }
    }
}
