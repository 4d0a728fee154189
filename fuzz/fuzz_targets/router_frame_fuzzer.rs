//! Fuzz target for [`MessageRouter`] frame handling
//!
//! Prevent authorization bypass via crafted or malformed frames
//!
//! # Strategy
//!
//! - Raw text: arbitrary strings fed through `handle_text`, including
//!   truncated and mistyped JSON
//! - Structured frames: well-formed frames with arbitrary codes and group
//!   ids, mixing real and unknown identifiers
//! - Connection churn: sockets open and close between frames
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - Every `Send` targets a connection the driver has opened and not closed
//! - A delivered `direct_msg` or `voice_msg` implies the two codes are paired
//! - A delivered `group_msg` implies the sender is a member of an open group
//! - `members ∩ pending = ∅` for every group after every event

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use ghostchat_core::{ConnectionId, MessageRouter, RouterAction, RouterConfig, SessionToken};
use ghostchat_harness::SimEnv;
use ghostchat_proto::{ClientFrame, Code, GroupId, ServerFrame};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    RawText { client: u8, text: String },
    Frame { client: u8, frame: FuzzedFrame },
    Connect { client: u8 },
    Disconnect { client: u8 },
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzedFrame {
    PairRequest { to: u8 },
    PairAccept { from: u8 },
    PairDecline { to: u8 },
    DirectMsg { to: u8, text: String },
    VoiceMsg { to: u8, audio: String },
    GroupCreate { name: Option<String>, members: Vec<u8> },
    GroupAccept { group: u8 },
    GroupMsg { group: u8, text: String },
    GroupClose { group: u8 },
    GroupLeave { group: u8 },
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    seed: u64,
    events: Vec<FuzzEvent>,
}

const CLIENTS: usize = 4;

struct Harness {
    router: MessageRouter<SimEnv>,
    codes: Vec<Code>,
    tokens: Vec<SessionToken>,
    conns: Vec<Option<ConnectionId>>,
    open: HashSet<ConnectionId>,
    groups: Vec<GroupId>,
    next_conn: u64,
}

impl Harness {
    fn new(seed: u64) -> Self {
        let mut router = MessageRouter::new(SimEnv::with_seed(seed), RouterConfig::default());
        let mut codes = Vec::new();
        let mut tokens = Vec::new();
        for _ in 0..CLIENTS {
            let Ok(creds) = router.register() else { unreachable!() };
            let Ok(token) = router.login(&creds.code, &creds.pin) else { unreachable!() };
            codes.push(creds.code);
            tokens.push(token);
        }

        Self {
            router,
            codes,
            tokens,
            conns: vec![None; CLIENTS],
            open: HashSet::new(),
            groups: Vec::new(),
            next_conn: 1,
        }
    }

    /// Registered code for small ids, an unknown code otherwise.
    fn code(&self, id: u8) -> Code {
        self.codes.get(usize::from(id)).cloned().unwrap_or_else(|| Code::new(format!("{id:02}x")))
    }

    fn group(&self, group: u8) -> GroupId {
        if self.groups.is_empty() {
            return GroupId::new(format!("g_{group:012x}"));
        }
        self.groups[usize::from(group) % self.groups.len()].clone()
    }

    fn client_frame(&self, frame: FuzzedFrame) -> ClientFrame {
        match frame {
            FuzzedFrame::PairRequest { to } => ClientFrame::PairRequest { to: self.code(to) },
            FuzzedFrame::PairAccept { from } => ClientFrame::PairAccept { from: self.code(from) },
            FuzzedFrame::PairDecline { to } => ClientFrame::PairDecline { to: self.code(to) },
            FuzzedFrame::DirectMsg { to, text } => {
                ClientFrame::DirectMsg { to: self.code(to), text }
            },
            FuzzedFrame::VoiceMsg { to, audio } => {
                ClientFrame::VoiceMsg { to: self.code(to), audio }
            },
            FuzzedFrame::GroupCreate { name, members } => ClientFrame::GroupCreate {
                name,
                members: members.into_iter().map(|id| self.code(id)).collect(),
            },
            FuzzedFrame::GroupAccept { group } => {
                ClientFrame::GroupAccept { group_id: self.group(group) }
            },
            FuzzedFrame::GroupMsg { group, text } => {
                ClientFrame::GroupMsg { group_id: self.group(group), text }
            },
            FuzzedFrame::GroupClose { group } => {
                ClientFrame::GroupClose { group_id: self.group(group) }
            },
            FuzzedFrame::GroupLeave { group } => {
                ClientFrame::GroupLeave { group_id: self.group(group) }
            },
        }
    }

    fn run(&mut self, event: FuzzEvent) {
        let index = |client: u8| usize::from(client) % CLIENTS;

        let actions = match event {
            FuzzEvent::Connect { client } => {
                let i = index(client);
                if self.conns[i].is_some() {
                    return;
                }
                let conn_id = ConnectionId::new(self.next_conn);
                self.next_conn += 1;
                let Ok((_, actions)) = self.router.connect(conn_id, Some(self.tokens[i].as_str()))
                else {
                    unreachable!("valid token refused");
                };
                self.conns[i] = Some(conn_id);
                self.open.insert(conn_id);
                actions
            },
            FuzzEvent::Disconnect { client } => {
                let i = index(client);
                if let Some(conn_id) = self.conns[i].take() {
                    self.router.disconnect(conn_id, &self.codes[i]);
                    self.open.remove(&conn_id);
                }
                return;
            },
            FuzzEvent::RawText { client, text } => {
                let i = index(client);
                let Some(conn_id) = self.conns[i] else { return };
                self.router.handle_text(conn_id, &self.codes[i], &text)
            },
            FuzzEvent::Frame { client, frame } => {
                let i = index(client);
                let Some(conn_id) = self.conns[i] else { return };
                let frame = self.client_frame(frame);
                self.router.handle_frame(conn_id, &self.codes[i], frame)
            },
        };

        self.check(&actions);
    }

    fn check(&mut self, actions: &[RouterAction]) {
        for action in actions {
            assert!(self.open.contains(&action.conn_id()), "action for unknown connection");

            let RouterAction::Send { frame, .. } = action else {
                unreachable!("silent policy never closes");
            };

            match frame {
                ServerFrame::DirectMsg { from, to, .. }
                | ServerFrame::VoiceMsg { from, to, .. } => {
                    assert!(matches!(self.router.pairing().is_paired(from, to), Ok(true)));
                },
                ServerFrame::GroupMsg { group_id, from, .. } => {
                    let Ok(Some(group)) = self.router.groups().group(group_id) else {
                        unreachable!("message for missing group");
                    };
                    assert!(!group.is_closed());
                    assert!(group.is_member(from));
                },
                ServerFrame::GroupCreated { group } => {
                    if !self.groups.contains(&group.id) {
                        self.groups.push(group.id.clone());
                    }
                },
                _ => {},
            }
        }

        for id in &self.groups {
            let Ok(Some(group)) = self.router.groups().group(id) else {
                unreachable!("created group vanished");
            };
            assert!(group.members().iter().all(|m| !group.is_pending(m)));
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut harness = Harness::new(input.seed);
    for event in input.events {
        harness.run(event);
    }
});
