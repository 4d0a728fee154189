//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! router delivers exactly what the reference model predicts.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld    RealWorld         Compare
//!      (reference)   (MessageRouter)   deliveries + state
//! ```

use std::collections::HashMap;

use ghostchat_core::{ConnectionId, MessageRouter, RouterAction, RouterConfig, SessionToken};
use ghostchat_harness::{
    Addressed, ClientId, Delivery, GroupRef, ModelWorld, ObservableState, Operation, SimEnv,
    SmallText,
};
use ghostchat_proto::{ClientFrame, Code, GroupId, ServerFrame};
use proptest::prelude::*;

/// Real system wrapper that mirrors `ModelWorld`'s interface.
struct RealWorld {
    router: MessageRouter<SimEnv>,
    env: SimEnv,
    num_clients: usize,
    /// Code for every possible `ClientId`; ids past `num_clients` get codes
    /// that were never registered.
    codes: Vec<Code>,
    clients: HashMap<Code, ClientId>,
    tokens: Vec<SessionToken>,
    conns: Vec<Option<ConnectionId>>,
    conn_owner: HashMap<ConnectionId, ClientId>,
    groups: Vec<GroupId>,
    group_index: HashMap<GroupId, usize>,
    next_conn: u64,
}

impl RealWorld {
    fn new(num_clients: usize, seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        let mut router = MessageRouter::new(env.clone(), RouterConfig::default());

        let mut codes = Vec::new();
        let mut tokens = Vec::new();
        for _ in 0..num_clients {
            let creds = router.register().unwrap();
            tokens.push(router.login(&creds.code, &creds.pin).unwrap());
            codes.push(creds.code);
        }
        for id in num_clients..=usize::from(u8::MAX) {
            codes.push(Code::new(format!("ghost-{id}")));
        }

        let clients = codes
            .iter()
            .enumerate()
            .map(|(id, code)| (code.clone(), ClientId::try_from(id).unwrap()))
            .collect();

        Self {
            router,
            env,
            num_clients,
            codes,
            clients,
            tokens,
            conns: vec![None; num_clients],
            conn_owner: HashMap::new(),
            groups: Vec::new(),
            group_index: HashMap::new(),
            next_conn: 1,
        }
    }

    fn code(&self, client: ClientId) -> Code {
        self.codes[usize::from(client)].clone()
    }

    fn conn(&self, client: ClientId) -> Option<ConnectionId> {
        self.conns.get(usize::from(client)).copied().flatten()
    }

    fn group(&self, group: GroupRef) -> Option<GroupId> {
        if self.groups.is_empty() {
            return None;
        }
        Some(self.groups[usize::from(group) % self.groups.len()].clone())
    }

    fn apply(&mut self, op: &Operation) -> Vec<Addressed> {
        match op {
            Operation::Connect { client } => {
                let index = usize::from(*client);
                if index >= self.num_clients || self.conns[index].is_some() {
                    return Vec::new();
                }
                let conn_id = ConnectionId::new(self.next_conn);
                self.next_conn += 1;

                let token = self.tokens[index].clone();
                let (_, actions) = self.router.connect(conn_id, Some(token.as_str())).unwrap();
                self.conns[index] = Some(conn_id);
                self.conn_owner.insert(conn_id, *client);
                self.translate(actions)
            },
            Operation::Disconnect { client } => {
                if let Some(conn_id) = self.conn(*client) {
                    let code = self.code(*client);
                    assert!(self.router.disconnect(conn_id, &code));
                    self.conns[usize::from(*client)] = None;
                }
                Vec::new()
            },
            Operation::PairRequest { from, to } => {
                self.send(*from, ClientFrame::PairRequest { to: self.code(*to) })
            },
            Operation::PairAccept { accepter, requester } => {
                self.send(*accepter, ClientFrame::PairAccept { from: self.code(*requester) })
            },
            Operation::PairDecline { decliner, requester } => {
                self.send(*decliner, ClientFrame::PairDecline { to: self.code(*requester) })
            },
            Operation::DirectMessage { from, to, text } => self.send(
                *from,
                ClientFrame::DirectMsg { to: self.code(*to), text: text.to_text() },
            ),
            Operation::CreateGroup { creator, invitees } => {
                let members = invitees.iter().map(|id| self.code(*id)).collect();
                self.send(*creator, ClientFrame::GroupCreate { name: None, members })
            },
            Operation::AcceptInvite { client, group } => match self.group(*group) {
                Some(group_id) => self.send(*client, ClientFrame::GroupAccept { group_id }),
                None => Vec::new(),
            },
            Operation::PostMessage { client, group, text } => match self.group(*group) {
                Some(group_id) => {
                    self.send(*client, ClientFrame::GroupMsg { group_id, text: text.to_text() })
                },
                None => Vec::new(),
            },
            Operation::CloseGroup { client, group } => match self.group(*group) {
                Some(group_id) => self.send(*client, ClientFrame::GroupClose { group_id }),
                None => Vec::new(),
            },
            Operation::LeaveGroup { client, group } => match self.group(*group) {
                Some(group_id) => self.send(*client, ClientFrame::GroupLeave { group_id }),
                None => Vec::new(),
            },
            Operation::AdvanceTime { millis } => {
                self.env.advance(u64::from(*millis));
                Vec::new()
            },
        }
    }

    /// Send `frame` from `client` if it is connected.
    fn send(&mut self, client: ClientId, frame: ClientFrame) -> Vec<Addressed> {
        let Some(conn_id) = self.conn(client) else {
            return Vec::new();
        };
        let code = self.code(client);
        let actions = self.router.handle_frame(conn_id, &code, frame);
        self.translate(actions)
    }

    fn translate(&mut self, actions: Vec<RouterAction>) -> Vec<Addressed> {
        actions
            .into_iter()
            .map(|action| match action {
                RouterAction::Send { conn_id, frame } => {
                    let owner = self.conn_owner[&conn_id];
                    (owner, self.delivery(frame))
                },
                RouterAction::Close { .. } => unreachable!("silent policy never closes"),
            })
            .collect()
    }

    fn client_of(&self, code: &Code) -> ClientId {
        self.clients[code]
    }

    fn clients_of(&self, codes: &[Code]) -> Vec<ClientId> {
        codes.iter().map(|c| self.client_of(c)).collect()
    }

    fn group_of(&mut self, id: GroupId) -> usize {
        if let Some(index) = self.group_index.get(&id) {
            return *index;
        }
        let index = self.groups.len();
        self.groups.push(id.clone());
        self.group_index.insert(id, index);
        index
    }

    fn delivery(&mut self, frame: ServerFrame) -> Delivery {
        match frame {
            ServerFrame::Hello { code } => Delivery::Hello { client: self.client_of(&code) },
            ServerFrame::PairRequest { from } => {
                Delivery::PairRequest { from: self.client_of(&from) }
            },
            ServerFrame::PairAccept { from } => {
                Delivery::PairAccept { from: self.client_of(&from) }
            },
            ServerFrame::PairDecline { from } => {
                Delivery::PairDecline { from: self.client_of(&from) }
            },
            ServerFrame::DirectMsg { from, to, text, ts } => Delivery::DirectMessage {
                from: self.client_of(&from),
                to: self.client_of(&to),
                text,
                ts,
            },
            ServerFrame::VoiceMsg { .. } => unreachable!("no voice operations are generated"),
            ServerFrame::GroupInvite { group } => Delivery::Invite {
                members: self.clients_of(&group.members),
                pending: self.clients_of(&group.pending),
                group: self.group_of(group.id),
            },
            ServerFrame::GroupCreated { group } => Delivery::Created {
                members: self.clients_of(&group.members),
                pending: self.clients_of(&group.pending),
                group: self.group_of(group.id),
            },
            ServerFrame::GroupJoin { group_id, code, members, pending } => Delivery::Join {
                group: self.group_of(group_id),
                client: self.client_of(&code),
                members: self.clients_of(&members),
                pending: self.clients_of(&pending),
            },
            ServerFrame::GroupMsg { group_id, from, text, ts } => Delivery::GroupMessage {
                group: self.group_of(group_id),
                from: self.client_of(&from),
                text,
                ts,
            },
            ServerFrame::GroupClosed { group_id } => {
                Delivery::Closed { group: self.group_of(group_id) }
            },
            ServerFrame::GroupLeave { group_id, code } => {
                Delivery::Leave { group: self.group_of(group_id), client: self.client_of(&code) }
            },
        }
    }

    fn observable_state(&self) -> ObservableState {
        let ids = || (0..self.num_clients).map(|i| ClientId::try_from(i).unwrap());

        let connected =
            ids().filter(|id| self.router.registry().is_connected(&self.code(*id))).collect();

        let mut pairs = Vec::new();
        for a in ids() {
            for b in ids().filter(|b| *b > a) {
                if self.router.pairing().is_paired(&self.code(a), &self.code(b)).unwrap() {
                    pairs.push((a, b));
                }
            }
        }

        let groups = self
            .groups
            .iter()
            .map(|id| {
                let group = self.router.groups().group(id).unwrap().unwrap();
                let members = self.clients_of(group.members());
                (members, self.clients_of(group.pending()), group.is_closed())
            })
            .collect();

        ObservableState { connected, pairs, groups }
    }

    /// Invariants that must hold after every operation.
    fn check_invariants(&self) {
        let pairing = self.router.pairing();
        for a in &self.codes[..self.num_clients] {
            for b in &self.codes[..self.num_clients] {
                assert_eq!(pairing.is_paired(a, b).unwrap(), pairing.is_paired(b, a).unwrap());
            }
        }

        for id in &self.groups {
            let group = self.router.groups().group(id).unwrap().unwrap();
            assert!(
                group.members().iter().all(|m| !group.is_pending(m)),
                "members and pending overlap in {id}"
            );
        }
    }
}

/// Strategy for generating operations.
///
/// Client ids range one past the registered clients so unknown identities
/// are exercised too.
fn operation_strategy(num_clients: u8) -> impl Strategy<Value = Operation> {
    let client = 0..=num_clients;
    let group = any::<GroupRef>();
    let text = any::<u8>().prop_map(|seed| SmallText { seed });

    prop_oneof![
        3 => client.clone().prop_map(|client| Operation::Connect { client }),
        1 => client.clone().prop_map(|client| Operation::Disconnect { client }),
        2 => (client.clone(), client.clone())
            .prop_map(|(from, to)| Operation::PairRequest { from, to }),
        3 => (client.clone(), client.clone())
            .prop_map(|(accepter, requester)| Operation::PairAccept { accepter, requester }),
        1 => (client.clone(), client.clone())
            .prop_map(|(decliner, requester)| Operation::PairDecline { decliner, requester }),
        3 => (client.clone(), client.clone(), text.clone())
            .prop_map(|(from, to, text)| Operation::DirectMessage { from, to, text }),
        2 => (client.clone(), prop::collection::vec(client.clone(), 0..4))
            .prop_map(|(creator, invitees)| Operation::CreateGroup { creator, invitees }),
        3 => (client.clone(), group.clone())
            .prop_map(|(client, group)| Operation::AcceptInvite { client, group }),
        3 => (client.clone(), group.clone(), text)
            .prop_map(|(client, group, text)| Operation::PostMessage { client, group, text }),
        1 => (client.clone(), group.clone())
            .prop_map(|(client, group)| Operation::CloseGroup { client, group }),
        1 => (client, group).prop_map(|(client, group)| Operation::LeaveGroup { client, group }),
        1 => any::<u16>().prop_map(|millis| Operation::AdvanceTime { millis }),
    ]
}

proptest! {
    /// Every operation yields identical deliveries, and the final state
    /// agrees.
    #[test]
    fn prop_model_matches_real(
        seed in any::<u64>(),
        num_clients in 2..5u8,
        ops in prop::collection::vec(operation_strategy(4), 0..80)
    ) {
        let mut model = ModelWorld::new(usize::from(num_clients), SimEnv::START_MILLIS);
        let mut real = RealWorld::new(usize::from(num_clients), seed);

        for (i, op) in ops.iter().enumerate() {
            let expected = model.apply(op);
            let actual = real.apply(op);

            prop_assert_eq!(
                &expected,
                &actual,
                "Divergence at operation {}: {:?}",
                i,
                op
            );

            real.check_invariants();
        }

        prop_assert_eq!(model.observable_state(), real.observable_state());
    }

    /// Deliveries never reach a client that is not connected.
    #[test]
    fn prop_deliveries_only_reach_connected_clients(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(3), 0..60)
    ) {
        let mut real = RealWorld::new(3, seed);

        for op in &ops {
            for (client, _) in real.apply(op) {
                prop_assert!(real.conn(client).is_some());
            }
        }
    }
}

#[test]
fn model_and_real_agree_on_group_walkthrough() {
    let ops = vec![
        Operation::Connect { client: 0 },
        Operation::Connect { client: 1 },
        Operation::Connect { client: 2 },
        Operation::CreateGroup { creator: 0, invitees: vec![1, 2, 1, 0] },
        Operation::AcceptInvite { client: 1, group: 0 },
        Operation::PostMessage { client: 2, group: 0, text: SmallText { seed: 1 } },
        Operation::AdvanceTime { millis: 5 },
        Operation::PostMessage { client: 1, group: 0, text: SmallText { seed: 2 } },
        Operation::Disconnect { client: 1 },
        Operation::PostMessage { client: 0, group: 0, text: SmallText { seed: 3 } },
        Operation::CloseGroup { client: 1, group: 0 },
        Operation::LeaveGroup { client: 0, group: 0 },
        Operation::CloseGroup { client: 0, group: 0 },
    ];

    let mut model = ModelWorld::new(3, SimEnv::START_MILLIS);
    let mut real = RealWorld::new(3, 7);

    for op in &ops {
        assert_eq!(model.apply(op), real.apply(op), "divergence at {op:?}");
    }
    assert_eq!(model.observable_state(), real.observable_state());

    // Leaving does not strip the creator of the close privilege.
    let state = real.observable_state();
    assert_eq!(state.groups, vec![(vec![1], vec![2], true)]);
}
