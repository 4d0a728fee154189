//! Model world - the reference implementation.
//!
//! Every rule here is written as directly as possible: plain vectors, linear
//! scans, no stores. The real router is correct when it produces the same
//! deliveries, in the same order, for every operation sequence.

use std::collections::BTreeSet;

use super::operation::{ClientId, Delivery, GroupRef, Operation};

/// A delivery and the client it reached.
pub type Addressed = (ClientId, Delivery);

#[derive(Debug, Clone)]
struct ModelGroup {
    creator: ClientId,
    members: Vec<ClientId>,
    pending: Vec<ClientId>,
    closed: bool,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Connected clients, ascending.
    pub connected: Vec<ClientId>,
    /// Accepted pairings as `(low, high)`, ascending.
    pub pairs: Vec<(ClientId, ClientId)>,
    /// Per group in creation order: `(members, pending, closed)`.
    pub groups: Vec<(Vec<ClientId>, Vec<ClientId>, bool)>,
}

/// Reference model of the whole server.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    num_clients: usize,
    connected: Vec<bool>,
    pairs: BTreeSet<(ClientId, ClientId)>,
    groups: Vec<ModelGroup>,
    now: u64,
}

impl ModelWorld {
    /// Create a world of `num_clients` registered, disconnected clients with
    /// the clock at `start_millis`.
    pub fn new(num_clients: usize, start_millis: u64) -> Self {
        Self {
            num_clients,
            connected: vec![false; num_clients],
            pairs: BTreeSet::new(),
            groups: Vec::new(),
            now: start_millis,
        }
    }

    /// Number of registered clients.
    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Number of groups created so far.
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Resolve a group reference against the groups created so far.
    pub fn resolve_group(&self, group: GroupRef) -> Option<usize> {
        if self.groups.is_empty() { None } else { Some(usize::from(group) % self.groups.len()) }
    }

    /// Whether `client` is registered and has a live socket.
    pub fn is_connected(&self, client: ClientId) -> bool {
        self.connected.get(usize::from(client)).copied().unwrap_or(false)
    }

    fn exists(&self, client: ClientId) -> bool {
        usize::from(client) < self.num_clients
    }

    fn is_paired(&self, a: ClientId, b: ClientId) -> bool {
        self.pairs.contains(&(a.min(b), a.max(b)))
    }

    /// Apply an operation and return the deliveries it causes, in order.
    pub fn apply(&mut self, op: &Operation) -> Vec<Addressed> {
        let mut out = Vec::new();

        match op {
            Operation::Connect { client } => {
                if self.exists(*client) && !self.is_connected(*client) {
                    self.connected[usize::from(*client)] = true;
                    out.push((*client, Delivery::Hello { client: *client }));
                }
            },
            Operation::Disconnect { client } => {
                if self.is_connected(*client) {
                    self.connected[usize::from(*client)] = false;
                }
            },
            Operation::PairRequest { from, to } => {
                if self.is_connected(*from) {
                    self.push(&mut out, *to, Delivery::PairRequest { from: *from });
                }
            },
            Operation::PairAccept { accepter, requester } => {
                if self.is_connected(*accepter) && self.exists(*requester) && accepter != requester
                {
                    self.pairs.insert(((*accepter).min(*requester), (*accepter).max(*requester)));
                    self.push(&mut out, *accepter, Delivery::PairAccept { from: *requester });
                    self.push(&mut out, *requester, Delivery::PairAccept { from: *accepter });
                }
            },
            Operation::PairDecline { decliner, requester } => {
                if self.is_connected(*decliner) {
                    self.push(&mut out, *requester, Delivery::PairDecline { from: *decliner });
                }
            },
            Operation::DirectMessage { from, to, text } => {
                if self.is_connected(*from) && self.is_paired(*from, *to) {
                    let delivery = Delivery::DirectMessage {
                        from: *from,
                        to: *to,
                        text: text.to_text(),
                        ts: self.now,
                    };
                    self.push(&mut out, *to, delivery.clone());
                    out.push((*from, delivery));
                }
            },
            Operation::CreateGroup { creator, invitees } => {
                if self.is_connected(*creator) {
                    self.create_group(&mut out, *creator, invitees);
                }
            },
            Operation::AcceptInvite { client, group } => {
                if let Some(index) = self.open_group(*client, *group) {
                    let g = &mut self.groups[index];
                    if let Some(pos) = g.pending.iter().position(|c| c == client) {
                        g.pending.remove(pos);
                        g.members.push(*client);
                    }
                    let delivery = Delivery::Join {
                        group: index,
                        client: *client,
                        members: g.members.clone(),
                        pending: g.pending.clone(),
                    };
                    self.broadcast(&mut out, index, &delivery);
                }
            },
            Operation::PostMessage { client, group, text } => {
                if let Some(index) = self.open_group(*client, *group)
                    && self.groups[index].members.contains(client)
                {
                    let delivery = Delivery::GroupMessage {
                        group: index,
                        from: *client,
                        text: text.to_text(),
                        ts: self.now,
                    };
                    self.broadcast(&mut out, index, &delivery);
                }
            },
            Operation::CloseGroup { client, group } => {
                if let Some(index) = self.open_group(*client, *group)
                    && self.groups[index].creator == *client
                {
                    self.groups[index].closed = true;
                    self.broadcast(&mut out, index, &Delivery::Closed { group: index });
                }
            },
            Operation::LeaveGroup { client, group } => {
                if let Some(index) = self.open_group(*client, *group)
                    && let Some(pos) = self.groups[index].members.iter().position(|c| c == client)
                {
                    self.groups[index].members.remove(pos);
                    let delivery = Delivery::Leave { group: index, client: *client };
                    self.broadcast(&mut out, index, &delivery);
                }
            },
            Operation::AdvanceTime { millis } => {
                self.now += u64::from(*millis);
            },
        }

        out
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            connected: (0..self.num_clients)
                .filter(|&i| self.connected[i])
                .filter_map(|i| ClientId::try_from(i).ok())
                .collect(),
            pairs: self.pairs.iter().copied().collect(),
            groups: self
                .groups
                .iter()
                .map(|g| (g.members.clone(), g.pending.clone(), g.closed))
                .collect(),
        }
    }

    fn create_group(&mut self, out: &mut Vec<Addressed>, creator: ClientId, invitees: &[ClientId]) {
        let mut pending = Vec::new();
        for &invitee in invitees {
            if invitee != creator && !pending.contains(&invitee) {
                pending.push(invitee);
            }
        }

        let index = self.groups.len();
        self.groups.push(ModelGroup {
            creator,
            members: vec![creator],
            pending: pending.clone(),
            closed: false,
        });

        for &invitee in &pending {
            let delivery =
                Delivery::Invite { group: index, members: vec![creator], pending: pending.clone() };
            self.push(out, invitee, delivery);
        }
        out.push((creator, Delivery::Created { group: index, members: vec![creator], pending }));
    }

    /// Group index if `client` is connected and the group exists and is open.
    fn open_group(&self, client: ClientId, group: GroupRef) -> Option<usize> {
        if !self.is_connected(client) {
            return None;
        }
        self.resolve_group(group).filter(|&index| !self.groups[index].closed)
    }

    fn broadcast(&self, out: &mut Vec<Addressed>, index: usize, delivery: &Delivery) {
        for &member in &self.groups[index].members {
            self.push(out, member, delivery.clone());
        }
    }

    fn push(&self, out: &mut Vec<Addressed>, to: ClientId, delivery: Delivery) {
        if self.is_connected(to) {
            out.push((to, delivery));
        }
    }
}
