#![cfg(feature = "advanced-tests")]
//! Property-based model tests for the registry.
//!
//! Random sequences of register, unregister and send operations over a small
//! set of users are applied both to a [`Registry`] and to a plain map model.
//! Stale handles are also registered again, which must never displace the
//! current one. After every step the two must agree on membership, and every delivered
//! message must be found on the buffer of the handle that was current when it
//! was sent.

use std::collections::HashMap;

use fanout::{ConnectionHandle, DropReason, Message, Outbound, Registry, SendOutcome};
use proptest::prelude::*;

const USERS: [&str; 3] = ["u0", "u1", "u2"];
const CAPACITY: usize = 3;

#[derive(Debug, Clone)]
enum Action {
    /// Register a fresh connection for a user.
    Connect(usize),
    /// Unregister the n-th connection ever built, which may be stale.
    Disconnect(usize),
    /// Register the n-th connection ever built again, which may be closed.
    Reconnect(usize),
    /// Send a message to a user.
    Send(usize),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..USERS.len()).prop_map(Action::Connect),
        (0..16usize).prop_map(Action::Disconnect),
        (0..16usize).prop_map(Action::Reconnect),
        (0..USERS.len()).prop_map(Action::Send),
    ]
}

struct Built {
    handle: ConnectionHandle,
    outbound: Outbound,
    expected: Vec<String>,
}

proptest! {
    #[test]
    fn registry_matches_model(actions in prop::collection::vec(action(), 1..64)) {
        let registry = Registry::default();
        let mut built: Vec<Built> = Vec::new();
        let mut current: HashMap<&str, usize> = HashMap::new();

        for (step, act) in actions.iter().enumerate() {
            match act {
                Action::Connect(u) => {
                    let (handle, outbound) = ConnectionHandle::builder(USERS[*u], "candidate")
                        .capacity(CAPACITY)
                        .build()
                        .expect("failed to build connection");
                    registry.register(handle.clone());
                    built.push(Built { handle, outbound, expected: Vec::new() });
                    current.insert(USERS[*u], built.len() - 1);
                }
                Action::Disconnect(n) => {
                    let Some(conn) = built.get(*n) else { continue };
                    let user = USERS.iter().copied().find(|u| *u == conn.handle.user_id())
                        .expect("known user");
                    let is_current = current.get(user) == Some(n);
                    prop_assert_eq!(registry.unregister(&conn.handle), is_current);
                    if is_current {
                        current.remove(user);
                    }
                }
                Action::Reconnect(n) => {
                    let Some(conn) = built.get(*n) else { continue };
                    let is_current = current.get(conn.handle.user_id()) == Some(n);
                    prop_assert_eq!(registry.register(conn.handle.clone()), is_current);
                }
                Action::Send(u) => {
                    let user = USERS[*u];
                    let payload = step.to_string();
                    let message = Message::new("chat", "x", user, payload.clone());
                    let outcome = registry.send_to_user(user, &message);
                    match current.get(user) {
                        None => prop_assert_eq!(outcome, SendOutcome::NotConnected),
                        Some(&idx) => {
                            let conn = &mut built[idx];
                            if conn.expected.len() < CAPACITY {
                                prop_assert_eq!(outcome, SendOutcome::Delivered);
                                conn.expected.push(payload);
                            } else {
                                prop_assert_eq!(
                                    outcome,
                                    SendOutcome::Dropped(DropReason::BufferFull)
                                );
                            }
                        }
                    }
                }
            }

            let mut users = registry.connected_users();
            users.sort();
            let mut expected: Vec<String> = current.keys().map(|u| (*u).to_owned()).collect();
            expected.sort();
            prop_assert_eq!(users, expected);
        }

        for (idx, conn) in built.iter_mut().enumerate() {
            let live = current.values().any(|&i| i == idx);
            prop_assert_eq!(conn.handle.is_closed(), !live);
            let received: Vec<String> = std::iter::from_fn(|| conn.outbound.try_recv())
                .map(|f| Message::decode(&f).expect("decode failed").payload)
                .collect();
            prop_assert_eq!(&received, &conn.expected);
        }
    }
}
