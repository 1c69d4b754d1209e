// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: insert `(/foo, conn=10)` and `(/foo, conn=11)`; an Interest for
//! `/foo` arriving on conn=10 forwards to {11} only — a connection never
//! receives back an Interest it carried in.

use lci_forwarder_core::codec::{
    control::{ControlMessage, ControlOp},
    Interest,
};

use super::common::{CapturingTransport, deliver, name, new_forwarder};

#[test]
fn ingress_connection_is_excluded_from_egress() {
    let (mut fwd, ring) = new_forwarder();

    let peer_a = fwd.connections().allocate();
    let peer_a_tap = CapturingTransport::new();
    peer_a.set_transport(peer_a_tap.clone());

    let peer_b = fwd.connections().allocate();
    let peer_b_tap = CapturingTransport::new();
    peer_b.set_transport(peer_b_tap.clone());

    let admin = fwd.connections().allocate();
    for conn in [&peer_a, &peer_b] {
        let add_route = ControlMessage::request(
            1,
            ControlOp::AddRoute { prefix: name(&["foo"]), connection_id: conn.id, weight: 1 },
        )
        .encode()
        .linearize();
        deliver(&mut fwd, &ring, admin.id, add_route);
    }

    let interest = Interest::new(name(&["foo"]), 5).encode(5).linearize();
    deliver(&mut fwd, &ring, peer_a.id, interest);

    assert!(peer_a_tap.sent().is_empty(), "conn=10 must not receive its own Interest back");
    assert_eq!(peer_b_tap.sent().len(), 1);
}
