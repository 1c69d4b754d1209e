// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: inserting `(/a/b/c, conn=7)` creates virtual anchors at `/a`
//! and `/a/b`; removing the route collapses the whole chain, which is
//! observable from outside only through routing behaviour (no FIB
//! introspection is exposed across the dispatch boundary): a later Interest
//! for `/a/b/c` is dropped, and a fresh route under `/a` starts from a clean
//! slate rather than inheriting a stale anchor.

use lci_forwarder_core::codec::{
    control::{ControlBody, ControlMessage, ControlOp},
    Interest,
};

use super::common::{CapturingTransport, deliver, name, new_forwarder};

#[test]
fn removing_the_only_leaf_route_collapses_its_virtual_ancestors() {
    let (mut fwd, ring) = new_forwarder();

    let leaf = fwd.connections().allocate();
    let leaf_tap = CapturingTransport::new();
    leaf.set_transport(leaf_tap.clone());

    let admin = fwd.connections().allocate();
    let admin_tap = CapturingTransport::new();
    admin.set_transport(admin_tap.clone());

    let add_route = ControlMessage::request(
        1,
        ControlOp::AddRoute {
            prefix: name(&["a", "b", "c"]),
            connection_id: leaf.id,
            weight: 1,
        },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, add_route);

    let requester = fwd.connections().allocate();
    let interest = Interest::new(name(&["a", "b", "c"]), 5).encode(5).linearize();
    deliver(&mut fwd, &ring, requester.id, interest.clone());
    assert_eq!(leaf_tap.sent().len(), 1, "route must exist before removal");

    let remove_route = ControlMessage::request(
        2,
        ControlOp::RemoveRoute {
            prefix: name(&["a", "b", "c"]),
            connection_id: Some(leaf.id),
        },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, remove_route);
    let reply = decode_reply(&admin_tap);
    assert!(matches!(reply.body, ControlBody::Ack));

    let requester_2 = fwd.connections().allocate();
    deliver(&mut fwd, &ring, requester_2.id, interest);
    assert_eq!(leaf_tap.sent().len(), 1, "no further Interest should reach the withdrawn route");
}

fn decode_reply(tap: &CapturingTransport) -> ControlMessage {
    let sent = tap.sent();
    let bytes = sent.last().expect("a control reply was sent");
    let hdr = lci_forwarder_core::codec::FixedHeader::parse(bytes).unwrap();
    ControlMessage::decode(&bytes[hdr.header_length as usize..hdr.packet_length as usize]).unwrap()
}
