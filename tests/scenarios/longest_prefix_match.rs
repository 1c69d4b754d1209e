// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: insert `(/foo, conn=10)` then `(/foo/bar, conn=11)`; an
//! Interest for `/foo/bar/baz` arriving on a third connection forwards only
//! to the deepest matching route.

use lci_forwarder_core::codec::{
    FixedHeader,
    control::{ControlMessage, ControlOp},
    Interest,
};

use super::common::{CapturingTransport, deliver, name, new_forwarder};

#[test]
fn longest_prefix_wins() {
    let (mut fwd, ring) = new_forwarder();

    let shallow = fwd.connections().allocate();
    let shallow_tap = CapturingTransport::new();
    shallow.set_transport(shallow_tap.clone());

    let deep = fwd.connections().allocate();
    let deep_tap = CapturingTransport::new();
    deep.set_transport(deep_tap.clone());

    let admin = fwd.connections().allocate();
    let add_foo = ControlMessage::request(
        1,
        ControlOp::AddRoute { prefix: name(&["foo"]), connection_id: shallow.id, weight: 1 },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, add_foo);

    let add_foo_bar = ControlMessage::request(
        2,
        ControlOp::AddRoute {
            prefix: name(&["foo", "bar"]),
            connection_id: deep.id,
            weight: 1,
        },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, add_foo_bar);

    let requester = fwd.connections().allocate();
    let interest =
        Interest::new(name(&["foo", "bar", "baz"]), 10).encode(10).linearize();
    deliver(&mut fwd, &ring, requester.id, interest);

    assert!(shallow_tap.sent().is_empty(), "the shallow route must not receive the Interest");
    let forwarded = deep_tap.sent();
    assert_eq!(forwarded.len(), 1);
    let hdr = FixedHeader::parse(&forwarded[0]).unwrap();
    assert_eq!(hdr.hop_limit, 9);
}
