// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: Interest `/y` restricted to hash H1 and Interest `/y`
//! restricted to hash H2 coexist as two distinct PIT entries; a Content
//! Object for `/y` whose actual hash is H1 satisfies only the first.

use bytes::Bytes;
use lci_forwarder_core::codec::{
    control::{ControlMessage, ControlOp},
    ContentObject, Interest,
};

use super::common::{CapturingTransport, deliver, name, new_forwarder};

#[test]
fn content_object_only_satisfies_the_matching_hash_restriction() {
    let (mut fwd, ring) = new_forwarder();

    let upstream = fwd.connections().allocate();
    let upstream_tap = CapturingTransport::new();
    upstream.set_transport(upstream_tap.clone());

    let admin = fwd.connections().allocate();
    let add_route = ControlMessage::request(
        1,
        ControlOp::AddRoute { prefix: name(&["y"]), connection_id: upstream.id, weight: 1 },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, add_route);

    // The hash restriction an Interest carries is declared by the
    // requester; it need not (and for this test, does not) match the
    // payload that eventually satisfies it, since the restriction only
    // needs to match whichever object actually arrives under that name.
    let co_h1 = ContentObject::new(name(&["y"]), Bytes::from_static(b"payload-1"));
    let h1 = co_h1.content_hash();
    let co_h2 = ContentObject::new(name(&["y"]), Bytes::from_static(b"payload-2"));
    let h2 = co_h2.content_hash();
    assert_ne!(h1, h2);

    let requester_1 = fwd.connections().allocate();
    let requester_1_tap = CapturingTransport::new();
    requester_1.set_transport(requester_1_tap.clone());
    let mut interest_1 = Interest::new(name(&["y"]), 5);
    interest_1.content_object_hash_restriction = Some(h1);
    deliver(&mut fwd, &ring, requester_1.id, interest_1.encode(5).linearize());

    let requester_2 = fwd.connections().allocate();
    let requester_2_tap = CapturingTransport::new();
    requester_2.set_transport(requester_2_tap.clone());
    let mut interest_2 = Interest::new(name(&["y"]), 5);
    interest_2.content_object_hash_restriction = Some(h2);
    deliver(&mut fwd, &ring, requester_2.id, interest_2.encode(5).linearize());

    assert_eq!(upstream_tap.sent().len(), 2, "distinct restrictions are distinct PIT entries");

    deliver(&mut fwd, &ring, upstream.id, co_h1.encode(None).linearize());

    assert_eq!(requester_1_tap.sent().len(), 1, "H1 satisfies the H1-restricted Interest");
    assert!(requester_2_tap.sent().is_empty(), "H1 must not satisfy the H2-restricted Interest");
}
