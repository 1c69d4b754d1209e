// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: Interest `/x` on conn=1 forwards per FIB to conn=99; Interest
//! `/x` on conn=2 while the entry is still live aggregates instead of
//! forwarding again; a Content Object for `/x` is then forwarded to both 1
//! and 2, and the PIT entry is gone.

use bytes::Bytes;
use lci_forwarder_core::codec::{
    control::{ControlMessage, ControlOp},
    ContentObject, Interest,
};

use super::common::{CapturingTransport, deliver, name, new_forwarder};

#[test]
fn duplicate_interests_aggregate_and_one_content_object_satisfies_both() {
    let (mut fwd, ring) = new_forwarder();

    let upstream = fwd.connections().allocate();
    let upstream_tap = CapturingTransport::new();
    upstream.set_transport(upstream_tap.clone());

    let admin = fwd.connections().allocate();
    let add_route = ControlMessage::request(
        1,
        ControlOp::AddRoute { prefix: name(&["x"]), connection_id: upstream.id, weight: 1 },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, add_route);

    let requester_1 = fwd.connections().allocate();
    let requester_1_tap = CapturingTransport::new();
    requester_1.set_transport(requester_1_tap.clone());

    let requester_2 = fwd.connections().allocate();
    let requester_2_tap = CapturingTransport::new();
    requester_2.set_transport(requester_2_tap.clone());

    let interest = Interest::new(name(&["x"]), 5).encode(5).linearize();
    deliver(&mut fwd, &ring, requester_1.id, interest.clone());
    assert_eq!(upstream_tap.sent().len(), 1, "first Interest is forwarded");

    deliver(&mut fwd, &ring, requester_2.id, interest);
    assert_eq!(upstream_tap.sent().len(), 1, "aggregated Interest must not be forwarded again");

    let co = ContentObject::new(name(&["x"]), Bytes::from_static(b"payload")).encode(None).linearize();
    deliver(&mut fwd, &ring, upstream.id, co);

    assert_eq!(requester_1_tap.sent().len(), 1);
    assert_eq!(requester_2_tap.sent().len(), 1);
}
