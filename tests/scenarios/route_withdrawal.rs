// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: route `(/z, conn=42)` is reachable; once that connection is
//! reported closed, the route is withdrawn and a later Interest for `/z`
//! is no longer forwarded anywhere.

use lci_forwarder_core::{
    codec::{
        control::{ControlMessage, ControlOp},
        Interest,
    },
    forwarder::InboundEvent,
};

use super::common::{CapturingTransport, deliver, name, new_forwarder};

#[test]
fn closing_a_connection_withdraws_its_routes() {
    let (mut fwd, ring) = new_forwarder();

    let route = fwd.connections().allocate();
    let route_tap = CapturingTransport::new();
    route.set_transport(route_tap.clone());

    let admin = fwd.connections().allocate();
    let add_route = ControlMessage::request(
        1,
        ControlOp::AddRoute { prefix: name(&["z"]), connection_id: route.id, weight: 1 },
    )
    .encode()
    .linearize();
    deliver(&mut fwd, &ring, admin.id, add_route);

    let requester = fwd.connections().allocate();
    let interest = Interest::new(name(&["z"]), 5).encode(5).linearize();
    deliver(&mut fwd, &ring, requester.id, interest.clone());
    assert_eq!(route_tap.sent().len(), 1, "route must be reachable before the connection closes");

    assert_eq!(fwd.metrics().snapshot().route_withdrawals, 0);
    ring.try_push(InboundEvent::ConnectionClosed { connection_id: route.id }).unwrap();
    fwd.tick(std::time::Instant::now());
    assert_eq!(fwd.metrics().snapshot().route_withdrawals, 1);

    let requester_2 = fwd.connections().allocate();
    deliver(&mut fwd, &ring, requester_2.id, interest);
    assert_eq!(route_tap.sent().len(), 1, "no further Interest should reach the withdrawn route");
}
