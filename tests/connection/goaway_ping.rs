//! PING keepalive and GOAWAY shutdown through the connection's public API.

use h2_sans_io::{error_code, frame_type, ConnEvent, Connection, Frame, FrameHeader, Role, CONNECTION_PREFACE};

fn connected_server() -> Connection {
    let mut conn = Connection::new(Role::Server);
    let mut bytes = CONNECTION_PREFACE.to_vec();
    bytes.extend_from_slice(&Frame::Settings { ack: false, params: vec![] }.encode(16_384).unwrap());
    conn.receive(&bytes).unwrap();
    conn.drain_events();
    conn
}

#[test]
fn inbound_ping_gets_an_immediate_ack_with_the_same_payload() {
    let mut conn = connected_server();
    let ping = Frame::Ping { ack: false, data: *b"abcdefgh" }.encode(16_384).unwrap();
    conn.receive(&ping).unwrap();

    let frames: Vec<_> = conn.drain_events().into_iter().filter_map(|e| if let ConnEvent::Frame(b) = e { Some(b) } else { None }).collect();
    assert_eq!(frames.len(), 1);
    let header = FrameHeader::parse(&frames[0]).unwrap();
    assert_eq!(header.frame_type, frame_type::PING);
    assert_eq!(header.flags & 0x1, 0x1);
    assert_eq!(&frames[0][FrameHeader::SIZE..], b"abcdefgh");
}

#[test]
fn outbound_ping_is_matched_by_its_ack() {
    let mut conn = connected_server();
    conn.send_ping(*b"ping0001").unwrap();
    conn.drain_events();

    let ack = Frame::Ping { ack: true, data: *b"ping0001" }.encode(16_384).unwrap();
    conn.receive(&ack).unwrap();

    let events = conn.drain_events();
    assert!(events.iter().any(|e| matches!(e, ConnEvent::Pong { data } if data == b"ping0001")));
}

#[test]
fn an_ack_for_a_ping_we_never_sent_is_silently_ignored() {
    let mut conn = connected_server();
    let ack = Frame::Ping { ack: true, data: *b"unknown!" }.encode(16_384).unwrap();
    conn.receive(&ack).unwrap();
    let events = conn.drain_events();
    assert!(!events.iter().any(|e| matches!(e, ConnEvent::Pong { .. })));
}

#[test]
fn sending_goaway_closes_the_connection_and_is_idempotent() {
    let mut conn = connected_server();
    conn.send_goaway(error_code::NO_ERROR, Vec::new()).unwrap();
    assert!(conn.is_closed());
    conn.drain_events();

    // A second call must not emit a second GOAWAY frame.
    conn.send_goaway(error_code::NO_ERROR, Vec::new()).unwrap();
    let frames: Vec<_> = conn.drain_events().into_iter().filter_map(|e| if let ConnEvent::Frame(b) = e { Some(b) } else { None }).collect();
    assert!(frames.is_empty());
}

#[test]
fn receiving_goaway_fires_the_event_and_blocks_new_streams() {
    let mut conn = connected_server();
    let goaway = Frame::GoAway { last_stream_id: 9, error_code: error_code::PROTOCOL_ERROR, debug_data: b"why".to_vec() }.encode(16_384).unwrap();
    conn.receive(&goaway).unwrap();
    assert!(conn.is_closed());

    let events = conn.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        ConnEvent::GoAway { last_stream_id: 9, error_code, debug_data } if *error_code == error_code::PROTOCOL_ERROR && debug_data == b"why"
    )));
    assert!(conn.new_stream().is_err());
}

#[test]
fn a_second_inbound_goaway_is_a_connection_error() {
    let mut conn = connected_server();
    let goaway = Frame::GoAway { last_stream_id: 0, error_code: error_code::NO_ERROR, debug_data: Vec::new() }.encode(16_384).unwrap();
    conn.receive(&goaway).unwrap();
    conn.drain_events();

    // The connection is already closed, so this should just surface
    // ConnectionClosed rather than re-dispatching into handle_goaway.
    assert!(conn.receive(&goaway).is_err());
}
