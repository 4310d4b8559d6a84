//! Preface and initial SETTINGS exchange (RFC 7540 §3.5, §6.5).

use h2_sans_io::{frame_type, ConnEvent, Connection, Frame, FrameHeader, Role, CONNECTION_PREFACE};

fn client_handshake_bytes() -> Vec<u8> {
    let mut bytes = CONNECTION_PREFACE.to_vec();
    bytes.extend_from_slice(&Frame::Settings { ack: false, params: vec![] }.encode(16_384).unwrap());
    bytes
}

#[test]
fn server_rejects_a_malformed_preface() {
    let mut conn = Connection::new(Role::Server);
    assert!(conn.receive(b"not the preface at all.........").is_err());
}

#[test]
fn server_waits_for_a_complete_preface_before_acting() {
    let mut conn = Connection::new(Role::Server);
    // Feed the preface byte by byte; nothing should happen until it's whole.
    for &b in &CONNECTION_PREFACE[..CONNECTION_PREFACE.len() - 1] {
        conn.receive(&[b]).unwrap();
        assert!(!conn.is_connected());
    }
}

#[test]
fn server_connects_and_replies_with_its_own_settings_and_an_ack() {
    let mut conn = Connection::new(Role::Server);
    conn.receive(&client_handshake_bytes()).unwrap();
    assert!(conn.is_connected());

    let events = conn.drain_events();
    let frames: Vec<_> = events.into_iter().filter_map(|e| if let ConnEvent::Frame(b) = e { Some(b) } else { None }).collect();
    assert_eq!(frames.len(), 2);

    let first_header = FrameHeader::parse(&frames[0]).unwrap();
    assert_eq!(first_header.frame_type, frame_type::SETTINGS);
    let second_header = FrameHeader::parse(&frames[1]).unwrap();
    assert_eq!(second_header.frame_type, frame_type::SETTINGS);
    assert_eq!(second_header.flags & 0x1, 0x1); // ACK of the client's SETTINGS
}

#[test]
fn client_start_emits_preface_before_any_other_frame() {
    let mut conn = Connection::new(Role::Client);
    conn.start().unwrap();
    let events = conn.drain_events();
    let frames: Vec<_> = events.into_iter().filter_map(|e| if let ConnEvent::Frame(b) = e { Some(b) } else { None }).collect();
    assert_eq!(&frames[0][..], CONNECTION_PREFACE);
    assert_eq!(frames.len(), 2);
}

#[test]
fn server_cannot_call_start() {
    let mut conn = Connection::new(Role::Server);
    assert!(conn.start().is_err());
}
