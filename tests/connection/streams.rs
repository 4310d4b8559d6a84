//! Stream lifecycle through the connection's public surface.

use h2_sans_io::{frame_type, ConnEvent, Connection, Frame, FrameHeader, H2Header, HpackEncoder, Role, StreamState, CONNECTION_PREFACE};

fn connected_server() -> Connection {
    let mut conn = Connection::new(Role::Server);
    let mut bytes = CONNECTION_PREFACE.to_vec();
    bytes.extend_from_slice(&Frame::Settings { ack: false, params: vec![] }.encode(16_384).unwrap());
    conn.receive(&bytes).unwrap();
    conn.drain_events();
    conn
}

fn send_request_headers(conn: &mut Connection, stream_id: u32, headers: &[H2Header], end_stream: bool) {
    let mut enc = HpackEncoder::new(4096);
    let block = enc.encode(headers);
    let frame = Frame::Headers {
        stream_id,
        header_block_fragment: block,
        end_stream,
        end_headers: true,
        priority: None,
        padded: None,
    }
    .encode(16_384)
    .unwrap();
    conn.receive(&frame).unwrap();
}

#[test]
fn valid_request_opens_a_stream_and_emits_a_stream_event() {
    let mut conn = connected_server();
    send_request_headers(
        &mut conn,
        1,
        &[H2Header::new(":method", "GET"), H2Header::new(":scheme", "https"), H2Header::new(":path", "/")],
        true,
    );
    let events = conn.drain_events();
    assert!(events.iter().any(|e| matches!(e, ConnEvent::Stream { stream_id: 1 })));
    assert_eq!(conn.stream(1).unwrap().state(), StreamState::HalfClosedRemote);
}

#[test]
fn missing_pseudo_header_resets_the_stream_without_closing_the_connection() {
    let mut conn = connected_server();
    // Missing :path.
    send_request_headers(&mut conn, 1, &[H2Header::new(":method", "GET"), H2Header::new(":scheme", "https")], true);
    let events = conn.drain_events();
    assert!(conn.is_connected());
    let rst_sent = events.iter().any(|e| {
        if let ConnEvent::Frame(bytes) = e {
            FrameHeader::parse(bytes).map(|h| h.frame_type == frame_type::RST_STREAM).unwrap_or(false)
        } else {
            false
        }
    });
    assert!(rst_sent);
    assert!(conn.stream(1).is_none());
}

#[test]
fn new_stream_allocates_even_ids_for_a_server() {
    // A server allocates even ids for its own (server-initiated push) streams.
    let mut conn = connected_server();
    let a = conn.new_stream().unwrap();
    let b = conn.new_stream().unwrap();
    assert_eq!(a % 2, 0);
    assert_eq!(b, a + 2);
}

#[test]
fn data_after_end_stream_headers_is_a_stream_error() {
    let mut conn = connected_server();
    send_request_headers(
        &mut conn,
        1,
        &[H2Header::new(":method", "GET"), H2Header::new(":scheme", "https"), H2Header::new(":path", "/")],
        true,
    );
    conn.drain_events();
    let data = Frame::Data { stream_id: 1, data: b"oops".to_vec(), end_stream: false, padded: None }.encode(16_384).unwrap();
    conn.receive(&data).unwrap();
    // The stream was half-closed-remote already; DATA afterward resets it
    // locally rather than tearing down the whole connection.
    assert!(conn.is_connected());
}

#[test]
fn content_length_mismatch_resets_the_stream() {
    let mut conn = connected_server();
    send_request_headers(
        &mut conn,
        1,
        &[
            H2Header::new(":method", "POST"),
            H2Header::new(":scheme", "https"),
            H2Header::new(":path", "/"),
            H2Header::new("content-length", "10"),
        ],
        false,
    );
    conn.drain_events();
    let data = Frame::Data { stream_id: 1, data: b"short".to_vec(), end_stream: true, padded: None }.encode(16_384).unwrap();
    conn.receive(&data).unwrap();
    assert!(conn.is_connected());
    assert!(conn.stream(1).is_none());
}
