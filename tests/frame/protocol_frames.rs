//! Tests for the connection-scoped control frames: PING, SETTINGS, GOAWAY,
//! WINDOW_UPDATE.

use h2_sans_io::{frame_type, Frame, FrameHeader};

fn parse(bytes: &[u8]) -> Frame {
    let header = FrameHeader::parse(bytes).unwrap();
    Frame::parse(&header, &bytes[FrameHeader::SIZE..]).unwrap().unwrap()
}

#[test]
fn ping_ack_round_trips_through_the_wire() {
    let mut bytes = vec![0, 0, 8, frame_type::PING, 1, 0, 0, 0, 0];
    bytes.extend_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    match parse(&bytes) {
        Frame::Ping { ack, data } => {
            assert!(ack);
            assert_eq!(data, [1, 2, 3, 4, 5, 6, 7, 8]);
        }
        other => panic!("expected Ping, got {other:?}"),
    }
}

#[test]
fn window_update_zero_increment_is_rejected() {
    let bytes = [0, 0, 4, frame_type::WINDOW_UPDATE, 0, 0, 0, 0, 1, 0, 0, 0, 0];
    let header = FrameHeader::parse(&bytes).unwrap();
    assert!(Frame::parse(&header, &bytes[FrameHeader::SIZE..]).is_err());
}

#[test]
fn settings_on_a_nonzero_stream_is_a_protocol_error() {
    let bytes = [0, 0, 0, frame_type::SETTINGS, 0, 0, 0, 0, 1];
    let header = FrameHeader::parse(&bytes).unwrap();
    assert!(Frame::parse(&header, &[]).is_err());
}

#[test]
fn goaway_preserves_debug_data() {
    let mut bytes = vec![0, 0, 11, frame_type::GOAWAY, 0, 0, 0, 0, 0];
    bytes.extend_from_slice(&[0, 0, 0, 5]); // last_stream_id
    bytes.extend_from_slice(&[0, 0, 0, 1]); // error_code
    bytes.extend_from_slice(b"bye"); // body = 8 + 3 = 11 bytes
    match parse(&bytes) {
        Frame::GoAway { last_stream_id, error_code, debug_data } => {
            assert_eq!(last_stream_id, 5);
            assert_eq!(error_code, 1);
            assert_eq!(debug_data, b"bye");
        }
        other => panic!("expected GoAway, got {other:?}"),
    }
}
