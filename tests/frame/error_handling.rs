//! Malformed-frame error paths.

use h2_sans_io::{flags, frame_type, Frame, FrameHeader};

#[test]
fn incomplete_header_returns_none_not_an_error() {
    assert!(FrameHeader::parse(&[0, 0, 1]).is_none());
}

#[test]
fn unknown_frame_type_is_silently_skipped() {
    let header = FrameHeader { length: 0, frame_type: 0x7f, flags: 0, stream_id: 0 };
    assert!(Frame::parse(&header, &[]).unwrap().is_none());
}

#[test]
fn rst_stream_requires_exactly_4_bytes() {
    let header = FrameHeader { length: 2, frame_type: frame_type::RST_STREAM, flags: 0, stream_id: 1 };
    assert!(Frame::parse(&header, &[0, 0]).is_err());
}

#[test]
fn ping_must_use_stream_zero() {
    let header = FrameHeader { length: 8, frame_type: frame_type::PING, flags: 0, stream_id: 1 };
    assert!(Frame::parse(&header, &[0; 8]).is_err());
}

#[test]
fn oversized_frame_is_rejected_at_encode_time() {
    let frame = Frame::Data { stream_id: 1, data: vec![0u8; 20_000], end_stream: false, padded: None };
    assert!(frame.encode(16_384).is_err());
}

#[test]
fn padded_headers_with_pad_length_exceeding_the_body_is_rejected() {
    let header = FrameHeader { length: 2, frame_type: frame_type::HEADERS, flags: flags::PADDED, stream_id: 1 };
    // pad_len byte claims 10, but only 1 byte of body follows.
    assert!(Frame::parse(&header, &[10, 0xff]).is_err());
}
