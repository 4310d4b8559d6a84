//! Parsing hand-crafted wire bytes into typed frames (RFC 7540 §6).

use h2_sans_io::{Frame, FrameHeader};

#[test]
fn parses_a_data_frame() {
    let mut bytes = vec![0, 0, 5, 0, 1, 0, 0, 0, 1];
    bytes.extend_from_slice(b"hello");
    let header = FrameHeader::parse(&bytes).unwrap();
    assert_eq!(header.length, 5);
    assert_eq!(header.stream_id, 1);
    let frame = Frame::parse(&header, &bytes[FrameHeader::SIZE..]).unwrap().unwrap();
    match frame {
        Frame::Data { stream_id, data, end_stream, .. } => {
            assert_eq!(stream_id, 1);
            assert_eq!(data, b"hello");
            assert!(!end_stream);
        }
        other => panic!("expected Data, got {other:?}"),
    }
}

#[test]
fn end_stream_flag_is_reflected() {
    let bytes = vec![0, 0, 0, 0, 0x1, 0, 0, 0, 3];
    let header = FrameHeader::parse(&bytes).unwrap();
    let frame = Frame::parse(&header, &[]).unwrap().unwrap();
    assert!(matches!(frame, Frame::Data { end_stream: true, .. }));
}

#[test]
fn parses_headers_frame_with_priority() {
    // length=11, type=1 (HEADERS), flags=0x24 (END_HEADERS|PRIORITY), stream 1
    let mut bytes = vec![0, 0, 11, 1, 0x24, 0, 0, 0, 1];
    bytes.extend_from_slice(&[0, 0, 0, 3]); // dependency = 3, not exclusive
    bytes.push(9); // weight byte -> true weight 10
    bytes.extend_from_slice(b"fragment");
    let header = FrameHeader::parse(&bytes).unwrap();
    let frame = Frame::parse(&header, &bytes[FrameHeader::SIZE..]).unwrap().unwrap();
    match frame {
        Frame::Headers { priority: Some(p), header_block_fragment, end_headers, .. } => {
            assert_eq!(p.dependency, 3);
            assert!(!p.exclusive);
            assert_eq!(p.weight, 10);
            assert_eq!(header_block_fragment, b"fragment");
            assert!(end_headers);
        }
        other => panic!("expected Headers with priority, got {other:?}"),
    }
}

#[test]
fn settings_frame_parses_key_value_pairs() {
    let mut bytes = vec![0, 0, 12, 4, 0, 0, 0, 0, 0];
    bytes.extend_from_slice(&[0, 1, 0, 0, 0x10, 0]); // HEADER_TABLE_SIZE = 4096
    bytes.extend_from_slice(&[0, 3, 0, 0, 0, 100]); // MAX_CONCURRENT_STREAMS = 100
    let header = FrameHeader::parse(&bytes).unwrap();
    let frame = Frame::parse(&header, &bytes[FrameHeader::SIZE..]).unwrap().unwrap();
    match frame {
        Frame::Settings { ack, params } => {
            assert!(!ack);
            assert_eq!(params, vec![(1, 4096), (3, 100)]);
        }
        other => panic!("expected Settings, got {other:?}"),
    }
}

#[test]
fn stream_id_high_bit_is_masked_off() {
    // Reserved high bit of the stream-id field must be ignored (RFC 7540 §4.1).
    let bytes = [0, 0, 0, 0, 0, 0x80, 0, 0, 7];
    let header = FrameHeader::parse(&bytes).unwrap();
    assert_eq!(header.stream_id, 7);
}
