//! Tests for HPACK encoding (RFC 7541 §4), against the public API only.

use h2_sans_io::{H2Header, HpackDecoder, HpackEncoder};

#[test]
fn encode_decode_roundtrip() {
    let mut encoder = HpackEncoder::new(4096);
    let mut decoder = HpackDecoder::new(4096);
    let headers = vec![H2Header::new(":status", "200"), H2Header::new("content-type", "application/json")];
    let encoded = encoder.encode(&headers);
    let decoded = decoder.decode(&encoded).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].name_str(), ":status");
    assert_eq!(decoded[1].value_str(), "application/json");
}

#[test]
fn literal_header_roundtrips() {
    let mut encoder = HpackEncoder::new(4096);
    let mut decoder = HpackDecoder::new(4096);
    let headers = vec![H2Header::new("x-custom", "value")];
    let encoded = encoder.encode(&headers);
    let decoded = decoder.decode(&encoded).unwrap();
    assert_eq!(decoded[0].name_str(), "x-custom");
    assert_eq!(decoded[0].value_str(), "value");
}

#[test]
fn static_table_hit_produces_a_single_indexed_byte() {
    let mut encoder = HpackEncoder::new(4096);
    // ":method: GET" is static table index 2.
    let encoded = encoder.encode(&[H2Header::new(":method", "GET")]);
    assert_eq!(encoded, vec![0x82]);
}

/// RFC 7541 C.3.1: "First Request" without Huffman coding.
#[test]
fn matches_rfc7541_first_request_vector_without_huffman() {
    use h2_sans_io::hpack::{EncoderConfig, HuffmanPolicy};
    let mut encoder = HpackEncoder::with_config(4096, EncoderConfig { huffman: HuffmanPolicy::Never, ..Default::default() });
    let headers = vec![
        H2Header::new(":method", "GET"),
        H2Header::new(":scheme", "http"),
        H2Header::new(":path", "/"),
        H2Header::new(":authority", "www.example.com"),
    ];
    let encoded = encoder.encode(&headers);
    let mut expected: Vec<u8> = vec![0x82, 0x86, 0x84, 0x41, 0x0f];
    expected.extend_from_slice(b"www.example.com");
    assert_eq!(encoded, expected);

    let mut decoder = HpackDecoder::new(4096);
    let decoded = decoder.decode(&encoded).unwrap();
    assert_eq!(decoded.len(), 4);
    assert_eq!(decoded[3].value_str(), "www.example.com");
}

#[test]
fn repeated_requests_reuse_the_dynamic_table() {
    let mut encoder = HpackEncoder::new(4096);
    let mut decoder = HpackDecoder::new(4096);
    let request = vec![H2Header::new(":method", "GET"), H2Header::new(":authority", "www.example.com")];

    let first = encoder.encode(&request);
    let second = encoder.encode(&request);
    assert!(second.len() < first.len());

    assert_eq!(decoder.decode(&first).unwrap().len(), 2);
    assert_eq!(decoder.decode(&second).unwrap().len(), 2);
}

#[test]
fn table_size_update_shrinks_what_the_encoder_may_store() {
    let mut encoder = HpackEncoder::new(4096);
    encoder.notify_max_dynamic_table_size(0);
    let block = encoder.encode(&[H2Header::new("x-custom", "value")]);

    let mut decoder = HpackDecoder::new(4096);
    let decoded = decoder.decode(&block).unwrap();
    assert_eq!(decoded[0].value_str(), "value");
    assert_eq!(encoder.context().dynamic.len(), 0);
}

#[test]
fn cookie_is_never_indexed_even_on_repeat() {
    let mut encoder = HpackEncoder::new(4096);
    let headers = vec![H2Header::new("set-cookie", "session=xyz"), H2Header::new("set-cookie", "theme=dark")];
    let first = encoder.encode(&[headers[0].clone()]);
    let second = encoder.encode(&[headers[1].clone()]);
    // Neither encode should have produced an indexed reference to the other.
    assert_eq!(first[0] & 0xf0, 0b0001_0000);
    assert_eq!(second[0] & 0xf0, 0b0001_0000);
}
