//! Tests for HPACK decoding, wire bytes in, headers out.

use h2_sans_io::HpackDecoder;

#[test]
fn decode_indexed_header() {
    let mut decoder = HpackDecoder::new(4096);
    let headers = decoder.decode(&[0x82]).unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(headers[0].name_str(), ":method");
    assert_eq!(headers[0].value_str(), "GET");
}

#[test]
fn decode_multiple_indexed_headers() {
    let mut decoder = HpackDecoder::new(4096);
    let headers = decoder.decode(&[0x82, 0x86, 0x84]).unwrap();
    assert_eq!(headers.len(), 3);
}

#[test]
fn decode_literal_with_incremental_indexing() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x40, 0x06, b'c', b'u', b's', b't', b'o', b'm', 0x05, b'v', b'a', b'l', b'u', b'e'];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name_str(), "custom");
    assert_eq!(headers[0].value_str(), "value");
    assert_eq!(decoder.context().dynamic.len(), 1);
}

#[test]
fn decode_literal_with_an_indexed_name() {
    let mut decoder = HpackDecoder::new(4096);
    let data = [0x41, 0x0b, b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c', b'o', b'm'];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers[0].name_str(), ":authority");
    assert_eq!(headers[0].value_str(), "example.com");
}

#[test]
fn decode_status_200() {
    let mut decoder = HpackDecoder::new(4096);
    let headers = decoder.decode(&[0x88]).unwrap();
    assert_eq!(headers[0].name_str(), ":status");
    assert_eq!(headers[0].value_str(), "200");
}

/// RFC 7541 C.4.1: "First Request" with Huffman coding.
#[test]
fn matches_rfc7541_first_request_vector_with_huffman() {
    let mut decoder = HpackDecoder::new(4096);
    let data: Vec<u8> = vec![
        0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90, 0xf4, 0xff,
    ];
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers.len(), 4);
    assert_eq!(headers[0].name_str(), ":method");
    assert_eq!(headers[0].value_str(), "GET");
    assert_eq!(headers[3].name_str(), ":authority");
    assert_eq!(headers[3].value_str(), "www.example.com");
}

#[test]
fn dynamic_table_size_update_mid_block_without_prior_headers_is_accepted() {
    let mut decoder = HpackDecoder::new(4096);
    let mut data = vec![0b0010_0000 | 10]; // size update to 10, 5-bit prefix
    data.push(0x82); // then an indexed header
    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers.len(), 1);
    assert_eq!(decoder.context().dynamic.limit(), 10);
}

#[test]
fn index_out_of_range_is_an_error() {
    let mut decoder = HpackDecoder::new(4096);
    // Index 62 would be the first dynamic-table entry, but it's empty.
    let data = [0xbe];
    assert!(decoder.decode(&data).is_err());
}

#[test]
fn truncated_literal_string_is_an_error() {
    let mut decoder = HpackDecoder::new(4096);
    // Claims a 6-byte name but supplies none.
    let data = [0x40, 0x06];
    assert!(decoder.decode(&data).is_err());
}
