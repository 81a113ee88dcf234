//! Whole-file scenarios, built as synthetic in-memory `.blf` byte buffers
//! and fed through [`blflib::Session`] — pins §8's S1–S6 end-to-end cases.

use std::io::Cursor;

use blflib::Session;

fn file_header() -> Vec<u8> {
    let mut h = Vec::new();
    h.extend_from_slice(b"LOGG");
    h.extend_from_slice(&144u32.to_le_bytes());
    h.resize(144, 0);
    h
}

fn block(header_type: u16, object_type: u32, body: &[u8]) -> Vec<u8> {
    let object_length = 16 + body.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(b"LOBJ");
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(&header_type.to_le_bytes());
    out.extend_from_slice(&object_length.to_le_bytes());
    out.extend_from_slice(&object_type.to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn v1_obj_header(ts: u64) -> Vec<u8> {
    let mut h = Vec::new();
    h.extend_from_slice(&2u32.to_le_bytes()); // flags = 1ns resolution
    h.extend_from_slice(&0u16.to_le_bytes());
    h.extend_from_slice(&0u16.to_le_bytes());
    h.extend_from_slice(&ts.to_le_bytes());
    h
}

fn none_container(payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&v1_obj_header(0));
    body.extend_from_slice(&0u16.to_le_bytes()); // compression = none
    body.extend_from_slice(&[0u8; 6]);
    body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    body.extend_from_slice(&[0u8; 4]);
    body.extend_from_slice(payload);
    block(1, 10, &body)
}

fn can_message_object(id: u32, flags: u8, dlc: u8, data: [u8; 8]) -> Vec<u8> {
    let mut body = v1_obj_header(500);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.push(flags);
    body.push(dlc);
    body.extend_from_slice(&id.to_le_bytes());
    body.extend_from_slice(&data);
    block(1, 1, &body)
}

fn ethernet_frame_object() -> Vec<u8> {
    let mut body = v1_obj_header(0);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.extend_from_slice(&0u16.to_le_bytes()); // dir
    body.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]); // source
    body.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // dest
    body.extend_from_slice(&0x0800u16.to_le_bytes()); // eth_type
    body.extend_from_slice(&0x8100u16.to_le_bytes()); // tpid
    body.extend_from_slice(&0x0064u16.to_le_bytes()); // tci
    let payload = [0xDEu8, 0xAD, 0xBE, 0xEF];
    body.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    body.extend_from_slice(&payload);
    block(1, 71, &body)
}

// S1 — trailing zero padding after the last object is tolerated, one record
// then clean EOF.
#[test]
fn s1_empty_trailing_padding() {
    let mut file = file_header();
    let mut objs = can_message_object(0x100, 0, 2, [9, 9, 0, 0, 0, 0, 0, 0]);
    objs.extend_from_slice(&[0u8; 7]);
    file.extend(none_container(&objs));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap();
    assert!(rec.is_some());
    assert!(session.sequential_read().unwrap().is_none());
}

// S2 — VLAN reconstruction: dest+source+tpid+tci+ethertype+payload, 22 bytes.
#[test]
fn s2_vlan_reconstruction() {
    let mut file = file_header();
    file.extend(none_container(&ethernet_frame_object()));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(rec.capture_len, 22);
    assert_eq!(
        rec.payload,
        vec![
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0x81, 0x00,
            0x00, 0x64, 0x08, 0x00, 0xDE, 0xAD, 0xBE, 0xEF,
        ]
    );
}

// S3 — classic CAN RTR: id OR'd with RTR_FLAG, no payload, wire_len=8.
#[test]
fn s3_classic_can_rtr() {
    let mut file = file_header();
    file.extend(none_container(&can_message_object(0x123, 0x80, 3, [0; 8])));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(rec.wire_len, 8);
    assert_eq!(rec.payload, vec![0x40, 0x00, 0x01, 0x23, 0x00, 0x00, 0x00, 0x00]);
}

// Boundary case: an object with object_length = 0 must still advance by 16.
#[test]
fn zero_length_object_advances_by_floor() {
    let mut file = file_header();
    let mut payload = Vec::new();
    payload.extend_from_slice(b"LOBJ");
    payload.extend_from_slice(&16u16.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // object_length = 0
    payload.extend_from_slice(&9999u32.to_le_bytes()); // unknown type, skipped
    payload.extend_from_slice(&can_message_object(0x1, 0, 1, [7, 0, 0, 0, 0, 0, 0, 0]));
    file.extend(none_container(&payload));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(rec.payload[3], 0x01);
}

// Round-trip property: random-reading at start_of_last_obj reproduces the
// same record as the sequential read that yielded it.
#[test]
fn round_trip_via_start_of_last_obj() {
    let mut file = file_header();
    let mut payload = can_message_object(0x10, 0, 1, [1, 0, 0, 0, 0, 0, 0, 0]);
    payload.extend_from_slice(&can_message_object(0x20, 0, 1, [2, 0, 0, 0, 0, 0, 0, 0]));
    file.extend(none_container(&payload));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let first = session.sequential_read().unwrap().unwrap();
    let second = session.sequential_read().unwrap().unwrap();

    let reread_second = session.random_read(second.start_of_last_obj).unwrap().unwrap();
    assert_eq!(second.payload, reread_second.payload);
    assert_ne!(first.payload, second.payload);
}

// APP_TEXT CHANNEL naming, then a data-plane CAN record on the same
// channel picks up the attached name.
#[test]
fn app_text_channel_names_interface() {
    let mut file = file_header();
    let mut channel_body = v1_obj_header(0);
    channel_body.extend_from_slice(&8u32.to_le_bytes()); // source = CHANNEL
    let reserved1: u32 = 0; // channel=0, encap=SocketCan(0)
    channel_body.extend_from_slice(&reserved1.to_le_bytes());
    let text = b"x;vcan0";
    channel_body.extend_from_slice(&(text.len() as u32).to_le_bytes());
    channel_body.extend_from_slice(text);
    let channel_obj = block(1, 65, &channel_body);

    let mut payload = channel_obj;
    payload.extend_from_slice(&can_message_object(0x1, 0, 1, [1, 0, 0, 0, 0, 0, 0, 0]));
    file.extend(none_container(&payload));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    session.decode_all().unwrap();
    let iface = &session.interfaces()[0];
    assert_eq!(iface.name, "vcan0");
}

fn app_text_metadata_object(reserved1: u32, text: &[u8]) -> Vec<u8> {
    let mut body = v1_obj_header(0);
    body.extend_from_slice(&5u32.to_le_bytes()); // source = METADATA
    body.extend_from_slice(&reserved1.to_le_bytes());
    body.extend_from_slice(&(text.len() as u32).to_le_bytes());
    body.extend_from_slice(text);
    block(1, 65, &body)
}

// S6 — METADATA spanning two objects: the low 24 bits of reserved1 (16)
// name the *total* text length across both objects (10 + 6), not either
// object's own textLength, so the sequence must terminate after the
// second object and yield one record.
#[test]
fn s6_metadata_spans_two_objects() {
    let mut file = file_header();
    let mut payload = app_text_metadata_object(16, b"HELLO-----");
    payload.extend_from_slice(&app_text_metadata_object(16, b"WORLD!"));
    file.extend(none_container(&payload));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert!(rec.payload.ends_with(b"HELLO-----WORLD!"));
    assert!(session.sequential_read().unwrap().is_none());
}

fn can_error_ext_object(ecc: u8, flags_ext: u16) -> Vec<u8> {
    let mut body = v1_obj_header(0);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.extend_from_slice(&0u16.to_le_bytes()); // length
    body.extend_from_slice(&1u32.to_le_bytes()); // flags: CANCORE set
    body.push(ecc);
    body.push(0); // position
    body.push(0); // dlc
    body.push(0); // reserved1
    body.extend_from_slice(&0u32.to_le_bytes()); // frame_length_ns
    body.extend_from_slice(&0u32.to_le_bytes()); // id
    body.extend_from_slice(&flags_ext.to_le_bytes());
    body.resize(body.len() + 10, 0); // pad body to the required 32 bytes
    block(1, 73, &body)
}

// CAN_ERROR_EXT decodes into a full 16-byte SocketCAN error frame (8-byte
// header + 8 zero data bytes), with the protocol-error class written into
// bytes 10/11 and the matching id-flag OR'd into the frame id.
#[test]
fn can_error_ext_is_sixteen_bytes_with_prot_class_in_data() {
    let mut file = file_header();
    file.extend(none_container(&can_error_ext_object(0, 1))); // ecc=BIT_ERROR, NOT_ACK set
    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(rec.payload.len(), 16);
    assert_eq!(rec.capture_len, 16);
    assert_eq!(&rec.payload[0..4], &[0x20, 0x00, 0x00, 0x08]); // ERR_FLAG | CAN_ERR_PROT
    assert_eq!(rec.payload[4], 8);
    assert_eq!(rec.payload[10], 0x01); // PROT_BIT
    assert_eq!(rec.payload[11], 0);
}

fn v3_obj_header(ts: u64) -> Vec<u8> {
    let mut h = Vec::new();
    h.extend_from_slice(&2u32.to_le_bytes()); // flags = 1ns resolution
    h.extend_from_slice(&0u16.to_le_bytes()); // static_size
    h.extend_from_slice(&[0u8; 6]); // reserved
    h.extend_from_slice(&0u16.to_le_bytes()); // object_version
    h.extend_from_slice(&ts.to_le_bytes());
    h
}

// A header_type==3 (v3) log-object header is 22 bytes, not 16; a
// CAN_MESSAGE carried behind one must still decode successfully.
#[test]
fn v3_object_header_decodes() {
    let mut file = file_header();
    let mut body = v3_obj_header(500);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.push(0); // flags
    body.push(2); // dlc
    body.extend_from_slice(&0x42u32.to_le_bytes()); // id
    body.extend_from_slice(&[9, 9, 0, 0, 0, 0, 0, 0]); // data
    file.extend(none_container(&block(3, 1, &body)));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(&rec.payload[0..4], &[0, 0, 0, 0x42]);
}

fn lin_message_object(id: u8, dlc: u8, crc: u16, dir: u8, data: &[u8]) -> Vec<u8> {
    let mut body = v1_obj_header(0);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.push(id);
    body.push(dlc);
    body.extend_from_slice(&crc.to_le_bytes());
    body.push(dir);
    body.extend_from_slice(data);
    block(1, 20, &body)
}

// The payload slice must start right after the header's `dir` byte, not
// at it, or the data bytes shift left by one and the last byte is lost.
#[test]
fn lin_message_payload_does_not_overlap_dir_byte() {
    let mut file = file_header();
    file.extend(none_container(&lin_message_object(
        0x05,
        3,
        0x1234,
        1,
        &[0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0],
    )));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(&rec.payload[8..11], &[0xAA, 0xBB, 0xCC]);
}

fn flexray_data_object(frame_id: u16, header_crc: u16, payload_length: u16, data: &[u8]) -> Vec<u8> {
    let mut body = v1_obj_header(0);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.extend_from_slice(&0u16.to_le_bytes()); // channel_mask
    body.extend_from_slice(&0u16.to_le_bytes()); // dir
    body.extend_from_slice(&0u16.to_le_bytes()); // client_index
    body.extend_from_slice(&0u16.to_le_bytes()); // cycle_flags
    body.extend_from_slice(&frame_id.to_le_bytes());
    body.extend_from_slice(&header_crc.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // frame_state
    body.extend_from_slice(&payload_length.to_le_bytes());
    body.push(0); // cycle
    body.push(0); // reserved
    body.extend_from_slice(&0u16.to_le_bytes()); // state
    body.extend_from_slice(&0u32.to_le_bytes()); // reserved2
    body.extend_from_slice(data);
    block(1, 29, &body)
}

// The measurement header's byte 4 carries the high 7 bits of payload_length
// (plus header-CRC bit 10), and the payload must start after the full
// 26-byte fixed header, not 4 bytes early.
#[test]
fn flexray_data_header_encodes_payload_length_and_does_not_leak_reserved() {
    let mut file = file_header();
    file.extend(none_container(&flexray_data_object(0x10, 0, 2, &[0x55, 0x66])));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(rec.payload[4], 2); // payload_length low 7 bits, header-crc bit10 clear
    assert_eq!(&rec.payload[7..9], &[0x55, 0x66]);
}

// VLAN tag insertion requires both tpid != 0 and tci != 0; tci alone must
// not trigger the 18-byte form.
#[test]
fn ethernet_frame_without_tpid_is_not_tagged() {
    let mut file = file_header();
    let mut body = v1_obj_header(0);
    body.extend_from_slice(&0u16.to_le_bytes()); // channel
    body.extend_from_slice(&0u16.to_le_bytes()); // dir
    body.extend_from_slice(&[0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]); // source
    body.extend_from_slice(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]); // dest
    body.extend_from_slice(&0x0800u16.to_le_bytes()); // eth_type
    body.extend_from_slice(&0u16.to_le_bytes()); // tpid = 0
    body.extend_from_slice(&0x0064u16.to_le_bytes()); // tci != 0
    let payload = [0xDEu8, 0xAD, 0xBE, 0xEF];
    body.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    body.extend_from_slice(&payload);
    file.extend(none_container(&block(1, 71, &body)));

    let mut session = Session::open(Cursor::new(file)).unwrap();
    let rec = session.sequential_read().unwrap().unwrap();
    assert_eq!(rec.capture_len, 18);
}
