//! Builds the small "exported PDU" TLV wrapper used to hand non-link-layer
//! records (APP_TEXT, ETHERNET_STATUS) to a downstream dissector alongside
//! textual metadata (§4.7.9, §4.7.11, §6's "exported PDU payload builder"
//! abstract collaborator).

use byteorder::{BigEndian, WriteBytesExt};

const TAG_DISSECTOR_NAME: u16 = 12;
const TAG_COL_PROT_TEXT: u16 = 3;
const TAG_COL_INFO_TEXT: u16 = 4;
const TAG_END_OF_OPT: u16 = 0;

fn put_tag(out: &mut Vec<u8>, tag: u16, value: &[u8]) {
    out.write_u16::<BigEndian>(tag).unwrap();
    out.write_u16::<BigEndian>(value.len() as u16).unwrap();
    out.extend_from_slice(value);
    let pad = (4 - (value.len() % 4)) % 4;
    out.extend(std::iter::repeat_n(0u8, pad));
}

/// Wrap `payload` behind a dissector tag and optional protocol/info column
/// text, terminated by the end-of-options tag.
pub fn wrap(dissector: &str, col_proto: Option<&str>, col_info: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_tag(&mut out, TAG_DISSECTOR_NAME, dissector.as_bytes());
    if let Some(p) = col_proto {
        put_tag(&mut out, TAG_COL_PROT_TEXT, p.as_bytes());
    }
    if let Some(i) = col_info {
        put_tag(&mut out, TAG_COL_INFO_TEXT, i.as_bytes());
    }
    out.write_u16::<BigEndian>(TAG_END_OF_OPT).unwrap();
    out.write_u16::<BigEndian>(0).unwrap();
    out.extend_from_slice(payload);
    out
}
