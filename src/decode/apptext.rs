//! APP_TEXT decoding (§4.7.9) — channel naming, free-standing text records,
//! and the METADATA multi-object accumulation rules. The demultiplexer
//! (`decode::mod`) owns the accumulation state across objects; this module
//! only parses one object's fields and builds the payload bytes for a
//! terminated sequence.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{BlfError, Result};
use crate::header::app_text_source;
use crate::interface::{Encap, InterfaceRegistry, HW_CHANNEL_NONE};

use super::exported_pdu;

pub struct AppTextFields {
    pub source: u32,
    pub reserved1: u32,
    pub text: Vec<u8>,
}

impl AppTextFields {
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < 12 {
            return Err(BlfError::BadFile("APP_TEXT body shorter than 12 bytes".into()));
        }
        let mut c = Cursor::new(body);
        let source = c.read_u32::<LittleEndian>()?;
        let reserved1 = c.read_u32::<LittleEndian>()?;
        let text_length = c.read_u32::<LittleEndian>()? as usize;
        let rest = &body[12..];
        let avail = text_length.min(rest.len());
        Ok(Self {
            source,
            reserved1,
            text: rest[..avail].to_vec(),
        })
    }

    /// `true` while the METADATA accumulation declared by `reserved1` has
    /// more bytes still to come (§4.7.9). `buffered_len` is the number of
    /// text bytes accumulated from earlier objects in the same sequence,
    /// not counting this object's own `text`.
    pub fn metadata_continues(&self, buffered_len: usize) -> bool {
        (self.reserved1 & 0x00FF_FFFF) as usize > buffered_len + self.text.len()
    }
}

fn encap_from_tag(tag: u8) -> Option<Encap> {
    match tag {
        0 => Some(Encap::SocketCan),
        1 => Some(Encap::FlexRay),
        2 => Some(Encap::Lin),
        3 => Some(Encap::Ethernet),
        4 => Some(Encap::Wlan),
        _ => None,
    }
}

/// CHANNEL source: attach a display name to an existing or lazily-created
/// interface. Emits no packet.
pub fn apply_channel(fields: &AppTextFields, registry: &mut InterfaceRegistry) {
    let text = String::from_utf8_lossy(&fields.text);
    let Some(name) = text.split(';').nth(1) else {
        log::debug!("APP_TEXT CHANNEL record has no semicolon-separated display name");
        return;
    };
    let channel = ((fields.reserved1 >> 8) & 0xFF) as u16;
    let encap_tag = ((fields.reserved1 >> 16) & 0xFF) as u8;
    let Some(encap) = encap_from_tag(encap_tag) else {
        log::debug!("APP_TEXT CHANNEL record has unrecognized encap tag {encap_tag:#x}");
        return;
    };
    registry.rename(encap, channel, HW_CHANNEL_NONE, name.trim().to_string());
}

/// COMMENT / ATTACHMENT / TRACELINE: a single upper-PDU record. The text
/// blob may carry embedded NULs; only the bytes up to the first one count.
pub fn build_single(source: u32, text: &[u8]) -> Vec<u8> {
    let trimmed = match text.iter().position(|&b| b == 0) {
        Some(i) => &text[..i],
        None => text,
    };
    let dissector = match source {
        s if s == app_text_source::COMMENT => "blf-apptext-comment",
        s if s == app_text_source::ATTACHMENT => "blf-apptext-attachment",
        s if s == app_text_source::TRACELINE => "blf-apptext-traceline",
        _ => "blf-apptext-obj",
    };
    exported_pdu::wrap(dissector, Some("BLF App text"), None, trimmed)
}

/// The exported-PDU wrapper prefixed onto the first object of a METADATA
/// sequence; subsequent objects append their text directly to the buffer.
pub fn metadata_wrapper_prefix() -> Vec<u8> {
    exported_pdu::wrap("data-text-lines", Some("BLF App text"), Some("Metadata"), &[])
}
