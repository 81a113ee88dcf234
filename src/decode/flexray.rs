//! FlexRay and LIN decoders.
//!
//! FlexRay has no native SocketCAN-style wire shape to target, so each
//! decoder synthesizes a 7-byte bit-packed measurement header and appends
//! the frame's payload bytes after it.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{BlfError, Result};
use crate::interface::{Encap, HW_CHANNEL_NONE};
use crate::record::{Direction, PacketRecord};

use super::DecodeCtx;

const FLAG_FRAME: u8 = 0x01;
const FLAG_CHANNEL_B: u8 = 0x80;
const FLAG_PPI: u8 = 0x20;
const FLAG_SFI: u8 = 0x10;
const FLAG_NFI: u8 = 0x08;
const FLAG_STFI: u8 = 0x04;

const STATE_PPI: u16 = 0x0001;
const STATE_SFI: u16 = 0x0002;
const STATE_NULL_FRAME: u16 = 0x0004;
const STATE_STFI: u16 = 0x0008;
const CHANNEL_MASK_B: u16 = 0x0002;

struct FlexRayFields {
    channel_mask: u16,
    frame_id: u16,
    header_crc: u16,
    payload_length: u16,
    cycle: u8,
    state: u16,
}

fn measurement_header(f: &FlexRayFields) -> [u8; 7] {
    let mut h = [0u8; 7];
    h[0] = FLAG_FRAME | if f.channel_mask & CHANNEL_MASK_B != 0 { FLAG_CHANNEL_B } else { 0 };
    h[1] = 0;
    h[2] = ((f.frame_id >> 8) & 0x07) as u8
        | if f.state & STATE_PPI != 0 { FLAG_PPI } else { 0 }
        | if f.state & STATE_SFI != 0 { FLAG_SFI } else { 0 }
        | if f.state & STATE_NULL_FRAME == 0 { FLAG_NFI } else { 0 }
        | if f.state & STATE_STFI != 0 { FLAG_STFI } else { 0 };
    h[3] = (f.frame_id & 0xFF) as u8;
    h[4] = ((f.payload_length & 0x7F) as u8) | (((f.header_crc >> 10) & 0x01) as u8) << 7;
    h[5] = ((f.header_crc >> 2) & 0xFF) as u8;
    h[6] = (((f.header_crc & 0x03) as u8) << 6) | (f.cycle & 0x3F);
    h
}

fn emit(ctx: &mut DecodeCtx, channel: u16, fields: &FlexRayFields, payload: &[u8]) -> PacketRecord {
    let mut out = Vec::with_capacity(7 + payload.len());
    out.extend_from_slice(&measurement_header(fields));
    out.extend_from_slice(payload);
    if !payload.len().is_multiple_of(2) {
        log::debug!("FlexRay frame {} has odd payload length {}", fields.frame_id, payload.len());
    }
    let interface_id = ctx.registry.lookup(Encap::FlexRay, channel, HW_CHANNEL_NONE);
    PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::FlexRay,
        interface_id,
        direction: Direction::Unknown,
        pkt_queue: None,
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: out.len() as u32,
        wire_len: out.len() as u32,
        payload: out,
    }
}

/// object_type 29 (FLEXRAY_DATA) and 30 (FLEXRAY_MESSAGE) share a 26-byte
/// fixed header.
fn decode_flexray_short(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    if body.len() < 26 {
        return Err(BlfError::BadFile("FLEXRAY body shorter than 26 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let channel_mask = c.read_u16::<LittleEndian>()?;
    let _dir = c.read_u16::<LittleEndian>()?;
    let _client_index = c.read_u16::<LittleEndian>()?;
    let _cycle_flags = c.read_u16::<LittleEndian>()?;
    let frame_id = c.read_u16::<LittleEndian>()?;
    let header_crc = c.read_u16::<LittleEndian>()?;
    let _frame_state = c.read_u16::<LittleEndian>()?;
    let payload_length = c.read_u16::<LittleEndian>()? as usize;
    let cycle = c.read_u8()?;
    let _reserved = c.read_u8()?;
    let state = c.read_u16::<LittleEndian>()?;
    let _reserved2 = c.read_u32::<LittleEndian>()?;

    let rest = &body[26..];
    let avail = payload_length.min(rest.len());
    let fields = FlexRayFields {
        channel_mask,
        frame_id,
        header_crc,
        payload_length: payload_length as u16,
        cycle,
        state,
    };
    Ok(Some(emit(ctx, channel, &fields, &rest[..avail])))
}

/// object_type 66 (FLEXRAY_RCVMESSAGE) and 98 (FLEXRAY_RCVMESSAGE_EX) carry
/// a much larger on-disk header than FLEXRAY_DATA/MESSAGE; the fields
/// feeding the measurement header sit at the same relative positions.
fn decode_flexray_rcv(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    let fixed = 62;
    if body.len() < fixed {
        return Err(BlfError::BadFile("FLEXRAY_RCVMESSAGE body shorter than header".into()));
    }
    let mut c = Cursor::new(body);
    let channel_mask = c.read_u16::<LittleEndian>()?;
    let _fr_channel = c.read_u16::<LittleEndian>()?;
    let _dir = c.read_u16::<LittleEndian>()?;
    let _client_index_fr_rt = c.read_u32::<LittleEndian>()?;
    let cluster_no = c.read_u32::<LittleEndian>()?;
    let frame_id = c.read_u16::<LittleEndian>()?;
    let header_crc1 = c.read_u16::<LittleEndian>()?;
    let _header_crc2 = c.read_u16::<LittleEndian>()?;
    let _byte_count = c.read_u16::<LittleEndian>()?;
    let _stuff_byte = c.read_u16::<LittleEndian>()?;
    let payload_length = c.read_u16::<LittleEndian>()? as usize;
    let _payload_length_valid = c.read_u16::<LittleEndian>()?;
    let cycle = c.read_u16::<LittleEndian>()? as u8;
    let _tag = c.read_u16::<LittleEndian>()?;
    let _data = c.read_u32::<LittleEndian>()?;
    let _frame_flags = c.read_u32::<LittleEndian>()?;
    let _app_parameter = c.read_u32::<LittleEndian>()?;
    let state = c.read_u32::<LittleEndian>()? as u16;
    let _reserved = c.read_u32::<LittleEndian>()?;

    let rest = &body[fixed..];
    let avail = payload_length.min(rest.len());
    let fields = FlexRayFields {
        channel_mask,
        frame_id,
        header_crc: header_crc1,
        payload_length: payload_length as u16,
        cycle,
        state,
    };
    Ok(Some(emit(ctx, cluster_no as u16, &fields, &rest[..avail])))
}

pub fn decode_flexray_data(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    decode_flexray_short(body, ctx)
}

pub fn decode_flexray_message(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    decode_flexray_short(body, ctx)
}

pub fn decode_flexray_rcvmessage(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    decode_flexray_rcv(body, ctx)
}

pub fn decode_flexray_rcvmessage_ex(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    decode_flexray_rcv(body, ctx)
}

/// object_type 20 (LIN_MESSAGE) — 8-byte synthetic header followed by up to
/// 8 payload bytes (§4.7.8).
pub fn decode_lin_message(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    if body.len() < 6 {
        return Err(BlfError::BadFile("LIN_MESSAGE body shorter than 6 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let id = c.read_u8()?;
    let dlc = c.read_u8()?.min(8);
    let crc = c.read_u16::<LittleEndian>()?;
    let dir_raw = c.read_u8().unwrap_or(0);

    let rest = &body[7.min(body.len())..];
    let avail = (dlc as usize).min(rest.len());

    let mut out = Vec::with_capacity(8 + avail);
    out.push(1); // msg_fmt_rev
    out.push(dlc << 4);
    out.push(id & 0x3F);
    out.push((crc & 0xFF) as u8);
    out.extend_from_slice(&[0, 0, 0, 0]);
    out.extend_from_slice(&rest[..avail]);

    let direction = match dir_raw {
        0 => Direction::Inbound,
        1 => Direction::Outbound,
        _ => Direction::Unknown,
    };

    let interface_id = ctx.registry.lookup(Encap::Lin, channel, HW_CHANNEL_NONE);
    Ok(Some(PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::Lin,
        interface_id,
        direction,
        pkt_queue: None,
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: out.len() as u32,
        wire_len: out.len() as u32,
        payload: out,
    }))
}
