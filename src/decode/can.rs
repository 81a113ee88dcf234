//! CAN classic, CAN FD, and CAN error-frame decoders.
//!
//! All variants emit a fixed 8-byte SocketCAN-style header (big-endian CAN
//! ID, DLC, three pad bytes) followed by the frame's data bytes.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::{BlfError, Result};
use crate::interface::Encap;
use crate::record::Direction;

use super::DecodeCtx;

pub const EFF_FLAG: u32 = 0x8000_0000;
pub const RTR_FLAG: u32 = 0x4000_0000;
pub const ERR_FLAG: u32 = 0x2000_0000;

/// BLF object-flags bit marking a classic CAN frame as a remote request.
const BLF_REMOTE_FLAG: u8 = 0x80;
/// BLF object-flags bit marking a classic CAN frame as locally transmitted.
const BLF_TX_FLAG: u8 = 0x01;

const FD_DLC_TO_LEN: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

fn synth_header(can_id: u32, dlc: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.write_u32::<BigEndian>(can_id).unwrap();
    out.push(dlc);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(payload);
    out
}

fn emit(
    ctx: &mut DecodeCtx,
    channel: u16,
    can_id: u32,
    dlc: u8,
    payload: &[u8],
    direction: Direction,
) -> crate::record::PacketRecord {
    let body = synth_header(can_id, dlc, payload);
    let interface_id = ctx.registry.lookup(Encap::SocketCan, channel, crate::interface::HW_CHANNEL_NONE);
    crate::record::PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::SocketCan,
        interface_id,
        direction,
        pkt_queue: None,
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: body.len() as u32,
        wire_len: body.len() as u32,
        payload: body,
    }
}

/// object_type 1 (CAN_MESSAGE).
pub fn decode_can_message(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    if body.len() < 16 {
        return Err(BlfError::BadFile("CAN_MESSAGE body shorter than 16 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let flags = c.read_u8()?;
    let dlc = c.read_u8()?.min(8);
    let id = c.read_u32::<LittleEndian>()?;
    let mut data = [0u8; 8];
    c.read_exact(&mut data)?;

    let (can_id, len, payload): (u32, u8, &[u8]) = if flags & BLF_REMOTE_FLAG != 0 {
        (id | RTR_FLAG, 0, &[])
    } else {
        (id, dlc, &data[..dlc as usize])
    };
    let direction = if flags & BLF_TX_FLAG != 0 { Direction::Outbound } else { Direction::Inbound };

    Ok(Some(emit(ctx, channel, can_id, len, payload, direction)))
}

/// object_type 86 (CAN_MESSAGE2) — classic CAN_MESSAGE plus a trailer the
/// spec instructs us to validate but not propagate.
pub fn decode_can_message2(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    if body.len() < 24 {
        return Err(BlfError::BadFile("CAN_MESSAGE2 body shorter than 24 bytes".into()));
    }
    decode_can_message(&body[..16], ctx)
}

/// object_type 100 (CAN_FD_MESSAGE).
pub fn decode_can_fd_message(body: &[u8], ctx: &mut crate::decode::DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    if body.len() < 20 {
        return Err(BlfError::BadFile("CAN_FD_MESSAGE body shorter than 20 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let flags = c.read_u8()?;
    let dlc = c.read_u8()?;
    let id = c.read_u32::<LittleEndian>()?;
    let _frame_length_ns = c.read_u32::<LittleEndian>()?;
    let _bit_count = c.read_u8()?;
    let _fd_flags = c.read_u8()?;
    let valid_data_bytes = c.read_u8()?;
    let mut reserved = [0u8; 5];
    c.read_exact(&mut reserved)?;

    let table = if dlc as usize >= FD_DLC_TO_LEN.len() { 8 } else { FD_DLC_TO_LEN[dlc as usize] };
    let wanted = table.min(valid_data_bytes) as usize;
    let remaining = &body[20..];
    let avail = wanted.min(remaining.len());

    let (can_id, len, payload): (u32, u8, &[u8]) = if flags & BLF_REMOTE_FLAG != 0 {
        (id | RTR_FLAG, 0, &[])
    } else {
        (id, avail as u8, &remaining[..avail])
    };
    let direction = if flags & BLF_TX_FLAG != 0 { Direction::Outbound } else { Direction::Inbound };

    Ok(Some(emit(ctx, channel, can_id, len, payload, direction)))
}

const CAN_FD_MESSAGE_64_HEADER_SIZE: usize = 40;

/// object_type 101 (CAN_FD_MESSAGE_64).
pub fn decode_can_fd_message_64(body: &[u8], ctx: &mut crate::decode::DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    if body.len() < CAN_FD_MESSAGE_64_HEADER_SIZE {
        return Err(BlfError::BadFile("CAN_FD_MESSAGE_64 body shorter than header".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u8()? as u16;
    let dlc = c.read_u8()?;
    let valid_data_bytes = c.read_u8()?;
    let _tx_count = c.read_u8()?;
    let id = c.read_u32::<LittleEndian>()?;
    let _frame_length_ns = c.read_u32::<LittleEndian>()?;
    let _fd_flags = c.read_u32::<LittleEndian>()?;
    let _arb_bitrate = c.read_u32::<LittleEndian>()?;
    let _data_bitrate = c.read_u32::<LittleEndian>()?;
    let _brs_offset = c.read_u32::<LittleEndian>()?;
    let _crc_delim_offset = c.read_u32::<LittleEndian>()?;
    let _bit_count = c.read_u16::<LittleEndian>()?;
    let direction_raw = c.read_u8()?;
    let _ext_data_offset = c.read_u8()?;
    let _crc = c.read_u32::<LittleEndian>()?;

    let table = if dlc as usize >= FD_DLC_TO_LEN.len() { 64 } else { FD_DLC_TO_LEN[dlc as usize] };
    let wanted = table.min(valid_data_bytes) as usize;
    let remaining = &body[CAN_FD_MESSAGE_64_HEADER_SIZE..];
    let avail = wanted.min(remaining.len());

    let direction = if direction_raw != 0 { Direction::Outbound } else { Direction::Inbound };
    Ok(Some(emit(ctx, channel, id, avail as u8, &remaining[..avail], direction)))
}

/// Vector ECC error-class codes mapped onto SocketCAN protocol-violation
/// bytes (§4.7.6).
#[derive(Debug, Clone, Copy)]
enum EccClass {
    Bit,
    Form,
    Stuff,
    Crc,
    Nack,
    Overload,
    Other,
}

impl EccClass {
    fn from_ecc(ecc: u8) -> Self {
        match ecc & 0x07 {
            0 => EccClass::Bit,
            1 => EccClass::Form,
            2 => EccClass::Stuff,
            4 => EccClass::Crc,
            5 => EccClass::Nack,
            6 => EccClass::Overload,
            _ => EccClass::Other,
        }
    }
}

const CANCORE_FLAG: u32 = 0x0000_0001;
const NOT_ACK_BIT: u16 = 0x0001;
const PROT_BIT: u8 = 0x01;
const PROT_FORM: u8 = 0x02;
const PROT_STUFF: u8 = 0x04;
const PROT_OVERLOAD: u8 = 0x20;
const PROT_UNSPEC: u8 = 0x00;
const PROT_LOC_CRC_SEQ: u8 = 0x08;
const PROT_LOC_ACK: u8 = 0x19;

/// SocketCAN id-flag bits set alongside `ERR_FLAG` to classify the error.
const CAN_ERR_PROT: u32 = 0x0000_0008;
const CAN_ERR_ACK: u32 = 0x0000_0020;

/// An 8-byte synthetic header (id=`ERR_FLAG`, dlc=8) followed by 8 zero
/// data bytes — a full 16-byte SocketCAN error frame.
fn synth_error_frame() -> Vec<u8> {
    let mut out = vec![0u8; 16];
    out[0..4].copy_from_slice(&ERR_FLAG.to_be_bytes());
    out[4] = 8;
    out
}

fn emit_error(ctx: &mut DecodeCtx, channel: u16, payload: Vec<u8>, direction: Direction) -> crate::record::PacketRecord {
    let interface_id = ctx.registry.lookup(Encap::SocketCan, channel, crate::interface::HW_CHANNEL_NONE);
    crate::record::PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::SocketCan,
        interface_id,
        direction,
        pkt_queue: None,
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: payload.len() as u32,
        wire_len: payload.len() as u32,
        payload,
    }
}

/// object_type 2 (CAN_ERROR) — minimal classic error frame, no ECC detail.
pub fn decode_can_error(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    if body.len() < 4 {
        return Err(BlfError::BadFile("CAN_ERROR body shorter than 4 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    Ok(Some(emit_error(ctx, channel, synth_error_frame(), Direction::Unknown)))
}

/// object_type 73 (CAN_ERROR_EXT).
pub fn decode_can_error_ext(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    if body.len() < 32 {
        return Err(BlfError::BadFile("CAN_ERROR_EXT body shorter than 32 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let _length = c.read_u16::<LittleEndian>()?;
    let flags = c.read_u32::<LittleEndian>()?;
    let ecc = c.read_u8()?;
    let _position = c.read_u8()?;
    let _dlc = c.read_u8()?;
    let _reserved1 = c.read_u8()?;
    let _frame_length_ns = c.read_u32::<LittleEndian>()?;
    let _id = c.read_u32::<LittleEndian>()?;
    let flags_ext = c.read_u16::<LittleEndian>()?;

    let mut payload = synth_error_frame();
    if flags & CANCORE_FLAG != 0 {
        let mut id_flag = CAN_ERR_PROT;
        match EccClass::from_ecc(ecc) {
            EccClass::Bit => payload[10] |= PROT_BIT,
            EccClass::Form => payload[10] |= PROT_FORM,
            EccClass::Stuff => payload[10] |= PROT_STUFF,
            EccClass::Crc => payload[11] |= PROT_LOC_CRC_SEQ,
            EccClass::Nack => {
                payload[11] |= PROT_LOC_ACK;
                id_flag = CAN_ERR_ACK;
            }
            EccClass::Overload => payload[10] |= PROT_OVERLOAD,
            EccClass::Other => payload[10] |= PROT_UNSPEC,
        }
        if flags_ext & NOT_ACK_BIT == 0 {
            payload[10] = 0;
            payload[11] |= PROT_LOC_ACK;
            id_flag = CAN_ERR_ACK;
        }
        payload[0..4].copy_from_slice(&(ERR_FLAG | id_flag).to_be_bytes());
    }

    let direction = if flags & 0x0001_0000 != 0 { Direction::Outbound } else { Direction::Inbound };
    Ok(Some(emit_error(ctx, channel, payload, direction)))
}

/// object_type 104 (CAN_FD_ERROR_64) — same protocol-error mapping as
/// CAN_ERROR_EXT, with the FD-specific header fields ignored beyond `ecc`.
pub fn decode_can_fd_error_64(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<crate::record::PacketRecord>> {
    decode_can_error_ext(body, ctx)
}
