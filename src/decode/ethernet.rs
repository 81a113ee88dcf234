//! Ethernet, Ethernet-Ex, WLAN and Ethernet-status decoders (§4.7.1–§4.7.3,
//! §4.7.10).

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::{BlfError, Result};
use crate::interface::{Encap, HW_CHANNEL_NONE};
use crate::record::{Direction, PacketRecord};

use super::DecodeCtx;

fn direction_from(raw: u16) -> Direction {
    match raw {
        0 => Direction::Inbound,
        1 => Direction::Outbound,
        _ => Direction::Unknown,
    }
}

/// object_type 71 (ETHERNET_FRAME) — header carries the L2 addresses,
/// ethertype and VLAN tag separately from the payload; we splice them back
/// into one Ethernet II frame, inserting the 802.1Q tag only when
/// `tpid != 0 && tci != 0` (§8 boundary case: "VLAN Ethernet produces an
/// 18+payload frame; otherwise 14+payload").
pub fn decode_ethernet_frame(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    if body.len() < 24 {
        return Err(BlfError::BadFile("ETHERNET_FRAME body shorter than 24 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let dir = c.read_u16::<LittleEndian>()?;
    let mut source_addr = [0u8; 6];
    c.read_exact(&mut source_addr)?;
    let mut dest_addr = [0u8; 6];
    c.read_exact(&mut dest_addr)?;
    let eth_type = c.read_u16::<LittleEndian>()?;
    let tpid = c.read_u16::<LittleEndian>()?;
    let tci = c.read_u16::<LittleEndian>()?;
    let payload_len = c.read_u16::<LittleEndian>()? as usize;

    let rest = &body[24..];
    let avail = payload_len.min(rest.len());

    let mut frame = Vec::with_capacity(18 + avail);
    frame.extend_from_slice(&dest_addr);
    frame.extend_from_slice(&source_addr);
    if tpid != 0 && tci != 0 {
        frame.write_u16::<BigEndian>(tpid)?;
        frame.write_u16::<BigEndian>(tci)?;
    }
    frame.write_u16::<BigEndian>(eth_type)?;
    frame.extend_from_slice(&rest[..avail]);

    let interface_id = ctx.registry.lookup(Encap::Ethernet, channel, HW_CHANNEL_NONE);
    Ok(Some(PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::Ethernet,
        interface_id,
        direction: direction_from(dir),
        pkt_queue: None,
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: frame.len() as u32,
        wire_len: frame.len() as u32,
        payload: frame,
    }))
}

/// object_type 113 (ETHERNET_FRAME_EX) — carries a complete, already framed
/// Ethernet II frame plus a hardware channel tag.
pub fn decode_ethernet_frame_ex(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    if body.len() < 20 {
        return Err(BlfError::BadFile("ETHERNET_FRAME_EX body shorter than 20 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let _struct_flags = c.read_u16::<LittleEndian>()?;
    let hw_channel = c.read_u16::<LittleEndian>()?;
    let channel = c.read_u16::<LittleEndian>()?;
    let dir = c.read_u16::<LittleEndian>()?;
    let frame_length = c.read_u16::<LittleEndian>()? as usize;
    let _reserved = c.read_u16::<LittleEndian>()?;
    let _frame_handle = c.read_u32::<LittleEndian>()?;
    let _reserved2 = c.read_u32::<LittleEndian>()?;

    let rest = &body[20..];
    let avail = frame_length.min(rest.len());
    let frame = rest[..avail].to_vec();

    let interface_id = ctx.registry.lookup(Encap::Ethernet, channel, hw_channel);
    Ok(Some(PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::Ethernet,
        interface_id,
        direction: direction_from(dir),
        pkt_queue: Some(hw_channel),
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: frame.len() as u32,
        wire_len: frame.len() as u32,
        payload: frame,
    }))
}

/// object_type 117 (WLAN_FRAME) — raw 802.11 frame plus radio metadata we
/// don't propagate (no channel/RSSI fields on [`PacketRecord`]).
pub fn decode_wlan_frame(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    if body.len() < 16 {
        return Err(BlfError::BadFile("WLAN_FRAME body shorter than 16 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let dir = c.read_u16::<LittleEndian>()?;
    let _radio_frequency = c.read_u32::<LittleEndian>()?;
    let _signal_strength = c.read_u32::<LittleEndian>()?;
    let frame_length = c.read_u16::<LittleEndian>()? as usize;
    let _reserved = c.read_u16::<LittleEndian>()?;

    let rest = &body[16..];
    let avail = frame_length.min(rest.len());
    let frame = rest[..avail].to_vec();

    let interface_id = ctx.registry.lookup(Encap::Wlan, channel, HW_CHANNEL_NONE);
    Ok(Some(PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::Wlan,
        interface_id,
        direction: direction_from(dir),
        pkt_queue: None,
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: frame.len() as u32,
        wire_len: frame.len() as u32,
        payload: frame,
    }))
}

const ETH_STATUS_HW_CHANNEL_VALID: u16 = 0x0001;

/// object_type 96 (ETHERNET_STATUS) — link-state event, wrapped as an
/// upper-layer record since it has no wire frame of its own (§4.7.11).
pub fn decode_ethernet_status(body: &[u8], ctx: &mut DecodeCtx) -> Result<Option<PacketRecord>> {
    if body.len() < 16 {
        return Err(BlfError::BadFile("ETHERNET_STATUS body shorter than 16 bytes".into()));
    }
    let mut c = Cursor::new(body);
    let channel = c.read_u16::<LittleEndian>()?;
    let flags = c.read_u16::<LittleEndian>()?;
    let link_status = c.read_u8()?;
    let ethernet_phy = c.read_u8()?;
    let duplex = c.read_u8()?;
    let mdi = c.read_u8()?;
    let connector = c.read_u8()?;
    let clock_mode = c.read_u8()?;
    let pairs = c.read_u8()?;
    let hw_channel = c.read_u8()? as u16;
    let bitrate = c.read_u32::<LittleEndian>()?;

    let mut raw = Vec::with_capacity(16);
    raw.write_u16::<BigEndian>(channel)?;
    raw.write_u16::<BigEndian>(flags)?;
    raw.extend_from_slice(&[link_status, ethernet_phy, duplex, mdi, connector, clock_mode, pairs, hw_channel as u8]);
    raw.write_u32::<BigEndian>(bitrate)?;

    let payload = super::exported_pdu::wrap("blf-ethernetstatus-obj", Some("Ethernet Status"), None, &raw);

    let hw = if flags & ETH_STATUS_HW_CHANNEL_VALID != 0 { hw_channel } else { HW_CHANNEL_NONE };
    let interface_id = ctx.registry.lookup(Encap::UpperPdu, channel, hw);
    ctx.registry.rename(Encap::UpperPdu, channel, hw, format!("STATUS-ETH-{channel}-{hw}"));

    Ok(Some(PacketRecord {
        timestamp_ns: ctx.timestamp_ns,
        encap: Encap::UpperPdu,
        interface_id,
        direction: Direction::Unknown,
        pkt_queue: if flags & ETH_STATUS_HW_CHANNEL_VALID != 0 { Some(hw_channel) } else { None },
        start_of_last_obj: ctx.start_of_last_obj,
        capture_len: payload.len() as u32,
        wire_len: payload.len() as u32,
        payload,
    }))
}
