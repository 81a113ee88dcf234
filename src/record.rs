//! The decoded packet record emitted by every per-type decoder (§3, §4.7).

use crate::interface::Encap;

/// Inbound/outbound direction, reported as an EPB-flags-style option
/// (§4.7.10). `Unknown` corresponds to value 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
    Unknown,
}

/// One decoded bus event, normalized to a canonical link-layer (or
/// exported-PDU) frame.
#[derive(Debug, Clone)]
pub struct PacketRecord {
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
    pub encap: Encap,
    pub interface_id: u32,
    pub direction: Direction,
    /// Hardware-channel / queue tag, when the object carries one.
    pub pkt_queue: Option<u16>,
    /// The virtual offset of the first object contributing to this record —
    /// an opaque locator a caller can pass back to re-seek this exact
    /// record (§4.6, §8 "round-trip" property).
    pub start_of_last_obj: u64,
    pub capture_len: u32,
    pub wire_len: u32,
    pub payload: Vec<u8>,
}
