//! Interface registry — lazily materializes one logical interface per
//! `(encap, channel, hw_channel)` triple as objects are decoded.
//!
//! Keyed on `(encap << 32) | (hw_channel << 16) | channel`, monotonic ids
//! from zero. The bookkeeping shape is a `Vec` of entries plus a lookup
//! map, append-only, ids never reused.

use std::collections::HashMap;

/// Link-layer encapsulation reported on an emitted [`crate::record::PacketRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encap {
    Ethernet,
    Wlan,
    SocketCan,
    FlexRay,
    Lin,
    /// Non-link-layer records (APP_TEXT, ETHERNET_STATUS) wrapped as an
    /// exported-PDU upper-layer frame.
    UpperPdu,
}

/// Sentinel meaning "hardware channel not applicable" (§4.5).
pub const HW_CHANNEL_NONE: u16 = 0xFFFF;

#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    pub interface_id: u32,
    pub encap: Encap,
    pub channel: u16,
    pub hw_channel: u16,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    entries: Vec<InterfaceDescriptor>,
    by_key: HashMap<u64, usize>,
}

fn key(encap: Encap, channel: u16, hw_channel: u16) -> u64 {
    let encap_tag = match encap {
        Encap::Ethernet => 0u64,
        Encap::Wlan => 1,
        Encap::SocketCan => 2,
        Encap::FlexRay => 3,
        Encap::Lin => 4,
        Encap::UpperPdu => 5,
    };
    (encap_tag << 32) | ((hw_channel as u64) << 16) | channel as u64
}

impl InterfaceRegistry {
    /// Return the stable interface id for `(encap, channel, hw_channel)`,
    /// creating a new interface descriptor on first reference. `name`
    /// overrides the default naming scheme (§4.5) when provided; it is
    /// ignored on subsequent lookups of an already-created interface —
    /// use [`Self::rename`] to attach a name after the fact (APP_TEXT
    /// CHANNEL records arrive independently of the data-plane traffic they
    /// describe).
    pub fn lookup(&mut self, encap: Encap, channel: u16, hw_channel: u16) -> u32 {
        let k = key(encap, channel, hw_channel);
        if let Some(&idx) = self.by_key.get(&k) {
            return self.entries[idx].interface_id;
        }
        let interface_id = self.entries.len() as u32;
        let name = default_name(encap, channel, hw_channel);
        self.entries.push(InterfaceDescriptor {
            interface_id,
            encap,
            channel,
            hw_channel,
            name,
        });
        self.by_key.insert(k, self.entries.len() - 1);
        interface_id
    }

    /// Attach a human-readable name to an existing (or not-yet-seen)
    /// interface, as produced by an APP_TEXT CHANNEL record (§4.7.9). If
    /// the interface hasn't been created yet, lookup creates it first.
    pub fn rename(&mut self, encap: Encap, channel: u16, hw_channel: u16, name: String) -> u32 {
        let id = self.lookup(encap, channel, hw_channel);
        self.entries[id as usize].name = name;
        id
    }

    pub fn entries(&self) -> &[InterfaceDescriptor] {
        &self.entries
    }
}

fn default_name(encap: Encap, channel: u16, hw_channel: u16) -> String {
    let prefix = match encap {
        Encap::Ethernet => "ETH",
        Encap::Wlan => "WLAN",
        Encap::FlexRay => "FR",
        Encap::Lin => "LIN",
        Encap::SocketCan => "CAN",
        Encap::UpperPdu => "PDU",
    };
    if encap == Encap::Ethernet && hw_channel != HW_CHANNEL_NONE {
        format!("{prefix}-{channel}-{hw_channel}")
    } else {
        format!("{prefix}-{channel}")
    }
}
