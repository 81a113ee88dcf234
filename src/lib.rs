//! # blflib — Binary Log File (BLF) decoder
//!
//! Read-only decoder for the BLF bus-trace format produced by automotive
//! capture tools: a two-level virtual address space seeks across
//! independently zlib-compressed containers, a polymorphic object
//! demultiplexer turns ~15 record layouts into a normalized
//! [`record::PacketRecord`] stream, and an interface registry lazily
//! materializes one logical interface per (encapsulation, channel,
//! hw-channel) triple.
//!
//! There is no write path: this crate does not produce BLF files, only
//! reads them.

pub mod container;
pub mod decode;
pub mod error;
pub mod header;
pub mod interface;
pub mod record;
pub mod session;

pub use error::{BlfError, Result};
pub use interface::{Encap, InterfaceDescriptor, InterfaceRegistry};
pub use record::{Direction, PacketRecord};
pub use session::Session;
