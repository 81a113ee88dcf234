//! Session facade — the library's public entry point. Owns the
//! container index, inflate cache, interface registry and read cursors
//! over a generic `Read + Seek` backing store.

use std::io::{Read, Seek, SeekFrom};

use crate::container::ContainerIndex;
use crate::decode::Demuxer;
use crate::error::Result;
use crate::header::FileHeader;
use crate::interface::InterfaceDescriptor;
use crate::record::PacketRecord;

/// An open BLF file. Generic over any `Read + Seek` backing store.
pub struct Session<R> {
    file: R,
    index: ContainerIndex,
    demux: Demuxer,
    current_virt: u64,
}

impl<R: Read + Seek> Session<R> {
    /// Validate the file header, build the container index, and prepare
    /// the demultiplexer's timestamp base. Returns [`crate::error::BlfError::NotMine`]
    /// if `file` doesn't start with the BLF magic.
    pub fn open(mut file: R) -> Result<Self> {
        let header = FileHeader::read(&mut file)?;
        file.seek(SeekFrom::Start(header.header_length as u64))?;
        let index = ContainerIndex::build(&mut file)?;
        let start_offset_ns = header.start_date.to_epoch_nanos();

        Ok(Self {
            file,
            index,
            demux: Demuxer::new(start_offset_ns),
            current_virt: 0,
        })
    }

    /// Decode the next record from the current sequential cursor, advancing
    /// it past every object consumed.
    pub fn sequential_read(&mut self) -> Result<Option<PacketRecord>> {
        self.demux.next(&mut self.file, &mut self.index, &mut self.current_virt)
    }

    /// Decode the record starting at `virt_off` without disturbing the
    /// sequential cursor — the mechanism behind the round-trip property of
    /// §8 ("re-seek via `start_of_last_obj`").
    pub fn random_read(&mut self, virt_off: u64) -> Result<Option<PacketRecord>> {
        let mut cursor = virt_off;
        self.demux.next(&mut self.file, &mut self.index, &mut cursor)
    }

    pub fn interfaces(&self) -> &[InterfaceDescriptor] {
        self.demux.interfaces.entries()
    }

    pub fn total_virt_len(&self) -> u64 {
        self.index.total_virt_len()
    }

    pub fn container_count(&self) -> usize {
        self.index.descriptors().len()
    }

    /// Run a full sequential scan collecting every record — used by the
    /// CLI's `list-interfaces` (which only needs the side effect of
    /// visiting every APP_TEXT CHANNEL record) and by tests.
    pub fn decode_all(&mut self) -> Result<Vec<PacketRecord>> {
        let mut out = Vec::new();
        while let Some(rec) = self.sequential_read()? {
            out.push(rec);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{self, object_type};
    use std::io::Cursor;

    fn sample_file_header() -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(b"LOGG");
        h.extend_from_slice(&144u32.to_le_bytes());
        h.resize(144, 0);
        h
    }

    fn container_wrapping(payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&2u32.to_le_bytes()); // v1 flags
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&0u64.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes()); // compression = none
        body.extend_from_slice(&[0u8; 6]);
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(payload);

        let object_length = 16 + body.len() as u32;
        let mut out = Vec::new();
        out.extend_from_slice(header::OBJECT_SIGNATURE);
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&object_length.to_le_bytes());
        out.extend_from_slice(&object_type::LOG_CONTAINER.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    fn can_object(id: u32) -> Vec<u8> {
        let mut obj_header = Vec::new();
        obj_header.extend_from_slice(&2u32.to_le_bytes());
        obj_header.extend_from_slice(&0u16.to_le_bytes());
        obj_header.extend_from_slice(&0u16.to_le_bytes());
        obj_header.extend_from_slice(&0u64.to_le_bytes());

        let mut can_body = Vec::new();
        can_body.extend_from_slice(&0u16.to_le_bytes());
        can_body.push(0);
        can_body.push(0);
        can_body.extend_from_slice(&id.to_le_bytes());
        can_body.extend_from_slice(&[0u8; 8]);

        let mut object_body = obj_header;
        object_body.extend_from_slice(&can_body);
        let object_length = 16 + object_body.len() as u32;

        let mut out = Vec::new();
        out.extend_from_slice(header::OBJECT_SIGNATURE);
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&object_length.to_le_bytes());
        out.extend_from_slice(&object_type::CAN_MESSAGE.to_le_bytes());
        out.extend_from_slice(&object_body);
        out
    }

    #[test]
    fn open_and_decode_one_record() {
        let mut file = sample_file_header();
        file.extend(container_wrapping(&can_object(0x42)));

        let mut session = Session::open(Cursor::new(file)).unwrap();
        let rec = session.sequential_read().unwrap().unwrap();
        assert_eq!(&rec.payload[0..4], &[0, 0, 0, 0x42]);
        assert!(session.sequential_read().unwrap().is_none());
    }

    #[test]
    fn random_read_matches_sequential_read() {
        let mut file = sample_file_header();
        file.extend(container_wrapping(&can_object(0x7)));

        let mut session = Session::open(Cursor::new(file)).unwrap();
        let seq = session.sequential_read().unwrap().unwrap();
        let random = session.random_read(seq.start_of_last_obj).unwrap().unwrap();
        assert_eq!(seq.payload, random.payload);
        assert_eq!(seq.timestamp_ns, random.timestamp_ns);
    }
}
