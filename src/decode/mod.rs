//! Object demultiplexer and per-type decoder dispatch.
//!
//! A flat match on the object-type tag picks the right decode function for
//! each object, the way a codec registry picks an implementation by id.

mod apptext;
pub mod can;
pub mod ethernet;
mod exported_pdu;
pub mod flexray;

use std::io::{Cursor, Read, Seek};

use crate::container::ContainerIndex;
use crate::error::{BlfError, Result};
use crate::header::{app_text_source, object_type, BlockHeader, ObjectHeader};
use crate::interface::{Encap, InterfaceRegistry, HW_CHANNEL_NONE};
use crate::record::{Direction, PacketRecord};

use apptext::AppTextFields;

/// Fields every per-type decoder needs beyond its own object payload.
pub struct DecodeCtx<'a> {
    pub timestamp_ns: i64,
    pub start_of_last_obj: u64,
    pub registry: &'a mut InterfaceRegistry,
}

/// Owns the interface registry and the capture's timestamp base; walks the
/// virtual byte stream one object at a time, producing [`PacketRecord`]s.
#[derive(Debug, Default)]
pub struct Demuxer {
    pub interfaces: InterfaceRegistry,
    pub start_offset_ns: i64,
}

impl Demuxer {
    pub fn new(start_offset_ns: i64) -> Self {
        Self {
            interfaces: InterfaceRegistry::default(),
            start_offset_ns,
        }
    }

    /// Decode the next record starting at `*cursor`, advancing `*cursor`
    /// past every object consumed (including skipped/continued ones).
    /// Returns `Ok(None)` at clean end of stream.
    pub fn next<R: Read + Seek>(
        &mut self,
        file: &mut R,
        index: &mut ContainerIndex,
        cursor: &mut u64,
    ) -> Result<Option<PacketRecord>> {
        // (start offset, wrapped buffer so far, accumulated text length
        // across all objects in the sequence so far — the latter is what
        // the low 24 bits of `reserved1` are compared against.)
        let mut metadata: Option<(u64, Vec<u8>, usize)> = None;

        loop {
            let block_start = *cursor;
            let mut hdr_buf = [0u8; 16];
            let n = index.read(file, block_start, &mut hdr_buf)?;
            if n == 0 {
                if metadata.is_some() {
                    log::debug!("APP_TEXT METADATA sequence at {block_start} truncated by end of stream");
                }
                return Ok(None);
            }
            if n < 16 {
                // A header straddling the end of the virtual stream is
                // trailing padding, not corruption.
                if metadata.is_some() {
                    log::debug!("APP_TEXT METADATA sequence at {block_start} truncated by end of stream");
                }
                return Ok(None);
            }

            let block_header = match BlockHeader::read(&mut Cursor::new(hdr_buf)) {
                Ok(Some(h)) => h,
                Ok(None) => return Ok(None),
                Err(BlfError::BadFile(_)) => {
                    *cursor += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let body_len = (block_header.object_length as u64).saturating_sub(16) as usize;
            let mut body = vec![0u8; body_len];
            let got = index.read(file, block_start + 16, &mut body)?;
            if got < body_len {
                return Err(BlfError::BadFile(format!(
                    "object at {block_start} truncated: wanted {body_len} body bytes, got {got}"
                )));
            }

            let header_size = ObjectHeader::size_for(block_header.header_type)?;
            if body.len() < header_size {
                log::debug!(
                    "object at {block_start} shorter than its own log-object header, skipping"
                );
                *cursor = block_start + block_header.advance();
                continue;
            }
            let object_header =
                ObjectHeader::read(&mut Cursor::new(&body[..header_size]), block_header.header_type)?;
            let payload = &body[header_size..];
            let timestamp_ns = object_header.timestamp_ns(self.start_offset_ns);

            *cursor = block_start + block_header.advance();

            let app_text_fields = if block_header.object_type == object_type::APP_TEXT {
                Some(AppTextFields::parse(payload)?)
            } else {
                None
            };
            let is_metadata = app_text_fields
                .as_ref()
                .is_some_and(|f| f.source == app_text_source::METADATA);
            if !is_metadata && metadata.take().is_some() {
                log::debug!("APP_TEXT METADATA sequence interrupted at {block_start}; discarding");
            }

            let mut ctx = DecodeCtx {
                timestamp_ns,
                start_of_last_obj: block_start,
                registry: &mut self.interfaces,
            };

            let record = match block_header.object_type {
                object_type::APP_TEXT => {
                    let fields = app_text_fields.expect("parsed above for APP_TEXT objects");
                    match fields.source {
                        s if s == app_text_source::CHANNEL => {
                            apptext::apply_channel(&fields, ctx.registry);
                            None
                        }
                        s if s == app_text_source::METADATA => {
                            let (start, mut buf, buffered_len) = metadata
                                .take()
                                .unwrap_or_else(|| (block_start, apptext::metadata_wrapper_prefix(), 0));
                            let continues = fields.metadata_continues(buffered_len);
                            buf.extend_from_slice(&fields.text);
                            if continues {
                                metadata = Some((start, buf, buffered_len + fields.text.len()));
                                None
                            } else {
                                let interface_id = ctx.registry.lookup(Encap::UpperPdu, 0, HW_CHANNEL_NONE);
                                Some(PacketRecord {
                                    timestamp_ns,
                                    encap: Encap::UpperPdu,
                                    interface_id,
                                    direction: Direction::Unknown,
                                    pkt_queue: None,
                                    start_of_last_obj: start,
                                    capture_len: buf.len() as u32,
                                    wire_len: buf.len() as u32,
                                    payload: buf,
                                })
                            }
                        }
                        s if s == app_text_source::COMMENT
                            || s == app_text_source::ATTACHMENT
                            || s == app_text_source::TRACELINE =>
                        {
                            let wrapped = apptext::build_single(fields.source, &fields.text);
                            let interface_id = ctx.registry.lookup(Encap::UpperPdu, 0, HW_CHANNEL_NONE);
                            Some(PacketRecord {
                                timestamp_ns,
                                encap: Encap::UpperPdu,
                                interface_id,
                                direction: Direction::Unknown,
                                pkt_queue: None,
                                start_of_last_obj: block_start,
                                capture_len: wrapped.len() as u32,
                                wire_len: wrapped.len() as u32,
                                payload: wrapped,
                            })
                        }
                        other => {
                            log::debug!("unsupported APP_TEXT source {other}");
                            None
                        }
                    }
                }
                object_type::CAN_MESSAGE => can::decode_can_message(payload, &mut ctx)?,
                object_type::CAN_MESSAGE2 => can::decode_can_message2(payload, &mut ctx)?,
                object_type::CAN_FD_MESSAGE => can::decode_can_fd_message(payload, &mut ctx)?,
                object_type::CAN_FD_MESSAGE_64 => can::decode_can_fd_message_64(payload, &mut ctx)?,
                object_type::CAN_ERROR => can::decode_can_error(payload, &mut ctx)?,
                object_type::CAN_ERROR_EXT => can::decode_can_error_ext(payload, &mut ctx)?,
                object_type::CAN_FD_ERROR_64 => can::decode_can_fd_error_64(payload, &mut ctx)?,
                object_type::ETHERNET_FRAME => ethernet::decode_ethernet_frame(payload, &mut ctx)?,
                object_type::ETHERNET_FRAME_EX => ethernet::decode_ethernet_frame_ex(payload, &mut ctx)?,
                object_type::WLAN_FRAME => ethernet::decode_wlan_frame(payload, &mut ctx)?,
                object_type::ETHERNET_STATUS => ethernet::decode_ethernet_status(payload, &mut ctx)?,
                object_type::FLEXRAY_DATA => flexray::decode_flexray_data(payload, &mut ctx)?,
                object_type::FLEXRAY_MESSAGE => flexray::decode_flexray_message(payload, &mut ctx)?,
                object_type::FLEXRAY_RCVMESSAGE => flexray::decode_flexray_rcvmessage(payload, &mut ctx)?,
                object_type::FLEXRAY_RCVMESSAGE_EX => flexray::decode_flexray_rcvmessage_ex(payload, &mut ctx)?,
                object_type::LIN_MESSAGE => flexray::decode_lin_message(payload, &mut ctx)?,
                object_type::LOG_CONTAINER => {
                    return Err(BlfError::Unsupported(
                        "nested LOG_CONTAINER inside a container's virtual stream".into(),
                    ))
                }
                other => {
                    log::debug!("skipping unsupported object type {other} at {block_start}");
                    None
                }
            };

            if let Some(r) = record {
                return Ok(Some(r));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{self, BLOCK_HEADER_SIZE};
    use std::io::Cursor as IoCursor;

    fn push_block(buf: &mut Vec<u8>, header_type: u16, object_type: u32, body: &[u8]) {
        let object_length = BLOCK_HEADER_SIZE as u32 + body.len() as u32;
        buf.extend_from_slice(header::OBJECT_SIGNATURE);
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(&header_type.to_le_bytes());
        buf.extend_from_slice(&object_length.to_le_bytes());
        buf.extend_from_slice(&object_type.to_le_bytes());
        buf.extend_from_slice(body);
    }

    fn v1_header(flags: u32, ts: u64) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&flags.to_le_bytes());
        h.extend_from_slice(&0u16.to_le_bytes());
        h.extend_from_slice(&0u16.to_le_bytes());
        h.extend_from_slice(&ts.to_le_bytes());
        h
    }

    fn can_message_body(id: u32, flags: u8, dlc: u8, data: &[u8; 8]) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0u16.to_le_bytes()); // channel
        b.push(flags);
        b.push(dlc);
        b.extend_from_slice(&id.to_le_bytes());
        b.extend_from_slice(data);
        b
    }

    #[test]
    fn decodes_classic_can_message() {
        let mut oh = v1_header(2, 500);
        oh.extend_from_slice(&can_message_body(0x123, 0, 3, &[1, 2, 3, 0, 0, 0, 0, 0]));
        let mut stream = Vec::new();
        push_block(&mut stream, 1, object_type::CAN_MESSAGE, &oh);

        let total_len = stream.len() as u64;
        let mut cur = IoCursor::new(stream);
        let mut index = ContainerIndex::from_single_span(total_len);

        let mut demux = Demuxer::new(1_000_000_000);
        let mut cursor = 0u64;
        let rec = demux.next(&mut cur, &mut index, &mut cursor).unwrap().unwrap();
        assert_eq!(rec.payload[0..4], [0x00, 0x00, 0x01, 0x23]);
        assert_eq!(rec.payload[4], 3);
        assert_eq!(&rec.payload[8..11], &[1, 2, 3]);
        assert_eq!(rec.interface_id, 0);
    }

    #[test]
    fn unknown_object_type_is_skipped() {
        let mut stream = Vec::new();
        push_block(&mut stream, 1, 9999, &v1_header(2, 0));
        let mut oh = v1_header(2, 500);
        oh.extend_from_slice(&can_message_body(0x1, 0, 0, &[0; 8]));
        push_block(&mut stream, 1, object_type::CAN_MESSAGE, &oh);

        let mut cur = IoCursor::new(stream.clone());
        let mut index = crate::container::ContainerIndex::from_single_span(stream.len() as u64);
        let mut demux = Demuxer::new(0);
        let mut cursor = 0u64;
        let rec = demux.next(&mut cur, &mut index, &mut cursor).unwrap().unwrap();
        assert_eq!(rec.payload[0..4], [0, 0, 0, 1]);
    }
}
