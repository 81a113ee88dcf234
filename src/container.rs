//! Container index, cache, and the virtual reader built on top of them.
//!
//! BLF concatenates the *uncompressed* payloads of every LOG_CONTAINER
//! object into one logical byte stream; the demultiplexer seeks and reads
//! against that stream's "virtual offset" rather than the file's real byte
//! offset. [`ContainerIndex::build`] performs the one-time forward scan that
//! maps virtual ranges to file ranges, walking block headers to rebuild the
//! container list without relying on an index trailer; [`ContainerIndex::read`]
//! is the virtual reader, spanning container boundaries on demand.

use flate2::read::ZlibDecoder;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{BlfError, Result};
use crate::header::{self, BlockHeader, Compression, ContainerHeader};

/// One LOG_CONTAINER's position in both the file and the virtual stream.
#[derive(Debug, Clone)]
pub struct ContainerDescriptor {
    pub file_start: u64,
    pub file_data_start: u64,
    pub file_length: u64,
    pub virt_start: u64,
    pub virt_length: u64,
    pub compression: Compression,
    cached: Option<Vec<u8>>,
}

/// The ordered, immutable-after-build list of container descriptors, plus
/// the inflate cache. Owns nothing about object decoding — only bytes.
#[derive(Debug, Default)]
pub struct ContainerIndex {
    descriptors: Vec<ContainerDescriptor>,
}

impl ContainerIndex {
    /// Scan forward from the reader's current position (immediately after
    /// the file header) to EOF, building one descriptor per LOG_CONTAINER
    /// object. Tolerates trailing padding via the single-byte LOBJ resync;
    /// non-container top-level objects are logged and skipped.
    pub fn build<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let mut descriptors = Vec::new();
        let mut running_total = 0u64;

        loop {
            let block_start = r.stream_position()?;
            let header = match BlockHeader::read(r) {
                Ok(Some(h)) => h,
                Ok(None) => break,
                Err(BlfError::BadFile(_)) => {
                    // Single-byte resync: tolerate stray padding bytes.
                    r.seek(SeekFrom::Start(block_start + 1))?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if header.header_type != 1 {
                return Err(BlfError::BadFile(format!(
                    "top-level object at {block_start} has header_type {} (expected 1)",
                    header.header_type
                )));
            }

            if header.object_type == header::object_type::LOG_CONTAINER {
                let header_size = header::ObjectHeader::size_for(header.header_type)?;
                // The log-object header precedes the container header inside
                // the object payload.
                let mut skip = vec![0u8; header_size];
                r.read_exact(&mut skip)?;
                let chdr = ContainerHeader::read(r)?;

                let file_data_start = r.stream_position()?;
                let file_length = header.advance();

                descriptors.push(ContainerDescriptor {
                    file_start: block_start,
                    file_data_start,
                    file_length,
                    virt_start: running_total,
                    virt_length: chdr.uncompressed_size as u64,
                    compression: chdr.compression,
                    cached: None,
                });
                running_total += chdr.uncompressed_size as u64;
            } else {
                log::warn!(
                    "skipping unexpected top-level object type {} at {block_start}",
                    header.object_type
                );
            }

            r.seek(SeekFrom::Start(block_start + header.advance()))?;
        }

        Ok(Self { descriptors })
    }

    /// Build an index with a single uncompressed span `[0, len)`, mapping
    /// virtual offsets straight onto file offsets. Used by decoder unit
    /// tests that want to exercise the demultiplexer without also building
    /// real LOG_CONTAINER framing.
    #[cfg(test)]
    pub(crate) fn from_single_span(len: u64) -> Self {
        Self {
            descriptors: vec![ContainerDescriptor {
                file_start: 0,
                file_data_start: 0,
                file_length: len,
                virt_start: 0,
                virt_length: len,
                compression: Compression::None,
                cached: None,
            }],
        }
    }

    pub fn total_virt_len(&self) -> u64 {
        self.descriptors
            .last()
            .map(|d| d.virt_start + d.virt_length)
            .unwrap_or(0)
    }

    pub fn descriptors(&self) -> &[ContainerDescriptor] {
        &self.descriptors
    }

    fn locate(&self, virt_off: u64) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| virt_off >= d.virt_start && virt_off < d.virt_start + d.virt_length)
    }

    /// Ensure the container at `idx` is inflated, returning a reference to
    /// its cached bytes. Only zlib containers are cached; callers must not
    /// call this for `Compression::None`.
    fn ensure_cached<R: Read + Seek>(&mut self, r: &mut R, idx: usize) -> Result<&[u8]> {
        let d = &self.descriptors[idx];
        if d.cached.is_none() {
            let compressed_len = d.file_length - (d.file_data_start - d.file_start);
            r.seek(SeekFrom::Start(d.file_data_start))?;
            let mut compressed = vec![0u8; compressed_len as usize];
            r.read_exact(&mut compressed)?;

            let mut out = Vec::new();
            out.try_reserve(d.virt_length as usize)
                .map_err(|_| BlfError::OutOfMemory(d.virt_length as usize))?;
            let mut decoder = ZlibDecoder::new(&compressed[..]);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| BlfError::Decompress(e.to_string()))?;
            if out.len() != d.virt_length as usize {
                return Err(BlfError::Decompress(format!(
                    "container at {} inflated to {} bytes, expected {}",
                    d.file_start,
                    out.len(),
                    d.virt_length
                )));
            }
            self.descriptors[idx].cached = Some(out);
        }
        Ok(self.descriptors[idx].cached.as_deref().unwrap())
    }

    /// Copy `dst.len()` bytes starting at virtual offset `virt_off`,
    /// spanning container boundaries as needed. Returns the number of bytes
    /// actually copied, which is less than `dst.len()` only at end of
    /// stream.
    pub fn read<R: Read + Seek>(
        &mut self,
        r: &mut R,
        virt_off: u64,
        dst: &mut [u8],
    ) -> Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        let Some(mut idx) = self.locate(virt_off) else {
            return Ok(0);
        };

        let mut written = 0usize;
        let mut cursor = virt_off;

        while written < dst.len() && idx < self.descriptors.len() {
            let d = self.descriptors[idx].clone_meta();
            if cursor < d.virt_start || cursor >= d.virt_start + d.virt_length {
                break;
            }
            let intra = (cursor - d.virt_start) as usize;

            match d.compression {
                Compression::None => {
                    r.seek(SeekFrom::Start(d.file_data_start + intra as u64))?;
                    let avail = (d.virt_length as usize) - intra;
                    let to_copy = (dst.len() - written).min(avail);
                    r.read_exact(&mut dst[written..written + to_copy])?;
                    written += to_copy;
                    cursor += to_copy as u64;
                }
                Compression::Zlib => {
                    let cached = self.ensure_cached(r, idx)?;
                    let avail = cached.len() - intra;
                    let to_copy = (dst.len() - written).min(avail);
                    dst[written..written + to_copy]
                        .copy_from_slice(&cached[intra..intra + to_copy]);
                    written += to_copy;
                    cursor += to_copy as u64;
                }
            }

            idx += 1;
        }

        Ok(written)
    }
}

impl ContainerDescriptor {
    /// Shallow copy of the positional metadata, without the cache buffer —
    /// used so the borrow checker doesn't need `self` held across the
    /// `ensure_cached` call in [`ContainerIndex::read`].
    fn clone_meta(&self) -> ContainerDescriptor {
        ContainerDescriptor {
            file_start: self.file_start,
            file_data_start: self.file_data_start,
            file_length: self.file_length,
            virt_start: self.virt_start,
            virt_length: self.virt_length,
            compression: self.compression,
            cached: None,
        }
    }
}
