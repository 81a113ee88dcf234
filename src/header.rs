//! Byte codecs — fixed-layout little-endian struct readers.
//!
//! Every structure in a BLF file is packed and little-endian; there is no
//! negotiation and no byte-swapping on read beyond what `byteorder` does
//! for us on a big-endian host. A reader fails with [`BlfError::BadFile`]
//! if fewer bytes are available than the struct's declared size — there is
//! no partial read.
//!
//! # On-disk layout
//!
//! ```text
//! FileHeader (as declared by header_length, minimum 144 bytes)
//!    0   4   signature          = "LOGG"
//!    4   4   header_length
//!    8   4   application_id
//!   12   1   application_version (major)
//!   13   1   application_version (minor)
//!   14   1   application_version (build)
//!   15   1   application_version (patch)
//!   16   4   bin_log_major / api_version (combined per vendor revision)
//!   ...
//!   diagnostic counters, then two SYSTEMTIME blocks (start/stop), 16 B each
//!
//! BlockHeader (16 bytes, precedes every object)
//!    0   4   signature      = "LOBJ"
//!    4   2   header_length
//!    6   2   header_type    ∈ {1, 2, 3}
//!    8   4   object_length  (total bytes, including this header)
//!   12   4   object_type
//!
//! LogContainerHeader (16 bytes, immediately follows a LOG_CONTAINER's BlockHeader)
//!    0   2   compression_method   0=none, 2=zlib
//!    2   6   reserved
//!    8   4   uncompressed_size
//!   12   4   reserved
//! ```

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{BlfError, Result};

pub const FILE_SIGNATURE: &[u8; 4] = b"LOGG";
pub const OBJECT_SIGNATURE: &[u8; 4] = b"LOBJ";

/// Minimum bytes needed to know how much more of the file header to read.
pub const FILE_HEADER_MIN: usize = 16;
pub const BLOCK_HEADER_SIZE: usize = 16;
pub const CONTAINER_HEADER_SIZE: usize = 16;

/// Object type codes referenced by the demultiplexer.
pub mod object_type {
    pub const LOG_CONTAINER: u32 = 10;
    pub const CAN_MESSAGE: u32 = 1;
    pub const CAN_ERROR: u32 = 2;
    pub const CAN_ERROR_EXT: u32 = 73;
    pub const CAN_MESSAGE2: u32 = 86;
    pub const CAN_FD_MESSAGE: u32 = 100;
    pub const CAN_FD_MESSAGE_64: u32 = 101;
    pub const CAN_FD_ERROR_64: u32 = 104;
    pub const FLEXRAY_DATA: u32 = 29;
    pub const FLEXRAY_MESSAGE: u32 = 30;
    pub const FLEXRAY_RCVMESSAGE: u32 = 66;
    pub const FLEXRAY_RCVMESSAGE_EX: u32 = 98;
    pub const LIN_MESSAGE: u32 = 20;
    pub const APP_TEXT: u32 = 65;
    pub const ETHERNET_FRAME: u32 = 71;
    pub const ETHERNET_FRAME_EX: u32 = 113;
    pub const ETHERNET_STATUS: u32 = 96;
    pub const WLAN_FRAME: u32 = 117;
}

/// Sources carried by an APP_TEXT record (§4.7.9).
pub mod app_text_source {
    pub const CHANNEL: u32 = 8;
    pub const METADATA: u32 = 5;
    pub const COMMENT: u32 = 0;
    pub const ATTACHMENT: u32 = 1;
    pub const TRACELINE: u32 = 2;
}

/// Compression method carried by a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
}

impl Compression {
    pub fn from_u16(v: u16) -> Result<Self> {
        match v {
            0 => Ok(Compression::None),
            2 => Ok(Compression::Zlib),
            other => Err(BlfError::Unsupported(format!(
                "container compression method {other}"
            ))),
        }
    }
}

/// The parsed subset of a BLF `FileHeader` the decoder actually needs:
/// the declared header length (to know where objects start) and the
/// capture start date, used to establish `start_offset_ns`.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub header_length: u32,
    pub start_date: SystemTime,
}

/// Windows `SYSTEMTIME`-shaped wall-clock timestamp, as BLF stores it twice
/// in the file header (measurement start, measurement stop).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

impl SystemTime {
    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            year: r.read_u16::<LittleEndian>()?,
            month: r.read_u16::<LittleEndian>()?,
            day_of_week: r.read_u16::<LittleEndian>()?,
            day: r.read_u16::<LittleEndian>()?,
            hour: r.read_u16::<LittleEndian>()?,
            minute: r.read_u16::<LittleEndian>()?,
            second: r.read_u16::<LittleEndian>()?,
            milliseconds: r.read_u16::<LittleEndian>()?,
        })
    }

    /// Nanoseconds since the Unix epoch, or 0 if the date is not representable.
    pub fn to_epoch_nanos(self) -> i64 {
        use chrono::NaiveDate;
        let Some(date) = NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
        else {
            return 0;
        };
        let Some(time) = date.and_hms_milli_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            self.milliseconds as u32,
        ) else {
            return 0;
        };
        time.and_utc().timestamp_nanos_opt().unwrap_or(0)
    }
}

impl FileHeader {
    /// Read and validate the file header. Returns [`BlfError::NotMine`] if
    /// the magic doesn't match or the file is too short to hold one.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut sig = [0u8; 4];
        if r.read_exact(&mut sig).is_err() {
            return Err(BlfError::NotMine);
        }
        if &sig != FILE_SIGNATURE {
            return Err(BlfError::NotMine);
        }
        let header_length = r.read_u32::<LittleEndian>().map_err(|_| BlfError::NotMine)?;
        if (header_length as usize) < FILE_HEADER_MIN {
            return Err(BlfError::BadFile(format!(
                "file header_length {header_length} too small"
            )));
        }

        let mut rest = vec![0u8; header_length as usize - FILE_HEADER_MIN];
        r.read_exact(&mut rest)
            .map_err(|_| BlfError::BadFile("file header truncated".into()))?;

        // Layout from offset 8 (api_version etc.) up to the two SYSTEMTIME
        // blocks at the tail of the header — offsets are relative to `rest`,
        // i.e. absolute offset 8.
        let start_date = if rest.len() >= 48 + 16 {
            let mut cur = std::io::Cursor::new(&rest[48..48 + 16]);
            SystemTime::read(&mut cur)?
        } else {
            SystemTime::default()
        };

        Ok(Self {
            header_length,
            start_date,
        })
    }
}

/// The 16-byte block header preceding every object.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub header_length: u16,
    pub header_type: u16,
    pub object_length: u32,
    pub object_type: u32,
}

impl BlockHeader {
    /// Read a block header, or `None` on a clean end-of-file (no bytes at
    /// all remain). A partial header (some but not all 16 bytes) is a
    /// [`BlfError::BadFile`].
    pub fn read<R: Read>(r: &mut R) -> Result<Option<Self>> {
        let mut sig = [0u8; 4];
        if !read_exact_or_eof(r, &mut sig)? {
            return Ok(None);
        }
        if &sig != OBJECT_SIGNATURE {
            return Err(BlfError::BadFile("bad LOBJ magic".into()));
        }
        let header_length = r.read_u16::<LittleEndian>()?;
        let header_type = r.read_u16::<LittleEndian>()?;
        let object_length = r.read_u32::<LittleEndian>()?;
        let object_type = r.read_u32::<LittleEndian>()?;
        Ok(Some(Self {
            header_length,
            header_type,
            object_length,
            object_type,
        }))
    }

    /// `max(16, object_length, header_length)` — the advance rule used by
    /// both the container index scan and the object demultiplexer.
    pub fn advance(&self) -> u64 {
        16u64
            .max(self.object_length as u64)
            .max(self.header_length as u64)
    }
}

/// Timestamp resolution carried in a log-object header's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeResolution {
    TenMicros,
    OneNano,
    Unknown,
}

impl TimeResolution {
    fn from_flags(flags: u32) -> Self {
        match flags {
            1 => TimeResolution::TenMicros,
            2 => TimeResolution::OneNano,
            _ => TimeResolution::Unknown,
        }
    }
}

/// The unified view of a LogObjectHeader, regardless of which of the three
/// on-disk variants produced it.
#[derive(Debug, Clone, Copy)]
pub struct ObjectHeader {
    pub flags: u32,
    pub object_timestamp: u64,
    pub resolution: TimeResolution,
}

impl ObjectHeader {
    /// Read the variant selected by `header_type` (1, 2, or 3).
    pub fn read<R: Read>(r: &mut R, header_type: u16) -> Result<Self> {
        match header_type {
            1 => {
                let flags = r.read_u32::<LittleEndian>()?;
                let _client_index = r.read_u16::<LittleEndian>()?;
                let _object_version = r.read_u16::<LittleEndian>()?;
                let object_timestamp = r.read_u64::<LittleEndian>()?;
                Ok(Self {
                    flags,
                    object_timestamp,
                    resolution: TimeResolution::from_flags(flags),
                })
            }
            2 => {
                let flags = r.read_u32::<LittleEndian>()?;
                let _timestamp_status = r.read_u8()?;
                let _reserved = r.read_u8()?;
                let _object_version = r.read_u16::<LittleEndian>()?;
                let object_timestamp = r.read_u64::<LittleEndian>()?;
                let _original_timestamp = r.read_u64::<LittleEndian>()?;
                Ok(Self {
                    flags,
                    object_timestamp,
                    resolution: TimeResolution::from_flags(flags),
                })
            }
            3 => {
                let flags = r.read_u32::<LittleEndian>()?;
                let _static_size = r.read_u16::<LittleEndian>()?;
                let mut reserved = [0u8; 6];
                r.read_exact(&mut reserved)?;
                let _object_version = r.read_u16::<LittleEndian>()?;
                let object_timestamp = r.read_u64::<LittleEndian>()?;
                Ok(Self {
                    flags,
                    object_timestamp,
                    resolution: TimeResolution::from_flags(flags),
                })
            }
            other => Err(BlfError::BadFile(format!(
                "unknown block header_type {other}"
            ))),
        }
    }

    /// Size in bytes of this variant's on-disk layout.
    pub fn size_for(header_type: u16) -> Result<usize> {
        match header_type {
            1 => Ok(16),
            2 => Ok(24),
            3 => Ok(22),
            other => Err(BlfError::BadFile(format!(
                "unknown block header_type {other}"
            ))),
        }
    }

    /// Convert the raw ticks to nanoseconds since the Unix epoch, given the
    /// capture's start offset. Unknown resolutions log a warning and are
    /// treated as zero, matching §4.7's "emit" rule.
    pub fn timestamp_ns(&self, start_offset_ns: i64) -> i64 {
        match self.resolution {
            TimeResolution::TenMicros => start_offset_ns + self.object_timestamp as i64 * 10_000,
            TimeResolution::OneNano => start_offset_ns + self.object_timestamp as i64,
            TimeResolution::Unknown => {
                log::warn!(
                    "object timestamp flags {:#x} have unknown resolution; using 0",
                    self.flags
                );
                0
            }
        }
    }
}

/// The 16-byte header of a LOG_CONTAINER object's payload.
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    pub compression: Compression,
    pub uncompressed_size: u32,
}

impl ContainerHeader {
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let compression_method = r.read_u16::<LittleEndian>()?;
        let mut reserved1 = [0u8; 6];
        r.read_exact(&mut reserved1)?;
        let uncompressed_size = r.read_u32::<LittleEndian>()?;
        let mut reserved2 = [0u8; 4];
        r.read_exact(&mut reserved2)?;
        Ok(Self {
            compression: Compression::from_u16(compression_method)?,
            uncompressed_size,
        })
    }
}

/// Read into `buf`, returning `Ok(false)` if zero bytes were available
/// (clean EOF) and `Err(BadFile)` for a short but nonzero read.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => {
                if total == 0 {
                    return Ok(false);
                }
                return Err(BlfError::BadFile("truncated LOBJ header".into()));
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}
