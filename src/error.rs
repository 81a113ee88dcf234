//! Error type shared by every stage of the decoder.
//!
//! # Kinds
//! - [`BlfError::NotMine`] — the file is not a BLF file at all (bad magic,
//!   too short for a file header). Only ever returned from `open`.
//! - [`BlfError::BadFile`] — the file claims to be BLF but is structurally
//!   invalid: a declared size doesn't fit, a header is truncated.
//! - [`BlfError::Decompress`] — the zlib stream is corrupt.
//! - [`BlfError::Unsupported`] — a structurally valid feature this decoder
//!   does not implement (non-zlib compression, nested containers).
//! - [`BlfError::OutOfMemory`] — allocation failure while inflating.
//! - [`BlfError::Internal`] — an index invariant was violated; unreachable
//!   for well-formed files. Carries a diagnostic string.
//! - [`BlfError::ShortRead`] — the underlying I/O ran out of bytes
//!   mid-structure; the container index and demux loops translate a
//!   short read at an object boundary into clean end-of-stream instead of
//!   propagating this variant.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlfError {
    #[error("not a BLF file")]
    NotMine,

    #[error("malformed BLF file: {0}")]
    BadFile(String),

    #[error("zlib decompression failed: {0}")]
    Decompress(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BlfError>;
