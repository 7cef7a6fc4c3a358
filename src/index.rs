//! Reader for the binary `.dat` side-car written by strfile(1).
//!
//! Layout, all integers big-endian:
//!
//! | offset | size | field              |
//! |--------|------|--------------------|
//! | 0      | 4    | version (1 or 2)   |
//! | 4      | 4    | number of fortunes |
//! | 8      | 4    | longest fortune    |
//! | 12     | 4    | shortest fortune   |
//! | 16     | 4    | flags              |
//! | 20     | 4    | delimiter + pad    |
//! | 24     | 4×n  | offset table       |
//!
//! Version 2 tables carry one extra entry holding the end-of-file offset.

use crate::error::{FortuneError, Result};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use rand::Rng;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

pub const HEADER_SIZE: u64 = 24;
/// Delimiter implied by version 2 files.
pub const DEFAULT_DELIMITER: u8 = b'%';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u32);

impl Flags {
    pub const RANDOMIZED: Flags = Flags(0x1);
    pub const ORDERED: Flags = Flags(0x2);
    pub const ROTATED: Flags = Flags(0x4);

    pub fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// How fragment boundaries are resolved, fixed by the header version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// No sentinel entry: the fragment runs until `delimiter` followed by a newline.
    V1 { delimiter: u8 },
    /// Lengths come from consecutive offsets.
    V2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub format: IndexFormat,
    pub fragment_count: u32,
    pub max_fragment_len: u32,
    pub max_short_len: u32,
    pub flags: Flags,
}

impl IndexHeader {
    pub fn version(&self) -> u32 {
        match self.format {
            IndexFormat::V1 { .. } => 1,
            IndexFormat::V2 => 2,
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self.format {
            IndexFormat::V1 { delimiter } => delimiter,
            IndexFormat::V2 => DEFAULT_DELIMITER,
        }
    }

    /// Rotation is only honoured by version 2 files.
    pub fn rotated(&self) -> bool {
        self.format == IndexFormat::V2 && self.flags.contains(Flags::ROTATED)
    }
}

/// Where one fragment lives in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentLocation {
    pub byte_offset: u32,
    /// `None` when the extractor has to scan for the delimiter.
    pub length: Option<u32>,
    pub delimiter: u8,
    pub rotated: bool,
}

/// Parses the fixed-size header at the start of `reader`.
///
/// `path` is only used to label errors.
pub fn read_header<R: Read>(reader: &mut R, path: &Path) -> Result<IndexHeader> {
    let mut buf = [0u8; HEADER_SIZE as usize];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FortuneError::IndexTruncated {
            path: path.to_path_buf(),
        },
        _ => FortuneError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let version = BigEndian::read_u32(&buf[0..4]);
    let fragment_count = BigEndian::read_u32(&buf[4..8]);
    let max_fragment_len = BigEndian::read_u32(&buf[8..12]);
    let max_short_len = BigEndian::read_u32(&buf[12..16]);
    let flags = Flags::from_bits(BigEndian::read_u32(&buf[16..20]));
    let delimiter = buf[20];

    let format = match version {
        1 => IndexFormat::V1 { delimiter },
        2 => IndexFormat::V2,
        v => {
            return Err(FortuneError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: v,
            })
        }
    };

    Ok(IndexHeader {
        format,
        fragment_count,
        max_fragment_len,
        max_short_len,
        flags,
    })
}

fn read_offset<R: Read>(reader: &mut R, path: &Path, entry: u64) -> Result<u32> {
    reader.read_u32::<BigEndian>().map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => FortuneError::CorruptIndex {
            path: path.to_path_buf(),
            reason: format!("offset table ends before entry {}", entry),
        },
        _ => FortuneError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Resolves fragment `id` using an already parsed header.
///
/// `reader` must be positioned anywhere in the same index file.
pub fn locate_fragment<R: Read + Seek>(
    reader: &mut R,
    header: &IndexHeader,
    id: u32,
    path: &Path,
) -> Result<FragmentLocation> {
    let entry = u64::from(id);
    let pos = HEADER_SIZE + entry * 4;
    reader
        .seek(SeekFrom::Start(pos))
        .map_err(|e| FortuneError::Seek {
            path: path.to_path_buf(),
            offset: pos,
            source: e,
        })?;
    let byte_offset = read_offset(reader, path, entry)?;

    let length = match header.format {
        IndexFormat::V1 { .. } => None,
        IndexFormat::V2 => {
            let next_offset = read_offset(reader, path, entry + 1)?;
            let length = next_offset.checked_sub(byte_offset).ok_or_else(|| {
                FortuneError::CorruptIndex {
                    path: path.to_path_buf(),
                    reason: format!(
                        "offsets of fortune {} go backwards ({} > {})",
                        id, byte_offset, next_offset
                    ),
                }
            })?;
            // Room for the trailing "%\n" delimiter line.
            if u64::from(length) > u64::from(header.max_fragment_len) + 2 {
                return Err(FortuneError::CorruptIndex {
                    path: path.to_path_buf(),
                    reason: format!(
                        "fortune {} is {} bytes, longer than the declared maximum {}",
                        id, length, header.max_fragment_len
                    ),
                });
            }
            Some(length)
        }
    };

    trace!(id, byte_offset, ?length, "located fortune");
    Ok(FragmentLocation {
        byte_offset,
        length,
        delimiter: header.delimiter(),
        rotated: header.rotated(),
    })
}

/// Draws a fortune id from `reader`'s header and resolves its location.
pub fn read_random_location<R, G>(
    reader: &mut R,
    path: &Path,
    rng: &mut G,
) -> Result<FragmentLocation>
where
    R: Read + Seek,
    G: Rng + ?Sized,
{
    let header = read_header(reader, path)?;
    debug!(
        version = header.version(),
        fortunes = header.fragment_count,
        flags = header.flags.bits(),
        "read {}",
        path.display()
    );
    if header.fragment_count == 0 {
        return Err(FortuneError::EmptyIndex {
            path: path.to_path_buf(),
        });
    }
    let id = rng.gen_range(0..header.fragment_count);
    locate_fragment(reader, &header, id, path)
}

/// Opens `index_path` and resolves one fortune picked uniformly at random.
pub fn locate_random_fragment<G: Rng + ?Sized>(
    index_path: &Path,
    rng: &mut G,
) -> Result<FragmentLocation> {
    let file = File::open(index_path).map_err(|e| FortuneError::IndexOpen {
        path: index_path.to_path_buf(),
        source: e,
    })?;
    read_random_location(&mut BufReader::new(file), index_path, rng)
}
