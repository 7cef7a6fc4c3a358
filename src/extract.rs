use crate::error::{FortuneError, Result};
use crate::index::FragmentLocation;
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::trace;

/// One extracted fortune. The bytes are owned; nothing points back into
/// the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    bytes: Vec<u8>,
}

impl Fragment {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn ends_with_newline(&self) -> bool {
        self.bytes.last() == Some(&b'\n')
    }
}

impl From<Vec<u8>> for Fragment {
    fn from(bytes: Vec<u8>) -> Self {
        Fragment { bytes }
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

fn rot13_byte(b: u8) -> u8 {
    match b {
        b'a'..=b'z' => (b - b'a' + 13) % 26 + b'a',
        b'A'..=b'Z' => (b - b'A' + 13) % 26 + b'A',
        _ => b,
    }
}

/// Rotates ASCII letters by 13 places. Everything else is left alone, so
/// applying it twice gives back the input.
pub fn rot13(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().map(rot13_byte).collect()
}

fn seek_to<R: Seek>(reader: &mut R, offset: u64, path: &Path) -> Result<()> {
    reader
        .seek(SeekFrom::Start(offset))
        .map(|_| ())
        .map_err(|e| FortuneError::Seek {
            path: path.to_path_buf(),
            offset,
            source: e,
        })
}

fn read_exactly<R: Read>(reader: &mut R, len: u64, path: &Path) -> Result<Vec<u8>> {
    // Grows with what the source holds, not with the declared length.
    let mut buf = Vec::new();
    reader
        .by_ref()
        .take(len)
        .read_to_end(&mut buf)
        .map_err(|e| FortuneError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
    if (buf.len() as u64) < len {
        return Err(FortuneError::ShortRead {
            path: path.to_path_buf(),
            expected: len,
        });
    }
    Ok(buf)
}

/// Reads a fragment whose length is known from the index.
///
/// The read normally ends with the closing delimiter line. Everything from
/// the first `"\n<delim>\n"` in the buffer onwards is dropped, even when that
/// sequence is part of the fortune's own text. The last fortune of a file
/// may have no closing line, in which case the whole buffer is returned.
pub fn read_with_length<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    length: u32,
    delimiter: u8,
    path: &Path,
) -> Result<Vec<u8>> {
    seek_to(reader, offset, path)?;
    let mut buf = read_exactly(reader, u64::from(length), path)?;
    let closing = [b'\n', delimiter, b'\n'];
    if let Some(end) = buf.windows(closing.len()).position(|w| w == closing) {
        buf.truncate(end);
    }
    Ok(buf)
}

/// Reads a fragment that ends at the first `delimiter` followed by a newline.
///
/// The source is scanned once to measure the fragment, then read again in a
/// single exact read.
pub fn read_until_delimiter<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    delimiter: u8,
    path: &Path,
) -> Result<Vec<u8>> {
    seek_to(reader, offset, path)?;
    let mut window = [0u8; 2];
    let mut scanned: u64 = 0;
    let mut len = None;
    for byte in reader.by_ref().bytes() {
        let c = byte.map_err(|e| FortuneError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        scanned += 1;
        window = [window[1], c];
        if scanned >= 2 && window == [delimiter, b'\n'] {
            len = Some(scanned - 2);
            break;
        }
    }
    let len = len.ok_or_else(|| FortuneError::DelimiterNotFound {
        path: path.to_path_buf(),
        offset,
    })?;
    trace!(offset, len, "measured fortune");

    seek_to(reader, offset, path)?;
    read_exactly(reader, len, path)
}

/// Reads the fragment at `location` from any seekable source.
pub fn extract_from<R: Read + Seek>(
    reader: &mut R,
    location: &FragmentLocation,
    path: &Path,
) -> Result<Fragment> {
    let offset = u64::from(location.byte_offset);
    let bytes = match location.length {
        Some(length) => read_with_length(reader, offset, length, location.delimiter, path)?,
        None => read_until_delimiter(reader, offset, location.delimiter, path)?,
    };
    let bytes = if location.rotated { rot13(&bytes) } else { bytes };
    Ok(Fragment::from(bytes))
}

/// Opens the fortune source file and reads the fragment at `location`.
pub fn extract(source_path: &Path, location: &FragmentLocation) -> Result<Fragment> {
    let file = File::open(source_path).map_err(|e| FortuneError::SourceOpen {
        path: source_path.to_path_buf(),
        source: e,
    })?;
    extract_from(&mut BufReader::new(file), location, source_path)
}
