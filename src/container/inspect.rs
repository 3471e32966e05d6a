//! Header and trailer summary of a container file without decoding it.

use std::io::{self, Read, Seek, SeekFrom};

use super::header::{parse_trailer, ContainerMeta, TRAILER_SIZE};
use crate::error::{CorruptKind, Error, Result};

/// What [`inspect`] finds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub meta: ContainerMeta,
    pub header_len: u64,
    /// Size of the whole container.
    pub total_len: u64,
    /// CRC-32 recorded in the trailer.
    pub crc32: u32,
    /// Uncompressed size recorded in the trailer (mod 2^32).
    pub uncompressed_mod32: u32,
}

impl ContainerInfo {
    /// Compressed size over uncompressed size, or 0.0 for an empty payload.
    pub fn ratio(&self) -> f64 {
        if self.uncompressed_mod32 == 0 {
            return 0.0;
        }
        self.total_len as f64 / f64::from(self.uncompressed_mod32)
    }
}

/// Read the first header and the last trailer of `r`.
///
/// For concatenated members the trailer is the last member's.
pub fn inspect<R: Read + Seek>(mut r: R) -> Result<ContainerInfo> {
    r.seek(SeekFrom::Start(0))?;
    let mut head = Vec::new();
    let mut chunk = [0u8; 512];
    let (meta, header_len) = loop {
        if let Some(found) = ContainerMeta::parse(&head)? {
            break found;
        }
        let n = read_some(&mut r, &mut chunk)?;
        if n == 0 {
            return Err(Error::Corrupt(CorruptKind::Truncated));
        }
        head.extend_from_slice(&chunk[..n]);
    };

    let total_len = r.seek(SeekFrom::End(0))?;
    if total_len < (header_len + TRAILER_SIZE) as u64 {
        return Err(Error::Corrupt(CorruptKind::Truncated));
    }
    r.seek(SeekFrom::End(-(TRAILER_SIZE as i64)))?;
    let mut trailer = [0u8; TRAILER_SIZE];
    r.read_exact(&mut trailer)?;
    let (crc32, uncompressed_mod32) = parse_trailer(&trailer);
    Ok(ContainerInfo {
        meta,
        header_len: header_len as u64,
        total_len,
        crc32,
        uncompressed_mod32,
    })
}

fn read_some<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match r.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
