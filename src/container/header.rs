//! Container header and trailer layout.
//!
//! ```text
//! header  := magic(4) | flags(1) | mtime(4, LE) | os_hint(1)
//!            [xlen(2, LE) | extra]   if FEXTRA
//!            [name NUL]              if FNAME
//!            [comment NUL]           if FCOMMENT
//!            [crc16(2, LE)]          if FHCRC
//! trailer := crc32(4, LE) | uncompressed_size mod 2^32 (4, LE)
//! ```

use crate::checksum::crc32;
use crate::error::{CorruptKind, Error, Result};
use crate::stream::format::read_le32;

pub const CONTAINER_MAGIC: [u8; 4] = [0x89, b'S', b'L', b'Z'];

pub const FTEXT: u8 = 0x01;
pub const FHCRC: u8 = 0x02;
pub const FEXTRA: u8 = 0x04;
pub const FNAME: u8 = 0x08;
pub const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xE0;

/// Magic, flags, mtime, os hint.
pub const FIXED_HEADER_SIZE: usize = 10;
pub const TRAILER_SIZE: usize = 8;
/// Longest name or comment accepted when parsing.
pub const MAX_FIELD_LEN: usize = 64 * 1024;

pub const OS_FAT: u8 = 0;
pub const OS_UNIX: u8 = 3;
pub const OS_NTFS: u8 = 11;
pub const OS_UNKNOWN: u8 = 255;

/// OS hint for the running platform.
pub const fn host_os_hint() -> u8 {
    if cfg!(unix) {
        OS_UNIX
    } else if cfg!(windows) {
        OS_NTFS
    } else {
        OS_UNKNOWN
    }
}

/// Metadata carried by a container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerMeta {
    /// Payload is probably text.
    pub text: bool,
    /// Modification time of the original, seconds since the Unix epoch (0 = unknown).
    pub mtime: u32,
    pub os_hint: u8,
    pub extra: Option<Vec<u8>>,
    /// Original file name, without directory.
    pub name: Option<String>,
    pub comment: Option<String>,
    /// Protect the header with a CRC16.
    pub header_crc: bool,
}

impl Default for ContainerMeta {
    fn default() -> Self {
        ContainerMeta {
            text: false,
            mtime: 0,
            os_hint: host_os_hint(),
            extra: None,
            name: None,
            comment: None,
            header_crc: false,
        }
    }
}

impl ContainerMeta {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn with_extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    pub fn with_header_crc(mut self, header_crc: bool) -> Self {
        self.header_crc = header_crc;
        self
    }

    /// Serialize the header.
    ///
    /// Fails with [`Error::ParameterInvalid`] if the name or comment contains
    /// a NUL byte or the extra field exceeds 65535 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut flags = 0u8;
        if self.text {
            flags |= FTEXT;
        }
        if self.header_crc {
            flags |= FHCRC;
        }
        if self.extra.is_some() {
            flags |= FEXTRA;
        }
        if self.name.is_some() {
            flags |= FNAME;
        }
        if self.comment.is_some() {
            flags |= FCOMMENT;
        }

        let mut out = Vec::with_capacity(FIXED_HEADER_SIZE + 32);
        out.extend_from_slice(&CONTAINER_MAGIC);
        out.push(flags);
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(self.os_hint);

        if let Some(extra) = &self.extra {
            let xlen = u16::try_from(extra.len()).map_err(|_| Error::ParameterInvalid)?;
            out.extend_from_slice(&xlen.to_le_bytes());
            out.extend_from_slice(extra);
        }
        for field in [&self.name, &self.comment].into_iter().flatten() {
            if field.as_bytes().contains(&0) {
                return Err(Error::ParameterInvalid);
            }
            out.extend_from_slice(field.as_bytes());
            out.push(0);
        }
        if self.header_crc {
            let crc16 = (crc32::update(crc32::SEED, &out) & 0xFFFF) as u16;
            out.extend_from_slice(&crc16.to_le_bytes());
        }
        Ok(out)
    }

    /// Parse a header from the front of `buf`.
    ///
    /// Returns `Ok(None)` while more bytes are needed, otherwise the metadata
    /// and the header length.
    pub fn parse(buf: &[u8]) -> Result<Option<(ContainerMeta, usize)>> {
        let magic_len = buf.len().min(CONTAINER_MAGIC.len());
        if buf[..magic_len] != CONTAINER_MAGIC[..magic_len] {
            return Err(Error::Corrupt(CorruptKind::BadMagic));
        }
        if buf.len() < FIXED_HEADER_SIZE {
            return Ok(None);
        }
        let flags = buf[4];
        if flags & FRESERVED != 0 {
            return Err(Error::Corrupt(CorruptKind::ReservedBits));
        }
        let mut meta = ContainerMeta {
            text: flags & FTEXT != 0,
            mtime: read_le32(buf, 5),
            os_hint: buf[9],
            extra: None,
            name: None,
            comment: None,
            header_crc: flags & FHCRC != 0,
        };
        let mut pos = FIXED_HEADER_SIZE;

        if flags & FEXTRA != 0 {
            let Some(len_bytes) = buf.get(pos..pos + 2) else {
                return Ok(None);
            };
            let xlen = usize::from(u16::from_le_bytes([len_bytes[0], len_bytes[1]]));
            let Some(extra) = buf.get(pos + 2..pos + 2 + xlen) else {
                return Ok(None);
            };
            meta.extra = Some(extra.to_vec());
            pos += 2 + xlen;
        }
        if flags & FNAME != 0 {
            let Some((name, next)) = take_cstr(buf, pos)? else {
                return Ok(None);
            };
            meta.name = Some(name);
            pos = next;
        }
        if flags & FCOMMENT != 0 {
            let Some((comment, next)) = take_cstr(buf, pos)? else {
                return Ok(None);
            };
            meta.comment = Some(comment);
            pos = next;
        }
        if meta.header_crc {
            let Some(stored) = buf.get(pos..pos + 2) else {
                return Ok(None);
            };
            let expected = (crc32::update(crc32::SEED, &buf[..pos]) & 0xFFFF) as u16;
            if u16::from_le_bytes([stored[0], stored[1]]) != expected {
                return Err(Error::Corrupt(CorruptKind::HeaderChecksum));
            }
            pos += 2;
        }
        Ok(Some((meta, pos)))
    }
}

/// NUL-terminated field at `pos`: `Ok(None)` if the terminator is not in
/// `buf` yet.
fn take_cstr(buf: &[u8], pos: usize) -> Result<Option<(String, usize)>> {
    let rest = &buf[pos.min(buf.len())..];
    match rest.iter().position(|&b| b == 0) {
        Some(n) if n > MAX_FIELD_LEN => Err(Error::Corrupt(CorruptKind::HeaderField)),
        Some(n) => Ok(Some((
            String::from_utf8_lossy(&rest[..n]).into_owned(),
            pos + n + 1,
        ))),
        None if rest.len() > MAX_FIELD_LEN => Err(Error::Corrupt(CorruptKind::HeaderField)),
        None => Ok(None),
    }
}

/// Serialized trailer.
pub fn encode_trailer(crc: u32, size: u64) -> [u8; TRAILER_SIZE] {
    let mut t = [0u8; TRAILER_SIZE];
    t[..4].copy_from_slice(&crc.to_le_bytes());
    t[4..].copy_from_slice(&(size as u32).to_le_bytes());
    t
}

/// `(crc32, size mod 2^32)` from a trailer.
pub fn parse_trailer(t: &[u8]) -> (u32, u32) {
    (read_le32(t, 0), read_le32(t, 4))
}
