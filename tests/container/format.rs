// Container byte layout and `inspect`.

use std::fs::File;
use std::io::Write;

use sluice::checksum::{Checksum, ChecksumKind};
use sluice::container::{inspect, ContainerMeta, ContainerWriter, WriteOptions, CONTAINER_MAGIC};
use sluice::error::CorruptKind;
use sluice::stream::BlockChecksum;
use sluice::{Error, Level};
use tempfile::TempDir;

fn pack(data: &[u8], meta: ContainerMeta, options: WriteOptions) -> Vec<u8> {
    let mut w = ContainerWriter::open(Vec::new(), meta, options).unwrap();
    w.write_all(data).unwrap();
    w.finish().unwrap()
}

#[test]
fn layout_is_header_payload_trailer() {
    let data = b"layout check ".repeat(100);
    let bytes = pack(&data, ContainerMeta::default().with_mtime(42), WriteOptions::default());
    assert_eq!(&bytes[..4], &CONTAINER_MAGIC);
    assert_eq!(u32::from_le_bytes(bytes[5..9].try_into().unwrap()), 42);

    let trailer = &bytes[bytes.len() - 8..];
    let crc = u32::from_le_bytes(trailer[..4].try_into().unwrap());
    let size = u32::from_le_bytes(trailer[4..].try_into().unwrap());
    assert_eq!(crc, Checksum::of(ChecksumKind::Crc32, &data).value());
    assert_eq!(size as usize, data.len());
}

#[test]
fn summary_matches_the_bytes_written() {
    let data = b"summary".repeat(500);
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default().with_name("s"), WriteOptions::default())
        .unwrap();
    w.write_all(&data).unwrap();
    let summary = w.close().unwrap();
    let bytes = w.finish().unwrap();
    assert_eq!(summary.uncompressed, data.len() as u64);
    assert_eq!(summary.compressed, bytes.len() as u64);
    assert_eq!(summary.crc32, Checksum::of(ChecksumKind::Crc32, &data).value());
}

#[test]
fn inspect_reads_header_and_trailer_from_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.slz");
    let data = b"inspect me, inspect me, inspect me".repeat(300);
    let meta = ContainerMeta::default()
        .with_name("notes.txt")
        .with_comment("for the record")
        .with_mtime(1_650_000_000)
        .with_header_crc(true);
    let bytes = pack(&data, meta.clone(), WriteOptions::default().with_level(Level::BEST));
    File::create(&path).unwrap().write_all(&bytes).unwrap();

    let info = inspect(File::open(&path).unwrap()).unwrap();
    assert_eq!(info.meta, meta);
    assert_eq!(info.total_len, bytes.len() as u64);
    assert_eq!(info.header_len, meta.encode().unwrap().len() as u64);
    assert_eq!(info.uncompressed_mod32 as usize, data.len());
    assert_eq!(info.crc32, Checksum::of(ChecksumKind::Crc32, &data).value());
    assert!(info.ratio() < 0.5);
}

#[test]
fn inspect_rejects_short_and_foreign_files() {
    let bytes = pack(b"x", ContainerMeta::default(), WriteOptions::default());
    let header_only = std::io::Cursor::new(bytes[..12].to_vec());
    assert_eq!(inspect(header_only).unwrap_err(), Error::Corrupt(CorruptKind::Truncated));

    let foreign = std::io::Cursor::new(b"PK\x03\x04 not ours".to_vec());
    assert_eq!(inspect(foreign).unwrap_err(), Error::Corrupt(CorruptKind::BadMagic));
}

#[test]
fn block_checksums_grow_the_payload() {
    let data = b"0123456789".repeat(10_000);
    let plain = pack(&data, ContainerMeta::default(), WriteOptions::default());
    let options = WriteOptions {
        block_checksum: BlockChecksum::Enabled,
        ..WriteOptions::default()
    };
    let guarded = pack(&data, ContainerMeta::default(), options);
    // Two blocks of 64 KiB input, four checksum bytes each.
    assert_eq!(guarded.len(), plain.len() + 8);
}

#[test]
fn header_fields_are_validated_on_open() {
    let meta = ContainerMeta::default().with_comment("bad\0comment");
    assert_eq!(
        ContainerWriter::open(Vec::new(), meta, WriteOptions::default()).unwrap_err(),
        Error::ParameterInvalid
    );
    let meta = ContainerMeta::default().with_extra(vec![0; 70_000]);
    assert_eq!(
        ContainerWriter::open(Vec::new(), meta, WriteOptions::default()).unwrap_err(),
        Error::ParameterInvalid
    );
}
