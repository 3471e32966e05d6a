//! E2E: container format
//!
//! Writes and reads whole containers through files on disk:
//! - metadata survives the round trip
//! - concatenated containers read back as one stream
//! - `inspect` agrees with what the writer reported
//! - `io::Read` / `io::Write` adapters compose with std I/O

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use sluice::container::{inspect, ContainerMeta, ContainerReader, ContainerWriter, WriteOptions};
use sluice::{Error, Level};
use tempfile::TempDir;

fn document(len: usize) -> Vec<u8> {
    let line = b"2026-10-16T12:00:00Z INFO request served path=/index.html status=200\n";
    let mut v = Vec::with_capacity(len);
    let mut n = 0u32;
    while v.len() < len {
        v.extend_from_slice(line);
        v.extend_from_slice(n.to_string().as_bytes());
        n += 1;
    }
    v.truncate(len);
    v
}

#[test]
fn test_file_roundtrip_with_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("access.log.slz");
    let data = document(400_000);
    let meta = ContainerMeta::default()
        .with_name("access.log")
        .with_comment("rotated")
        .with_mtime(1_760_000_000)
        .with_text(true)
        .with_header_crc(true);

    let file = BufWriter::new(File::create(&path).unwrap());
    let mut w = ContainerWriter::open(file, meta.clone(), WriteOptions::default()).unwrap();
    io::copy(&mut &data[..], &mut w).unwrap();
    let summary = w.close().unwrap();
    drop(w);
    assert_eq!(summary.uncompressed, data.len() as u64);
    assert!(summary.compressed < summary.uncompressed / 4);

    let info = inspect(File::open(&path).unwrap()).unwrap();
    assert_eq!(info.total_len, summary.compressed);
    assert_eq!(info.crc32, summary.crc32);
    assert_eq!(info.meta, meta);

    let mut r = ContainerReader::open(BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(r.meta(), &meta);
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
    r.close().unwrap();
}

#[test]
fn test_appended_containers_read_as_one() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("joined.slz");
    let parts = [document(1000), document(70_000), Vec::new(), document(5)];

    for (i, part) in parts.iter().enumerate() {
        let file = File::options().create(true).append(true).open(&path).unwrap();
        let meta = ContainerMeta::default().with_name(format!("part{i}"));
        let options = WriteOptions::default().with_level(Level::new(i as u8 * 3).unwrap());
        let mut w = ContainerWriter::open(file, meta, options).unwrap();
        w.write_all(part).unwrap();
        w.close().unwrap();
    }

    let mut r = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert_eq!(out, parts.concat());
    assert_eq!(r.members(), 4);
    assert_eq!(r.meta().name.as_deref(), Some("part0"));
    r.close().unwrap();

    // inspect sees the first header and the last trailer.
    let info = inspect(File::open(&path).unwrap()).unwrap();
    assert_eq!(info.meta.name.as_deref(), Some("part0"));
    assert_eq!(info.uncompressed_mod32, 5);
}

#[test]
fn test_reader_push_back_for_a_line_parser() {
    let data = b"alpha\nbeta\ngamma\n";
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    w.write_all(data).unwrap();
    let bytes = w.finish().unwrap();

    // Read a byte at a time, peeking at the byte after each newline.
    let mut r = ContainerReader::open(&bytes[..]).unwrap();
    let mut starts = Vec::new();
    let mut one = [0u8; 1];
    while r.read(&mut one).unwrap() == 1 {
        if one[0] == b'\n' {
            if r.read(&mut one).unwrap() == 0 {
                break;
            }
            starts.push(one[0]);
            r.push_back(one[0]).unwrap();
        }
    }
    assert_eq!(starts, b"bg");
    r.close().unwrap();
}

#[test]
fn test_io_errors_surface_through_the_adapters() {
    let bytes = {
        let mut w =
            ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
                .unwrap();
        w.write_all(&document(10_000)).unwrap();
        w.finish().unwrap()
    };
    let mut tampered = bytes.clone();
    let at = tampered.len() - 8;
    tampered[at] ^= 0x10;

    // Through io::Read the data still arrives; close reports the mismatch.
    let mut r = ContainerReader::open(&tampered[..]).unwrap();
    let mut sink = Vec::new();
    io::copy(&mut r, &mut sink).unwrap();
    assert_eq!(r.close(), Err(Error::TrailerMismatch));

    // A sink that refuses writes fails the writer, and the failure sticks.
    struct Full;
    impl Write for Full {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    let err = ContainerWriter::open(Full, ContainerMeta::default(), WriteOptions::default())
        .unwrap_err();
    assert_eq!(err, Error::Io(io::ErrorKind::WriteZero));
}
