//! In-memory archive fixtures
//!
//! Entry names are written verbatim into the archive headers, so fixtures can
//! carry names the regular builders refuse (`../escape.txt`, `/etc/passwd`).

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// One record to place in a fixture archive
#[derive(Debug, Clone, Copy)]
pub enum FixtureEntry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
    Symlink(&'a str, &'a str),
}

/// Builds a gzip-compressed tar archive containing `entries` in order
pub fn tar_gz_bytes(entries: &[FixtureEntry<'_>]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in entries {
        let mut header = tar::Header::new_old();
        let (name, data): (&str, &[u8]) = match *entry {
            FixtureEntry::Dir(name) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                (name, &[])
            }
            FixtureEntry::File(name, content) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                (name, content)
            }
            FixtureEntry::Symlink(name, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_mode(0o777);
                header
                    .set_link_name(target)
                    .expect("symlink target fits in header");
                (name, &[])
            }
        };

        let raw_name = &mut header.as_old_mut().name;
        assert!(name.len() < raw_name.len(), "fixture name too long: {name}");
        raw_name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(data.len() as u64);
        header.set_cksum();

        builder
            .append(&header, data)
            .expect("append entry to fixture tar");
    }

    builder
        .into_inner()
        .expect("finish fixture tar")
        .finish()
        .expect("finish fixture gzip stream")
}

/// Builds a deflate-compressed zip archive containing `entries` in order
pub fn zip_bytes(entries: &[FixtureEntry<'_>]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        match *entry {
            FixtureEntry::Dir(name) => {
                zip.add_directory(name, options)
                    .expect("add directory to fixture zip");
            }
            FixtureEntry::File(name, content) => {
                zip.start_file(name, options)
                    .expect("start file in fixture zip");
                zip.write_all(content).expect("write fixture zip content");
            }
            FixtureEntry::Symlink(name, target) => {
                zip.add_symlink(name, target, options)
                    .expect("add symlink to fixture zip");
            }
        }
    }

    zip.finish().expect("finish fixture zip").into_inner()
}

/// Writes `bytes` to `dir/name`, creating `dir` if needed
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    std::fs::create_dir_all(dir).expect("create fixture directory");
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture archive");
    path
}
