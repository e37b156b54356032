//! Native module loading seam
//!
//! Loading the canvas module is delegated to a [`NativeLoader`]. The default
//! [`SharedObjectLoader`] checks that the file on disk is a shared library in
//! the object format of the artifact's operating system and reports the
//! module's fixed export set.

use crate::install::platform::Artifact;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Names the canvas module exports
pub const EXPORTS: &[&str] = &[
    "Canvas",
    "createCanvas",
    "Image",
    "loadImage",
    "Path2D",
    "GlobalFonts",
    "DOMMatrix",
    "DOMPoint",
    "DOMRect",
];

/// A loaded canvas module; created once per service start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinding {
    pub artifact: Artifact,
    pub module_path: PathBuf,
    pub exports: Vec<String>,
}

/// Loads a native module for a resolved artifact
pub trait NativeLoader: Send + Sync {
    fn load(&self, artifact: &Artifact, path: &Path) -> Result<InstalledBinding, LoadError>;
}

impl<L: NativeLoader + ?Sized> NativeLoader for std::sync::Arc<L> {
    fn load(&self, artifact: &Artifact, path: &Path) -> Result<InstalledBinding, LoadError> {
        (**self).load(artifact, path)
    }
}

/// Object file container families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFormat {
    Elf,
    MachO,
    Pe,
}

impl ObjectFormat {
    /// Object format used by a Node-style OS name
    pub fn for_os(os: &str) -> Self {
        match os {
            "darwin" => ObjectFormat::MachO,
            "win32" => ObjectFormat::Pe,
            _ => ObjectFormat::Elf,
        }
    }
}

const HEADER_LEN: usize = 512;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const ELF_ET_DYN: u16 = 3;

const MACHO_MAGIC_64: u32 = 0xfeed_facf;
const MACHO_MAGIC_32: u32 = 0xfeed_face;
const MACHO_FAT_MAGIC: u32 = 0xcafe_babe;
const MACHO_MH_DYLIB: u32 = 6;
const MACHO_MH_BUNDLE: u32 = 8;

const PE_IMAGE_FILE_DLL: u16 = 0x2000;

/// Header check that stands in for `dlopen`
///
/// Only the object header is inspected: the container format must match the
/// artifact's OS and the file type must be a shared library. No symbol table
/// is read, so [`InstalledBinding::exports`] is always the fixed [`EXPORTS`]
/// list and a library that does not register a Node module still passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SharedObjectLoader;

impl NativeLoader for SharedObjectLoader {
    fn load(&self, artifact: &Artifact, path: &Path) -> Result<InstalledBinding, LoadError> {
        let header = read_header(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let expected = ObjectFormat::for_os(&artifact.os);
        classify(&header, expected).map_err(|reason| LoadError::InvalidObject {
            path: path.to_path_buf(),
            reason,
        })?;

        tracing::debug!("{} is a {:?} shared object", path.display(), expected);

        Ok(InstalledBinding {
            artifact: artifact.clone(),
            module_path: path.to_path_buf(),
            exports: EXPORTS.iter().map(|e| e.to_string()).collect(),
        })
    }
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    File::open(path)?
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}

fn u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes
        .get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

/// Checks `header` is a shared object of `expected` format
fn classify(header: &[u8], expected: ObjectFormat) -> Result<(), String> {
    match expected {
        ObjectFormat::Elf => {
            if header.get(..4) != Some(&ELF_MAGIC[..]) {
                return Err("not an ELF object".to_string());
            }
            let e_type = match header.get(5) {
                Some(2) => u16_be(header, 16),
                _ => u16_le(header, 16),
            };
            match e_type {
                Some(ELF_ET_DYN) => Ok(()),
                Some(other) => Err(format!("ELF type {other} is not a shared object")),
                None => Err("truncated ELF header".to_string()),
            }
        }
        ObjectFormat::MachO => {
            let magic_be = u32_be(header, 0).ok_or("truncated Mach-O header")?;
            if magic_be == MACHO_FAT_MAGIC {
                return Ok(());
            }
            let magic_le = u32_le(header, 0).ok_or("truncated Mach-O header")?;
            let filetype = if magic_le == MACHO_MAGIC_64 || magic_le == MACHO_MAGIC_32 {
                u32_le(header, 12)
            } else if magic_be == MACHO_MAGIC_64 || magic_be == MACHO_MAGIC_32 {
                u32_be(header, 12)
            } else {
                return Err("not a Mach-O object".to_string());
            };
            match filetype {
                Some(MACHO_MH_DYLIB | MACHO_MH_BUNDLE) => Ok(()),
                Some(other) => Err(format!("Mach-O file type {other} is not loadable")),
                None => Err("truncated Mach-O header".to_string()),
            }
        }
        ObjectFormat::Pe => {
            if header.get(..2) != Some(&b"MZ"[..]) {
                return Err("not a PE image".to_string());
            }
            let pe_offset = u32_le(header, 0x3c).ok_or("truncated DOS header")? as usize;
            if header.get(pe_offset..pe_offset + 4) != Some(&b"PE\0\0"[..]) {
                return Err("missing PE signature".to_string());
            }
            let characteristics =
                u16_le(header, pe_offset + 22).ok_or("truncated COFF header")?;
            if characteristics & PE_IMAGE_FILE_DLL != 0 {
                Ok(())
            } else {
                Err("PE image is not a DLL".to_string())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read native module {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a loadable module: {reason}", path.display())]
    InvalidObject { path: PathBuf, reason: String },
}
