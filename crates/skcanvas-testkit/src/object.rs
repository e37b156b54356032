//! Minimal object file headers for loader tests
//!
//! The bytes carry just enough of an ELF, Mach-O or PE header to be classified;
//! they cannot be mapped or executed.

const ELF_ET_EXEC: u16 = 2;
const ELF_ET_DYN: u16 = 3;
const MACHO_MH_EXECUTE: u32 = 2;
const MACHO_MH_BUNDLE: u32 = 8;
const PE_IMAGE_FILE_EXECUTABLE: u16 = 0x0002;
const PE_IMAGE_FILE_DLL: u16 = 0x2000;

/// Shared object header matching the object format of a Node-style `os` name
pub fn shared_object_bytes(os: &str) -> Vec<u8> {
    object_bytes(os, true)
}

/// Executable (non-library) header for the object format of `os`
pub fn executable_object_bytes(os: &str) -> Vec<u8> {
    object_bytes(os, false)
}

fn object_bytes(os: &str, shared: bool) -> Vec<u8> {
    match os {
        "darwin" => macho(if shared { MACHO_MH_BUNDLE } else { MACHO_MH_EXECUTE }),
        "win32" => pe(if shared {
            PE_IMAGE_FILE_EXECUTABLE | PE_IMAGE_FILE_DLL
        } else {
            PE_IMAGE_FILE_EXECUTABLE
        }),
        _ => elf(if shared { ELF_ET_DYN } else { ELF_ET_EXEC }),
    }
}

fn elf(e_type: u16) -> Vec<u8> {
    let mut bytes = vec![0u8; 128];
    bytes[..4].copy_from_slice(b"\x7fELF");
    bytes[4] = 2; // ELFCLASS64
    bytes[5] = 1; // ELFDATA2LSB
    bytes[6] = 1; // EV_CURRENT
    bytes[16..18].copy_from_slice(&e_type.to_le_bytes());
    bytes
}

fn macho(filetype: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; 128];
    bytes[..4].copy_from_slice(&0xfeed_facf_u32.to_le_bytes());
    bytes[12..16].copy_from_slice(&filetype.to_le_bytes());
    bytes
}

fn pe(characteristics: u16) -> Vec<u8> {
    let pe_offset: u32 = 0x40;
    let mut bytes = vec![0u8; 256];
    bytes[..2].copy_from_slice(b"MZ");
    bytes[0x3c..0x40].copy_from_slice(&pe_offset.to_le_bytes());
    let pe = pe_offset as usize;
    bytes[pe..pe + 4].copy_from_slice(b"PE\0\0");
    bytes[pe + 22..pe + 24].copy_from_slice(&characteristics.to_le_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elf_header_marks_shared_object() {
        let bytes = shared_object_bytes("linux");
        assert_eq!(&bytes[..4], b"\x7fELF");
        assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), ELF_ET_DYN);
    }

    #[test]
    fn test_pe_header_marks_dll() {
        let bytes = shared_object_bytes("win32");
        assert_eq!(&bytes[..2], b"MZ");
        assert_eq!(&bytes[0x40..0x44], b"PE\0\0");
        let flags = u16::from_le_bytes([bytes[0x40 + 22], bytes[0x40 + 23]]);
        assert_ne!(flags & PE_IMAGE_FILE_DLL, 0);
    }

    #[test]
    fn test_executable_variants_differ() {
        for os in ["linux", "darwin", "win32"] {
            assert_ne!(shared_object_bytes(os), executable_object_bytes(os));
        }
    }
}
