//! Firmware image preparation.
//!
//! Models load their program memory from a word-per-line hex file. This module performs:
//! 1. **ELF flattening:** Loadable segments of 32- and 64-bit images are laid out from the
//!    lowest load address with zero-filled gaps, like `objcopy -O binary`.
//! 2. **Hex encoding:** The flat image is split into little-endian 32-bit words, one per line,
//!    as eight uppercase hex digits.
//!
//! The hex encoder always emits the final word, zero-padded. An image whose length is a
//! multiple of four therefore ends with an extra `00000000` line; memory loaders accept it and
//! existing images were generated that way.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use object::elf::{self, FileHeader32, FileHeader64};
use object::read::elf::{FileHeader, ProgramHeader};
use object::{Endianness, FileKind};

use crate::common::error::HarnessError;

/// Largest flattened image accepted from an ELF file (256 MiB).
pub const MAX_IMAGE_SPAN: u64 = 256 * 1024 * 1024;

/// Bytes per memory word in the hex image.
const WORD_BYTES: usize = 4;

fn push_word(out: &mut String, bytes: &[u8]) {
    for i in (0..WORD_BYTES).rev() {
        let byte = bytes.get(i).copied().unwrap_or(0);
        let _ = write!(out, "{byte:02X}");
    }
    out.push('\n');
}

/// Encodes a flat binary as a word-per-line hex image.
///
/// ```
/// use fsoc_tb_core::sim::firmware::bin_to_hex;
///
/// assert_eq!(bin_to_hex(&[0x13, 0x00, 0x00, 0x00, 0xef]), "00000013\n000000EF\n");
/// ```
pub fn bin_to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() / WORD_BYTES + 1) * (2 * WORD_BYTES + 1));
    let mut words = data.chunks_exact(WORD_BYTES);
    for word in &mut words {
        push_word(&mut out, word);
    }
    push_word(&mut out, words.remainder());
    out
}

/// Flattens the loadable segments of an ELF image into a binary.
///
/// Segments are placed at their load address (`p_paddr`), as `objcopy -O binary` does, so
/// initialized data stored in ROM and copied to RAM at startup lands in the ROM image.
/// Returns the load address of the first byte together with the image.
///
/// # Errors
///
/// Returns `Elf` if the image cannot be parsed, `EmptyImage` if no segment carries file data,
/// and `InvalidConfig` if a segment runs past the end of the address space, its file data lies
/// outside the image, or the segments span more than [`MAX_IMAGE_SPAN`] bytes.
pub fn elf_to_bin(data: &[u8]) -> Result<(u64, Vec<u8>), HarnessError> {
    let segments = match FileKind::parse(data)? {
        FileKind::Elf32 => load_segments::<FileHeader32<Endianness>>(data)?,
        FileKind::Elf64 => load_segments::<FileHeader64<Endianness>>(data)?,
        kind => {
            return Err(HarnessError::InvalidConfig(format!(
                "expected an ELF image, found {kind:?}"
            )));
        }
    };

    let base = segments
        .iter()
        .map(|&(addr, _)| addr)
        .min()
        .ok_or(HarnessError::EmptyImage)?;
    let mut end = base;
    for &(addr, bytes) in &segments {
        let seg_end = addr.checked_add(bytes.len() as u64).ok_or_else(|| {
            HarnessError::InvalidConfig(format!(
                "segment at {addr:#x} ({:#x} bytes) wraps the address space",
                bytes.len()
            ))
        })?;
        end = end.max(seg_end);
    }
    let span = end - base;
    if span > MAX_IMAGE_SPAN {
        return Err(HarnessError::InvalidConfig(format!(
            "loadable segments span {span:#x} bytes (limit {MAX_IMAGE_SPAN:#x})"
        )));
    }

    let mut image = vec![0u8; span as usize];
    for (addr, bytes) in segments {
        let offset = (addr - base) as usize;
        let Some(dest) = image.get_mut(offset..offset + bytes.len()) else {
            return Err(HarnessError::InvalidConfig(format!(
                "segment at {addr:#x} falls outside the image"
            )));
        };
        dest.copy_from_slice(bytes);
    }
    tracing::debug!("flattened ELF image: base {base:#x}, {} bytes", image.len());
    Ok((base, image))
}

/// Collects `(load address, file bytes)` for every non-empty `PT_LOAD` segment.
fn load_segments<'data, Elf>(data: &'data [u8]) -> Result<Vec<(u64, &'data [u8])>, HarnessError>
where
    Elf: FileHeader<Endian = Endianness>,
{
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let mut segments = Vec::new();
    for phdr in header.program_headers(endian, data)? {
        if phdr.p_type(endian) != elf::PT_LOAD {
            continue;
        }
        let paddr: u64 = phdr.p_paddr(endian).into();
        let bytes = phdr.data(endian, data).map_err(|()| {
            HarnessError::InvalidConfig(format!(
                "segment at {paddr:#x} has file data outside the ELF image"
            ))
        })?;
        if !bytes.is_empty() {
            segments.push((paddr, bytes));
        }
    }
    Ok(segments)
}

fn read_image(path: &Path) -> Result<Vec<u8>, HarnessError> {
    fs::read(path).map_err(|source| HarnessError::ImageIo {
        path: path.to_path_buf(),
        source,
    })
}

fn write_image(path: &Path, contents: &[u8]) -> Result<(), HarnessError> {
    fs::write(path, contents).map_err(|source| HarnessError::ImageIo {
        path: path.to_path_buf(),
        source,
    })
}

/// Converts a flat binary file into a hex image file. Returns the number of lines written.
///
/// # Errors
///
/// Returns `ImageIo` if either file cannot be accessed.
pub fn bin_file_to_hex(bin: &Path, hex: &Path) -> Result<usize, HarnessError> {
    let data = read_image(bin)?;
    let text = bin_to_hex(&data);
    write_image(hex, text.as_bytes())?;
    Ok(text.lines().count())
}

/// Converts an ELF file into a hex image file, optionally keeping the flat binary as well.
/// Returns the number of lines written.
///
/// # Errors
///
/// Returns `ImageIo` on file errors and the errors of [`elf_to_bin`].
pub fn elf_file_to_hex(elf: &Path, hex: &Path, bin: Option<&Path>) -> Result<usize, HarnessError> {
    let data = read_image(elf)?;
    let (base, image) = elf_to_bin(&data)?;
    if base != 0 {
        tracing::info!("image base is {base:#x}; hex word 0 holds the byte at that address");
    }
    if let Some(bin) = bin {
        write_image(bin, &image)?;
    }
    let text = bin_to_hex(&image);
    write_image(hex, text.as_bytes())?;
    Ok(text.lines().count())
}
