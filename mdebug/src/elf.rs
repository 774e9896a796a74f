//! A minimal 32-bit little-endian ELF reader, just enough to find the
//! sections of a PlayStation 2 executable.

use anyhow::{anyhow, bail, Result};
use bstr::ByteSlice;
use zerocopy::byteorder::{LE, U16, U32};
use zerocopy::{FromBytes, FromZeroes, Unaligned};

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const CLASS_32_BIT: u8 = 1;
const ENDIAN_LITTLE: u8 = 1;

/// The EE core is plain MIPS as far as ELF is concerned.
pub const MACHINE_MIPS: u16 = 8;

#[derive(FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct FileHeader {
    magic: [u8; 4],
    class: u8,
    endianness: u8,
    ident_version: u8,
    abi: u8,
    pad: [u8; 8],
    file_type: U16<LE>,
    machine: U16<LE>,
    version: U32<LE>,
    entry: U32<LE>,
    phoff: U32<LE>,
    shoff: U32<LE>,
    flags: U32<LE>,
    ehsize: U16<LE>,
    phentsize: U16<LE>,
    phnum: U16<LE>,
    shentsize: U16<LE>,
    shnum: U16<LE>,
    shstrndx: U16<LE>,
}

#[derive(FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct SectionHeader {
    name: U32<LE>,
    section_type: U32<LE>,
    flags: U32<LE>,
    addr: U32<LE>,
    offset: U32<LE>,
    size: U32<LE>,
    link: U32<LE>,
    info: U32<LE>,
    addralign: U32<LE>,
    entsize: U32<LE>,
}

/// One section of the file.
#[derive(Clone, Debug)]
pub struct Section {
    /// The section name.
    pub name: String,
    /// The section type field.
    pub section_type: u32,
    /// The virtual address, zero if the section is not mapped.
    pub address: u32,
    /// The offset of the section's contents in the file.
    pub file_offset: u32,
    /// The size of the section in bytes.
    pub size: u32,
}

/// A parsed ELF file. Owns the file image, since `.mdebug` offsets are
/// relative to the start of the file rather than the section.
pub struct ElfFile {
    image: Vec<u8>,
    /// The machine field of the file header.
    pub machine: u16,
    /// The entry point.
    pub entry: u32,
    /// The sections, in header order.
    pub sections: Vec<Section>,
}

impl ElfFile {
    /// Parses the headers of an ELF file.
    pub fn parse(image: Vec<u8>) -> Result<ElfFile> {
        let header = FileHeader::read_from_prefix(&image)
            .ok_or_else(|| anyhow!("File too small for an ELF header."))?;
        if header.magic != ELF_MAGIC {
            bail!("Not an ELF file.");
        }
        if header.class != CLASS_32_BIT || header.endianness != ENDIAN_LITTLE {
            bail!("Only 32-bit little-endian ELF files are supported.");
        }
        if header.machine.get() != MACHINE_MIPS {
            log::warn!(
                "Unexpected machine type {:#x}, expected MIPS.",
                header.machine.get()
            );
        }

        let shoff = header.shoff.get() as usize;
        let shentsize = header.shentsize.get() as usize;
        let shnum = header.shnum.get() as usize;
        if shentsize < std::mem::size_of::<SectionHeader>() {
            bail!("Invalid section header size.");
        }

        let mut headers = Vec::with_capacity(shnum);
        for i in 0..shnum {
            let offset = shoff + i * shentsize;
            let section = image
                .get(offset..)
                .and_then(SectionHeader::read_from_prefix)
                .ok_or_else(|| anyhow!("Section header {} out of bounds.", i))?;
            headers.push(section);
        }

        // Section names live in the section named by shstrndx.
        let shstrndx = header.shstrndx.get() as usize;
        let name_table: &[u8] = match headers.get(shstrndx) {
            Some(strtab) => {
                let start = strtab.offset.get() as usize;
                let end = start + strtab.size.get() as usize;
                image.get(start..end).unwrap_or(&[])
            }
            None => &[],
        };

        let sections = headers
            .iter()
            .map(|raw| {
                let name_offset = raw.name.get() as usize;
                let name = name_table
                    .get(name_offset..)
                    .and_then(|bytes| bytes.split(|&b| b == 0).next())
                    .map(|bytes| bytes.to_str_lossy().into_owned())
                    .unwrap_or_default();
                Section {
                    name,
                    section_type: raw.section_type.get(),
                    address: raw.addr.get(),
                    file_offset: raw.offset.get(),
                    size: raw.size.get(),
                }
            })
            .collect();

        Ok(ElfFile {
            machine: header.machine.get(),
            entry: header.entry.get(),
            image,
            sections,
        })
    }

    /// The whole file image.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Finds a section by name.
    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    /// The bytes of a section.
    pub fn section_bytes(&self, section: &Section) -> Result<&[u8]> {
        let start = section.file_offset as usize;
        let end = start + section.size as usize;
        self.image
            .get(start..end)
            .ok_or_else(|| anyhow!("Section '{}' out of bounds.", section.name))
    }
}
