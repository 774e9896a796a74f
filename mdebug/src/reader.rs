//! Decodes the `.mdebug` section framing: the symbolic header, the file
//! descriptor table, and the local and external symbol tables.
//!
//! All of the offsets stored in the symbolic header are relative to the
//! start of the file image, not the section, so the reader takes the whole
//! image plus the offset of the section within it.

use crate::symbols::{File, Symbol, SymbolClass, SymbolTable, SymbolType};
use anyhow::{anyhow, bail, Result};
use bstr::{BString, ByteSlice};
use zerocopy::byteorder::{LE, I16, I32, U16, U32};
use zerocopy::{FromBytes, FromZeroes, Unaligned};

const SYMBOLIC_HEADER_MAGIC: u16 = 0x7009;

/// The HDRR structure at the start of the section.
#[derive(FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
pub struct SymbolicHeader {
    /// Magic number, 0x7009.
    pub magic: U16<LE>,
    /// Version stamp.
    pub version_stamp: U16<LE>,
    /// Line number entry count.
    pub iline_max: I32<LE>,
    /// Line number byte count.
    pub cb_line: I32<LE>,
    /// File offset of the line number entries.
    pub cb_line_offset: I32<LE>,
    /// Dense number entry count.
    pub idn_max: I32<LE>,
    /// File offset of the dense number entries.
    pub cb_dn_offset: I32<LE>,
    /// Procedure descriptor count.
    pub ipd_max: I32<LE>,
    /// File offset of the procedure descriptors.
    pub cb_pd_offset: I32<LE>,
    /// Local symbol count.
    pub isym_max: I32<LE>,
    /// File offset of the local symbols.
    pub cb_sym_offset: I32<LE>,
    /// Optimization entry count.
    pub iopt_max: I32<LE>,
    /// File offset of the optimization entries.
    pub cb_opt_offset: I32<LE>,
    /// Auxiliary symbol count.
    pub iaux_max: I32<LE>,
    /// File offset of the auxiliary symbols.
    pub cb_aux_offset: I32<LE>,
    /// Local string table byte count.
    pub iss_max: I32<LE>,
    /// File offset of the local string table.
    pub cb_ss_offset: I32<LE>,
    /// External string table byte count.
    pub iss_ext_max: I32<LE>,
    /// File offset of the external string table.
    pub cb_ss_ext_offset: I32<LE>,
    /// File descriptor count.
    pub ifd_max: I32<LE>,
    /// File offset of the file descriptors.
    pub cb_fd_offset: I32<LE>,
    /// Relative file descriptor count.
    pub crfd: I32<LE>,
    /// File offset of the relative file descriptors.
    pub cb_rfd_offset: I32<LE>,
    /// External symbol count.
    pub iext_max: I32<LE>,
    /// File offset of the external symbols.
    pub cb_ext_offset: I32<LE>,
}

/// A SYMR record. The flags field packs `st:6, sc:5, reserved:1, index:20`
/// from the least significant bit.
#[derive(FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct RawSymbol {
    iss: I32<LE>,
    value: U32<LE>,
    flags: U32<LE>,
}

impl RawSymbol {
    fn storage_type(&self) -> u32 {
        self.flags.get() & 0x3f
    }

    fn storage_class(&self) -> u32 {
        (self.flags.get() >> 6) & 0x1f
    }

    fn index(&self) -> u32 {
        self.flags.get() >> 12
    }
}

/// An EXTR record: a SYMR plus the owning file descriptor.
#[derive(FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct RawExternalSymbol {
    reserved: U16<LE>,
    ifd: I16<LE>,
    symbol: RawSymbol,
}

/// An FDR record.
#[derive(FromBytes, FromZeroes, Unaligned)]
#[repr(C)]
struct RawFileDescriptor {
    adr: U32<LE>,
    rss: I32<LE>,
    iss_base: I32<LE>,
    cb_ss: I32<LE>,
    isym_base: I32<LE>,
    csym: I32<LE>,
    iline_base: I32<LE>,
    cline: I32<LE>,
    iopt_base: I32<LE>,
    copt: I32<LE>,
    ipd_first: I16<LE>,
    cpd: I16<LE>,
    iaux_base: I32<LE>,
    caux: I32<LE>,
    rfd_base: I32<LE>,
    crfd: I32<LE>,
    flags: U32<LE>,
    cb_line_offset: I32<LE>,
    cb_line: I32<LE>,
}

impl RawFileDescriptor {
    fn big_endian(&self) -> bool {
        (self.flags.get() >> 7) & 1 != 0
    }
}

/// Reads the symbolic header of a `.mdebug` section.
pub fn parse_symbolic_header(image: &[u8], section_offset: u32) -> Result<SymbolicHeader> {
    let header = image
        .get(section_offset as usize..)
        .and_then(SymbolicHeader::read_from_prefix)
        .ok_or_else(|| anyhow!("MIPS debug section too small for a symbolic header."))?;
    if header.magic.get() != SYMBOLIC_HEADER_MAGIC {
        bail!("Invalid symbolic header.");
    }
    Ok(header)
}

/// Decodes a whole `.mdebug` section into flat per-file symbol lists.
pub fn parse_symbol_table(image: &[u8], section_offset: u32) -> Result<SymbolTable> {
    let header = parse_symbolic_header(image, section_offset)?;
    let mut table = SymbolTable::default();

    let fd_offset = header.cb_fd_offset.get() as usize;
    for i in 0..header.ifd_max.get().max(0) as usize {
        let offset = fd_offset + i * std::mem::size_of::<RawFileDescriptor>();
        let descriptor = image
            .get(offset..)
            .and_then(RawFileDescriptor::read_from_prefix)
            .ok_or_else(|| anyhow!("File descriptor {} out of bounds.", i))?;
        if descriptor.big_endian() {
            bail!("Not little endian or bad file descriptor table.");
        }

        let string_base = (header.cb_ss_offset.get() + descriptor.iss_base.get()) as usize;
        let mut file = File {
            full_path: read_string(image, string_base.wrapping_add(descriptor.rss.get() as usize))
                .to_str_lossy()
                .into_owned(),
            text_address: descriptor.adr.get(),
            symbols: Vec::with_capacity(descriptor.csym.get().max(0) as usize),
        };

        let symbol_base = header.cb_sym_offset.get() as usize
            + descriptor.isym_base.get() as usize * std::mem::size_of::<RawSymbol>();
        for j in 0..descriptor.csym.get().max(0) as usize {
            let symbol_offset = symbol_base + j * std::mem::size_of::<RawSymbol>();
            let raw = image
                .get(symbol_offset..)
                .and_then(RawSymbol::read_from_prefix)
                .ok_or_else(|| anyhow!("Local symbol {} of file {} out of bounds.", j, i))?;
            file.symbols
                .push(decode_symbol(&raw, image, string_base));
        }

        table.files.push(file);
    }

    let external_base = header.cb_ext_offset.get() as usize;
    let external_string_base = header.cb_ss_ext_offset.get() as usize;
    for i in 0..header.iext_max.get().max(0) as usize {
        let offset = external_base + i * std::mem::size_of::<RawExternalSymbol>();
        let raw = image
            .get(offset..)
            .and_then(RawExternalSymbol::read_from_prefix)
            .ok_or_else(|| anyhow!("External symbol {} out of bounds.", i))?;
        table
            .externals
            .push(decode_symbol(&raw.symbol, image, external_string_base));
    }

    Ok(table)
}

fn decode_symbol(raw: &RawSymbol, image: &[u8], string_base: usize) -> Symbol {
    let string = if raw.iss.get() >= 0 {
        read_string(image, string_base.wrapping_add(raw.iss.get() as usize))
    } else {
        BString::default()
    };
    Symbol {
        value: raw.value.get(),
        storage_type: SymbolType::from_raw(raw.storage_type()).unwrap_or(SymbolType::Nil),
        storage_class: SymbolClass::from_raw(raw.storage_class()).unwrap_or(SymbolClass::Nil),
        index: raw.index(),
        string,
    }
}

fn read_string(image: &[u8], offset: usize) -> BString {
    image
        .get(offset..)
        .and_then(|bytes| bytes.split(|&b| b == 0).next())
        .map(BString::from)
        .unwrap_or_default()
}
