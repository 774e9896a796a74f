//! The raw `.mdebug` symbol model and the classifier that turns flat symbol
//! records into a stream of parsed symbols.

use crate::ImporterFlags;
use anyhow::{bail, Result};
use bstr::{BString, ByteSlice};
use stabs::{parse_stabs_symbol, Cursor, StabsSymbol};
use std::fmt;

/// STABS entries are stored in the `.mdebug` local symbol table with their
/// stab type in the index field, offset by this constant.
pub const STABS_SYMBOL_BASE: u32 = 0x8f300;

/// The storage type field of a symbol record.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(u32)]
pub enum SymbolType {
    /// No storage type.
    #[default]
    Nil = 0,
    /// An external symbol.
    Global = 1,
    /// A file-local data symbol.
    Static = 2,
    /// A function parameter.
    Param = 3,
    /// A local variable.
    Local = 4,
    /// A text label.
    Label = 5,
    /// The start of a procedure.
    Proc = 6,
    /// The start of a lexical block.
    Block = 7,
    /// The end of a procedure or block.
    End = 8,
    /// A structure member.
    Member = 9,
    /// A type definition.
    Typedef = 10,
    /// The start of a file.
    File = 11,
    /// A register variable.
    Register = 12,
    /// A forward reference.
    Forward = 13,
    /// The start of a file-local procedure.
    StaticProc = 14,
    /// A constant.
    Constant = 15,
}

impl SymbolType {
    /// Decodes the 6-bit `st` field.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Nil,
            1 => Self::Global,
            2 => Self::Static,
            3 => Self::Param,
            4 => Self::Local,
            5 => Self::Label,
            6 => Self::Proc,
            7 => Self::Block,
            8 => Self::End,
            9 => Self::Member,
            10 => Self::Typedef,
            11 => Self::File,
            12 => Self::Register,
            13 => Self::Forward,
            14 => Self::StaticProc,
            15 => Self::Constant,
            _ => return None,
        })
    }

    /// The name used when listing raw symbols.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Nil => "NIL",
            Self::Global => "GLOBAL",
            Self::Static => "STATIC",
            Self::Param => "PARAM",
            Self::Local => "LOCAL",
            Self::Label => "LABEL",
            Self::Proc => "PROC",
            Self::Block => "BLOCK",
            Self::End => "END",
            Self::Member => "MEMBER",
            Self::Typedef => "TYPEDEF",
            Self::File => "FILE",
            Self::Register => "REGISTER",
            Self::Forward => "FORWARD",
            Self::StaticProc => "STATICPROC",
            Self::Constant => "CONSTANT",
        }
    }
}

/// The storage class field of a symbol record, naming the section or address
/// space a symbol lives in.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[repr(u32)]
pub enum SymbolClass {
    /// No storage class.
    #[default]
    Nil = 0,
    /// The text section.
    Text = 1,
    /// The initialized data section.
    Data = 2,
    /// The uninitialized data section.
    Bss = 3,
    /// A machine register.
    Register = 4,
    /// An absolute value.
    Abs = 5,
    /// Undefined.
    Undefined = 6,
    /// Compiler version info and other annotations.
    Info = 11,
    /// The small initialized data section.
    SData = 13,
    /// The small uninitialized data section.
    SBss = 14,
    /// The read-only data section.
    RData = 15,
    /// A common block.
    Common = 17,
    /// A small common block.
    SCommon = 18,
    /// A small undefined symbol.
    SUndefined = 21,
}

impl SymbolClass {
    /// Decodes the 5-bit `sc` field.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Nil,
            1 => Self::Text,
            2 => Self::Data,
            3 => Self::Bss,
            4 => Self::Register,
            5 => Self::Abs,
            6 => Self::Undefined,
            11 => Self::Info,
            13 => Self::SData,
            14 => Self::SBss,
            15 => Self::RData,
            17 => Self::Common,
            18 => Self::SCommon,
            21 => Self::SUndefined,
            _ => return None,
        })
    }

    /// The name used when listing raw symbols.
    pub fn to_str(self) -> &'static str {
        match self {
            Self::Nil => "NIL",
            Self::Text => "TEXT",
            Self::Data => "DATA",
            Self::Bss => "BSS",
            Self::Register => "REGISTER",
            Self::Abs => "ABS",
            Self::Undefined => "UNDEFINED",
            Self::Info => "INFO",
            Self::SData => "SDATA",
            Self::SBss => "SBSS",
            Self::RData => "RDATA",
            Self::Common => "COMMON",
            Self::SCommon => "SCOMMON",
            Self::SUndefined => "SUNDEFINED",
        }
    }
}

/// Identifies a stab type in the N_* namespace.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct StabsCode(pub u16);

macro_rules! stabs_codes {
    (
        $(
            $code:expr, $name:ident ;
        )*
    ) => {
        #[allow(missing_docs)]
        impl StabsCode {
            $(
                pub const $name: StabsCode = StabsCode($code);
            )*
        }

        static STABS_CODE_NAMES: &[(StabsCode, &str)] = &[
            $(
                (StabsCode($code), stringify!($name)),
            )*
        ];
    }
}

stabs_codes! {
    0x00, STAB;
    0x20, N_GSYM;
    0x22, N_FNAME;
    0x24, N_FUN;
    0x26, N_STSYM;
    0x28, N_LCSYM;
    0x2a, N_MAIN;
    0x30, N_PC;
    0x32, N_NSYMS;
    0x34, N_NOMAP;
    0x38, N_OBJ;
    0x3c, N_OPT;
    0x40, N_RSYM;
    0x42, N_M2C;
    0x44, N_SLINE;
    0x46, N_DSLINE;
    0x48, N_BSLINE;
    0x4a, N_EFD;
    0x50, N_EHDECL;
    0x54, N_CATCH;
    0x60, N_SSYM;
    0x64, N_SO;
    0x80, N_LSYM;
    0x82, N_BINCL;
    0x84, N_SOL;
    0xa0, N_PSYM;
    0xa2, N_EINCL;
    0xa4, N_ENTRY;
    0xc0, N_LBRAC;
    0xc2, N_EXCL;
    0xc4, N_SCOPE;
    0xe0, N_RBRAC;
    0xe2, N_BCOMM;
    0xe4, N_ECOMM;
    0xe8, N_ECOML;
    0xfe, N_LENG;
}

impl StabsCode {
    /// The N_* name of this code, if it is a known one.
    pub fn name(self) -> Option<&'static str> {
        STABS_CODE_NAMES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Debug for StabsCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "N_{:#04x}", self.0),
        }
    }
}

/// One record from a `.mdebug` local or external symbol table.
#[derive(Clone, Debug, Default)]
pub struct Symbol {
    /// An address, register number, stack offset or size, depending on the
    /// symbol kind.
    pub value: u32,
    /// The storage type.
    pub storage_type: SymbolType,
    /// The storage class.
    pub storage_class: SymbolClass,
    /// A kind-specific index. For STABS entries this encodes the stab type.
    pub index: u32,
    /// The symbol string. Not guaranteed to be valid UTF-8.
    pub string: BString,
}

impl Symbol {
    /// Whether this record is a STABS entry.
    pub fn is_stabs(&self) -> bool {
        self.index >= STABS_SYMBOL_BASE && self.index <= STABS_SYMBOL_BASE + 0xff
    }

    /// The stab type of a STABS entry.
    pub fn code(&self) -> StabsCode {
        debug_assert!(self.is_stabs());
        StabsCode((self.index - STABS_SYMBOL_BASE) as u16)
    }
}

/// One translation unit from the `.mdebug` file descriptor table.
#[derive(Clone, Debug, Default)]
pub struct File {
    /// The path of the source file the unit was compiled from.
    pub full_path: String,
    /// The address of the unit's text.
    pub text_address: u32,
    /// The unit's local symbols, in declaration order.
    pub symbols: Vec<Symbol>,
}

/// The decoded contents of a `.mdebug` section.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    /// One entry per translation unit.
    pub files: Vec<File>,
    /// The external symbol table, which holds the addresses of non-static
    /// globals.
    pub externals: Vec<Symbol>,
}

/// A raw symbol classified by what it means to the importer, with the STABS
/// string parsed where there is one.
pub enum ParsedSymbol<'a> {
    /// A `name:type` STABS entry.
    NameColonType {
        /// The parsed symbol string.
        symbol: StabsSymbol,
        /// The raw record it came from.
        raw: &'a Symbol,
    },
    /// An `N_SO` entry starting or ending a source file.
    SourceFile(&'a Symbol),
    /// An `N_SOL` entry attributing code to an included file.
    SubSourceFile(&'a Symbol),
    /// An `N_LBRAC` entry opening a lexical block.
    LBrac(&'a Symbol),
    /// An `N_RBRAC` entry closing a lexical block.
    RBrac(&'a Symbol),
    /// An empty `N_FUN` entry marking the end of a function.
    FunctionEnd(&'a Symbol),
    /// Anything that is not a STABS entry.
    NonStabs(&'a Symbol),
}

impl<'a> ParsedSymbol<'a> {
    /// The raw record this symbol was classified from.
    pub fn raw(&self) -> &'a Symbol {
        match self {
            Self::NameColonType { raw, .. } => raw,
            Self::SourceFile(raw)
            | Self::SubSourceFile(raw)
            | Self::LBrac(raw)
            | Self::RBrac(raw)
            | Self::FunctionEnd(raw)
            | Self::NonStabs(raw) => raw,
        }
    }
}

/// Classifies the raw symbols of one translation unit in declaration order.
///
/// STABS strings split across multiple records are joined before parsing.
/// Parse failures only drop the affected symbol; a truncated string
/// additionally clears [`ImporterFlags::STRICT_PARSING`] for the rest of the
/// import, since the remaining symbols of the unit are often damaged too.
pub fn parse_symbols<'a>(
    input: &'a [Symbol],
    flags: &mut ImporterFlags,
) -> Result<Vec<ParsedSymbol<'a>>> {
    let mut output = Vec::with_capacity(input.len());
    let mut prefix = String::new();
    for symbol in input {
        if !symbol.is_stabs() {
            output.push(ParsedSymbol::NonStabs(symbol));
            continue;
        }
        match symbol.code() {
            StabsCode::N_GSYM
            | StabsCode::N_FUN
            | StabsCode::N_STSYM
            | StabsCode::N_LCSYM
            | StabsCode::N_RSYM
            | StabsCode::N_LSYM
            | StabsCode::N_PSYM => {
                if symbol.string.is_empty() {
                    if !prefix.is_empty() {
                        bail!("Invalid STABS continuation.");
                    }
                    if symbol.code() == StabsCode::N_FUN {
                        output.push(ParsedSymbol::FunctionEnd(symbol));
                    }
                    continue;
                }

                // Some STABS symbols are split between multiple strings.
                let string = symbol.string.to_str_lossy();
                if string.ends_with('\\') {
                    prefix.push_str(&string[..string.len() - 1]);
                    continue;
                }
                let full = if prefix.is_empty() {
                    string.into_owned()
                } else {
                    let mut joined = std::mem::take(&mut prefix);
                    joined.push_str(&string);
                    joined
                };

                let mut cursor = Cursor::new(full.as_bytes());
                match parse_stabs_symbol(&mut cursor) {
                    Ok(parsed) => {
                        if !cursor.is_empty() {
                            log::warn!(
                                "Unknown data {:?} at the end of the '{}' stab.",
                                String::from_utf8_lossy(cursor.remaining()),
                                parsed.name
                            );
                            if flags.contains(ImporterFlags::STRICT_PARSING) {
                                continue;
                            }
                        }
                        output.push(ParsedSymbol::NameColonType {
                            symbol: parsed,
                            raw: symbol,
                        });
                    }
                    Err(error) if error.is_truncated() => {
                        // Caused by a GCC bug. Report a warning and try to
                        // tolerate further faults caused as a result of it.
                        log::warn!("{} Symbol string: {}", error, full);
                        flags.remove(ImporterFlags::STRICT_PARSING);
                    }
                    Err(error) => {
                        log::warn!("Failed to parse stab {:?}: {}", full, error);
                    }
                }
            }
            StabsCode::N_SOL => output.push(ParsedSymbol::SubSourceFile(symbol)),
            StabsCode::N_LBRAC => output.push(ParsedSymbol::LBrac(symbol)),
            StabsCode::N_RBRAC => output.push(ParsedSymbol::RBrac(symbol)),
            StabsCode::N_SO => output.push(ParsedSymbol::SourceFile(symbol)),
            StabsCode::STAB | StabsCode::N_OPT | StabsCode::N_BINCL => {}
            code => {
                log::warn!(
                    "Unhandled {:?} symbol: {}",
                    code,
                    symbol.string.to_str_lossy()
                );
            }
        }
    }
    Ok(output)
}
