//! Command line tool for inspecting the symbol tables of PlayStation 2 era
//! ELF files.

#![forbid(unused_must_use)]

mod demangler;
mod depgraph;
mod json;
mod print_cpp;

use anyhow::{anyhow, bail, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use mdebug::database::{SymbolDatabase, SymbolKind, SymbolSourceHandle};
use mdebug::elf::ElfFile;
use mdebug::import::{import_symbol_table, DemanglerFn};
use mdebug::reader::{parse_symbol_table, parse_symbolic_header};
use mdebug::symbols::{Symbol, SymbolTable};
use mdebug::{Address, ImporterFlags};
use print_cpp::{CppPrinter, CppPrinterConfig};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "stdump", version, about = "MIPS/STABS symbol table parser")]
struct Stdump {
    /// Reduce logging to warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Turn on debug output. Noisy!
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify the symbol tables present in the input file.
    Identify {
        /// The ELF file to read.
        input: PathBuf,
    },
    /// Print all the functions recovered from the STABS symbols as C++.
    Functions(SymbolTableOptions),
    /// Print all the global variables recovered from the STABS symbols as
    /// C++.
    Globals(SymbolTableOptions),
    /// Print all the types recovered from the STABS symbols as C++.
    Types(SymbolTableOptions),
    /// Print a dependency graph of all the types in graphviz DOT format.
    #[command(name = "type_graph")]
    TypeGraph(SymbolTableOptions),
    /// Print the labels recovered from the symbol table.
    Labels(SymbolTableOptions),
    /// Print all of the above as JSON.
    Json(SymbolTableOptions),
    /// Print the raw symbols in the symbol table.
    Symbols(SymbolTableOptions),
    /// Print the contents of the file headers.
    Headers(SymbolTableOptions),
    /// Print a list of all the source files.
    Files(SymbolTableOptions),
    /// List the names of the source files associated with each ELF section.
    Sections(SymbolTableOptions),
}

#[derive(Args)]
struct SymbolTableOptions {
    /// The ELF file to read.
    input: PathBuf,

    /// Write the output to a file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Read the symbol table from the section with this name.
    #[arg(long)]
    section: Option<String>,

    /// The symbol table format to expect.
    #[arg(long)]
    format: Option<String>,

    /// Do not deduplicate types from different translation units.
    #[arg(long)]
    per_file: bool,

    /// Do not print access specifiers.
    #[arg(long)]
    omit_access_specifiers: bool,

    /// Do not print member functions.
    #[arg(long)]
    omit_member_functions: bool,

    /// Include member functions that are likely auto-generated.
    #[arg(long)]
    include_generated_functions: bool,

    /// Do not demangle function or variable names.
    #[arg(long)]
    mangled: bool,

    /// Only print local .mdebug symbols.
    #[arg(long)]
    locals: bool,

    /// Only print external .mdebug symbols.
    #[arg(long)]
    externals: bool,
}

impl SymbolTableOptions {
    fn importer_flags(&self) -> ImporterFlags {
        let mut flags = ImporterFlags::empty();
        if self.per_file {
            flags |= ImporterFlags::DONT_DEDUPLICATE_TYPES;
        }
        if self.omit_access_specifiers {
            flags |= ImporterFlags::NO_ACCESS_SPECIFIERS;
        }
        if self.omit_member_functions {
            flags |= ImporterFlags::NO_MEMBER_FUNCTIONS;
        }
        if !self.include_generated_functions {
            flags |= ImporterFlags::NO_GENERATED_MEMBER_FUNCTIONS;
        }
        flags
    }

    fn printer_config(&self, storage: bool) -> CppPrinterConfig {
        CppPrinterConfig {
            print_offsets_and_sizes: true,
            print_storage_information: storage,
            omit_access_specifiers: self.omit_access_specifiers,
        }
    }
}

fn main() -> ExitCode {
    let stdump = match Stdump::try_parse() {
        Ok(stdump) => stdump,
        Err(error) => {
            let code: u8 = match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 1,
                _ => 2,
            };
            let _ = error.print();
            return ExitCode::from(code);
        }
    };

    let level = if stdump.quiet {
        log::LevelFilter::Warn
    } else if stdump.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(level)
        .init();

    match run(stdump.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Identify { input } => identify(&input),
        Command::Functions(options) => functions(&options),
        Command::Globals(options) => globals(&options),
        Command::Types(options) => types(&options),
        Command::TypeGraph(options) => type_graph(&options),
        Command::Labels(options) => labels(&options),
        Command::Json(options) => json_command(&options),
        Command::Symbols(options) => symbols(&options),
        Command::Headers(options) => headers(&options),
        Command::Files(options) => files(&options),
        Command::Sections(options) => sections(&options),
    }
}

/// Section names that identify known symbol table formats.
const SYMBOL_TABLE_SECTIONS: [(&str, &str); 5] = [
    (".symtab", "symtab"),
    (".mdebug", "mdebug"),
    (".stab", "stab"),
    (".debug", "dwarf"),
    (".sndata", "sndll"),
];

fn identify(input: &PathBuf) -> Result<()> {
    let elf = read_elf(input)?;
    let mut found = false;
    for (section_name, format_name) in SYMBOL_TABLE_SECTIONS {
        if elf.section_by_name(section_name).is_some() {
            println!("{}: {} section", format_name, section_name);
            found = true;
        }
    }
    if !found {
        println!("no known symbol tables");
    }
    Ok(())
}

fn functions(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    for file in database.source_files.iter() {
        if file.functions.is_empty() {
            continue;
        }
        writeln!(out, "// *** {} ***", file.full_path())?;
        writeln!(out)?;
        for &handle in &file.functions {
            let Some(function) = database.functions.symbol_from_handle(handle) else {
                continue;
            };
            let mut printer = CppPrinter::new(&mut out, options.printer_config(true));
            printer.function(function, &database)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn globals(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    for file in database.source_files.iter() {
        if file.global_variables.is_empty() {
            continue;
        }
        writeln!(out, "// *** {} ***", file.full_path())?;
        writeln!(out)?;
        for &handle in &file.global_variables {
            let Some(global) = database.global_variables.symbol_from_handle(handle) else {
                continue;
            };
            let mut printer = CppPrinter::new(&mut out, options.printer_config(true));
            printer.global_variable(global)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn types(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    if options.per_file {
        for file in database.source_files.iter() {
            writeln!(out, "// *** {} ***", file.full_path())?;
            writeln!(out)?;
            for &handle in &file.data_types {
                let Some(data_type) = database.data_types.symbol_from_handle(handle) else {
                    continue;
                };
                let mut printer = CppPrinter::new(&mut out, options.printer_config(false));
                printer.data_type(data_type, &database)?;
                writeln!(out)?;
            }
        }
    } else {
        for data_type in database.data_types.iter() {
            let mut printer = CppPrinter::new(&mut out, options.printer_config(false));
            printer.data_type(data_type, &database)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn type_graph(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    depgraph::print_type_dependency_graph(&mut out, &database)?;
    Ok(())
}

fn labels(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    for label in database.labels.iter() {
        let address = label.address.unwrap_or(Address(0));
        writeln!(out, "{} {}", address, label.name())?;
    }
    Ok(())
}

fn json_command(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    let value = json::database_to_json(&database);
    serde_json::to_writer_pretty(&mut out, &value)?;
    writeln!(out)?;
    Ok(())
}

fn symbols(options: &SymbolTableOptions) -> Result<()> {
    let elf = read_elf(&options.input)?;
    let table = read_symbol_table(&elf, options)?;
    let mut out = output_stream(options)?;
    let print_all = !options.locals && !options.externals;
    if options.locals || print_all {
        for file in &table.files {
            writeln!(out, "// *** {} ***", file.full_path)?;
            for symbol in &file.symbols {
                print_raw_symbol(&mut out, symbol)?;
            }
        }
    }
    if options.externals || print_all {
        writeln!(out, "// *** external symbols ***")?;
        for symbol in &table.externals {
            print_raw_symbol(&mut out, symbol)?;
        }
    }
    Ok(())
}

fn print_raw_symbol<W: Write>(out: &mut W, symbol: &Symbol) -> Result<()> {
    write!(
        out,
        "{:08x} {:10} {:10} ",
        symbol.value,
        symbol.storage_type.to_str(),
        symbol.storage_class.to_str()
    )?;
    if symbol.is_stabs() {
        write!(out, "{:<8}", format!("{:?}", symbol.code()))?;
    } else {
        write!(out, "{:<8x}", symbol.index)?;
    }
    writeln!(out, " {}", String::from_utf8_lossy(&symbol.string))?;
    Ok(())
}

fn headers(options: &SymbolTableOptions) -> Result<()> {
    let elf = read_elf(&options.input)?;
    let section = find_symbol_section(&elf, options)?;
    let header = parse_symbolic_header(elf.image(), section.file_offset)?;
    let mut out = output_stream(options)?;
    writeln!(out, "magic:                {:#06x}", header.magic.get())?;
    writeln!(out, "version stamp:        {:#06x}", header.version_stamp.get())?;
    writeln!(out, "line numbers:         {:#x} bytes at {:#x}", header.cb_line.get(), header.cb_line_offset.get())?;
    writeln!(out, "procedure descriptors: {} at {:#x}", header.ipd_max.get(), header.cb_pd_offset.get())?;
    writeln!(out, "local symbols:        {} at {:#x}", header.isym_max.get(), header.cb_sym_offset.get())?;
    writeln!(out, "auxiliary symbols:    {} at {:#x}", header.iaux_max.get(), header.cb_aux_offset.get())?;
    writeln!(out, "local strings:        {:#x} bytes at {:#x}", header.iss_max.get(), header.cb_ss_offset.get())?;
    writeln!(out, "external strings:     {:#x} bytes at {:#x}", header.iss_ext_max.get(), header.cb_ss_ext_offset.get())?;
    writeln!(out, "file descriptors:     {} at {:#x}", header.ifd_max.get(), header.cb_fd_offset.get())?;
    writeln!(out, "external symbols:     {} at {:#x}", header.iext_max.get(), header.cb_ext_offset.get())?;
    Ok(())
}

fn files(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    for file in database.source_files.iter() {
        write!(out, "{}", file.full_path())?;
        if !file.relative_path.is_empty() && file.relative_path != file.full_path() {
            write!(out, " ({})", file.relative_path)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn sections(options: &SymbolTableOptions) -> Result<()> {
    let database = read_symbol_database(options)?;
    let mut out = output_stream(options)?;
    for section in database.sections.iter() {
        let Some(range) = section.address_range() else {
            continue;
        };
        if range.low == 0 {
            continue;
        }
        writeln!(out, "{} {:#x}..{:#x}:", section.name(), range.low, range.high)?;
        for file in database.source_files.iter() {
            if range.contains(file.text_address) {
                writeln!(out, "\t{}", file.full_path())?;
            }
        }
    }
    Ok(())
}

fn read_elf(input: &PathBuf) -> Result<ElfFile> {
    let image = std::fs::read(input)
        .map_err(|error| anyhow!("Failed to read '{}': {}.", input.display(), error))?;
    ElfFile::parse(image)
}

fn find_symbol_section<'a>(
    elf: &'a ElfFile,
    options: &SymbolTableOptions,
) -> Result<&'a mdebug::elf::Section> {
    if let Some(format) = &options.format {
        if format != "mdebug" {
            bail!("Unsupported symbol table format '{}'.", format);
        }
    }
    let section_name = options.section.as_deref().unwrap_or(".mdebug");
    elf.section_by_name(section_name)
        .ok_or_else(|| anyhow!("No {} section.", section_name))
}

fn read_symbol_table(elf: &ElfFile, options: &SymbolTableOptions) -> Result<SymbolTable> {
    let section = find_symbol_section(elf, options)?;
    parse_symbol_table(elf.image(), section.file_offset)
}

fn read_symbol_database(options: &SymbolTableOptions) -> Result<SymbolDatabase> {
    let elf = read_elf(&options.input)?;
    let table = read_symbol_table(&elf, options)?;
    let mut database = SymbolDatabase::default();
    let demangler: Option<DemanglerFn> = if options.mangled {
        None
    } else {
        Some(demangler::demangle)
    };
    let source = import_symbol_table(&mut database, &table, options.importer_flags(), demangler)?;
    import_sections(&mut database, &elf, source);
    Ok(database)
}

/// Records the ELF sections in the database so the section commands can use
/// handles like everything else.
fn import_sections(database: &mut SymbolDatabase, elf: &ElfFile, source: SymbolSourceHandle) {
    for section in &elf.sections {
        if section.name.is_empty() {
            continue;
        }
        let handle = database.sections.create_symbol(section.name.clone(), source);
        if let Some(symbol) = database.sections.symbol_from_handle_mut(handle) {
            symbol.address = (section.address != 0).then_some(Address(section.address));
            symbol.size = section.size;
        }
    }
}

fn output_stream(options: &SymbolTableOptions) -> Result<Box<dyn Write>> {
    match &options.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|error| anyhow!("Failed to open '{}': {}.", path.display(), error))?;
            Ok(Box::new(std::io::BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}
