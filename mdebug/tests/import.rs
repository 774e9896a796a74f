//! Tests for the whole import pipeline, driven by hand-written symbol
//! fixtures based on real compiler output from the old homebrew toolchain
//! (GCC 3.2.3) except where otherwise stated.

use mdebug::ast::{NodeData, StorageClass};
use mdebug::database::{SymbolDatabase, SymbolKind};
use mdebug::dedup::deduplicate_types;
use mdebug::import::import_symbol_table;
use mdebug::symbols::{File, StabsCode, Symbol, SymbolClass, SymbolTable, SymbolType, STABS_SYMBOL_BASE};
use mdebug::ImporterFlags;

fn stab(code: StabsCode, value: u32, string: &str) -> Symbol {
    Symbol {
        value,
        storage_type: SymbolType::Nil,
        storage_class: SymbolClass::Nil,
        index: STABS_SYMBOL_BASE + code.0 as u32,
        string: string.into(),
    }
}

fn text(storage_type: SymbolType, value: u32, index: u32, string: &str) -> Symbol {
    Symbol {
        value,
        storage_type,
        storage_class: SymbolClass::Text,
        index,
        string: string.into(),
    }
}

fn text_stab(code: StabsCode, value: u32, string: &str) -> Symbol {
    Symbol {
        value,
        storage_type: SymbolType::Label,
        storage_class: SymbolClass::Text,
        index: STABS_SYMBOL_BASE + code.0 as u32,
        string: string.into(),
    }
}

fn run_importer(symbols: Vec<Symbol>) -> SymbolDatabase {
    run_importer_with_files(vec![symbols], ImporterFlags::empty())
}

fn run_importer_with_files(files: Vec<Vec<Symbol>>, flags: ImporterFlags) -> SymbolDatabase {
    let table = SymbolTable {
        files: files
            .into_iter()
            .enumerate()
            .map(|(i, symbols)| File {
                full_path: format!("test{}.cpp", i),
                text_address: 0,
                symbols,
            })
            .collect(),
        externals: Vec::new(),
    };
    let mut database = SymbolDatabase::default();
    import_symbol_table(&mut database, &table, flags, None).expect("import failed");
    database
}

// ee-g++ -gstabs
// enum Enum {};
#[test]
fn empty_enum() {
    let database = run_importer(vec![stab(StabsCode::N_LSYM, 0, "Enum:t(1,1)=e;")]);
    assert_eq!(database.data_types.len(), 1);
    let handle = database.data_types.first_handle_from_name("Enum").unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let node = data_type.node.as_ref().unwrap();
    assert!(matches!(node.data, NodeData::InlineEnum(_)));
    assert_eq!(node.storage_class, StorageClass::Typedef);
    assert!(!data_type.conflict);
}

// ee-g++ -gstabs
// struct Struct {};
#[test]
fn struct_tag_then_typedef_reference() {
    let database = run_importer(vec![
        stab(StabsCode::N_LSYM, 0, "Struct:T(1,1)=s1;"),
        stab(StabsCode::N_LSYM, 0, "Struct:t(1,1)"),
    ]);
    assert_eq!(database.data_types.len(), 1);
    let handle = database.data_types.first_handle_from_name("Struct").unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let node = data_type.node.as_ref().unwrap();
    let NodeData::InlineStructOrUnion(sou) = &node.data else {
        panic!("not a struct");
    };
    assert!(sou.is_struct);
    assert_eq!(node.size_bits, 8);
    assert_eq!(node.storage_class, StorageClass::None);
    assert!(!data_type.conflict);
}

// ee-g++ -gstabs
// typedef struct {} TypedefedStruct;
#[test]
fn typedefed_struct() {
    let database = run_importer(vec![stab(StabsCode::N_LSYM, 0, "TypedefedStruct:t(1,1)=s1;")]);
    assert_eq!(database.data_types.len(), 1);
    let handle = database
        .data_types
        .first_handle_from_name("TypedefedStruct")
        .unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let node = data_type.node.as_ref().unwrap();
    assert!(matches!(node.data, NodeData::InlineStructOrUnion(_)));
    assert_eq!(node.storage_class, StorageClass::Typedef);
    assert!(sou_has_no_members(node));
}

fn sou_has_no_members(node: &mdebug::ast::Node) -> bool {
    match &node.data {
        NodeData::InlineStructOrUnion(sou) => {
            sou.base_classes.is_empty() && sou.fields.is_empty() && sou.member_functions.is_empty()
        }
        _ => false,
    }
}

// ee-g++ -gstabs
// typedef struct NamedTypedefStruct {} NamedTypedefStruct;
#[test]
fn named_typedefed_struct() {
    let database = run_importer(vec![
        stab(StabsCode::N_LSYM, 0, "NamedTypedefedStruct:T(1,1)=s1;"),
        stab(StabsCode::N_LSYM, 0, "NamedTypedefedStruct:t(1,1)"),
        stab(StabsCode::N_LSYM, 0, "NamedTypedefedStruct:t(1,2)=(1,1)"),
    ]);
    assert_eq!(database.data_types.len(), 1);
    let handle = database
        .data_types
        .first_handle_from_name("NamedTypedefedStruct")
        .unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let node = data_type.node.as_ref().unwrap();
    assert!(matches!(node.data, NodeData::InlineStructOrUnion(_)));
}

// ee-g++ -gstabs
// void SimpleFunction() {}
#[test]
fn simple_function() {
    let database = run_importer(vec![
        text_stab(StabsCode::N_FUN, 0x0, "_Z14SimpleFunctionv:F(0,23)"),
        text(SymbolType::Label, 0x0, 1, "$LM1"),
        text(SymbolType::Proc, 0x0, 1, "_Z14SimpleFunctionv"),
        text(SymbolType::Label, 0xc, 1, "$LM2"),
        text(SymbolType::End, 0x20, 31, "_Z14SimpleFunctionv"),
    ]);
    assert_eq!(database.functions.len(), 1);
    let handle = database
        .functions
        .first_handle_from_name("_Z14SimpleFunctionv")
        .unwrap();
    let function = database.functions.symbol_from_handle(handle).unwrap();
    let range = function.address_range().unwrap();
    assert_eq!(range.low, 0x0);
    assert_eq!(range.high, 0x20);
    assert!(function.local_variables().is_empty());
    assert_eq!(function.line_numbers.len(), 2);
}

// iop-gcc -gstabs
// void SimpleFunction() {}
#[test]
fn simple_function_iop() {
    let database = run_importer(vec![
        text(SymbolType::Proc, 0x0, 1, "SimpleFunction"),
        text(SymbolType::Label, 0xc, 1, "$LM2"),
        text(SymbolType::End, 0x20, 27, "SimpleFunction"),
        text_stab(StabsCode::N_FUN, 0x0, "SimpleFunction:F22"),
    ]);
    assert_eq!(database.functions.len(), 1);
    let handle = database
        .functions
        .first_handle_from_name("SimpleFunction")
        .unwrap();
    assert!(database.functions.symbol_from_handle(handle).is_some());
}

// ee-g++ -gstabs
// int ComplicatedFunction(int a, float b, char* c) {
//     int x = b < 0;
//     if(a) { int y = b + *c; return y; }
//     int z = x + 1;
//     return z;
// }
#[test]
fn complicated_function() {
    let database = run_importer(vec![
        text_stab(StabsCode::N_FUN, 0x0, "_Z19ComplicatedFunctionifPc:F(0,1)"),
        stab(StabsCode::N_PSYM, 0xffffffd0, "a:p(0,1)"),
        stab(StabsCode::N_PSYM, 0xffffffd4, "b:p(0,14)"),
        stab(StabsCode::N_PSYM, 0xffffffd8, "c:p(1,1)=*(0,2)"),
        text(SymbolType::Label, 0x0, 1, "$LM1"),
        text(SymbolType::Proc, 0x0, 1, "_Z19ComplicatedFunctionifPc"),
        text(SymbolType::Label, 0x18, 2, "$LM2"),
        text(SymbolType::Label, 0x48, 3, "$LM3"),
        text(SymbolType::End, 0x100, 34, "_Z19ComplicatedFunctionifPc"),
        stab(StabsCode::N_LSYM, 0xffffffdc, "x:(0,1)"),
        stab(StabsCode::N_LBRAC, 0x18, ""),
        stab(StabsCode::N_LSYM, 0xffffffe0, "y:(0,1)"),
        stab(StabsCode::N_LBRAC, 0x54, ""),
        stab(StabsCode::N_RBRAC, 0x88, ""),
        stab(StabsCode::N_LSYM, 0xffffffe4, "z:(0,1)"),
        stab(StabsCode::N_LBRAC, 0xa4, ""),
        stab(StabsCode::N_RBRAC, 0xcc, ""),
        stab(StabsCode::N_RBRAC, 0xe8, ""),
    ]);
    assert_eq!(database.functions.len(), 1);
    assert_eq!(database.parameter_variables.len(), 3);
    assert_eq!(database.local_variables.len(), 3);

    let handle = database
        .functions
        .first_handle_from_name("_Z19ComplicatedFunctionifPc")
        .unwrap();
    let function = database.functions.symbol_from_handle(handle).unwrap();
    assert_eq!(function.parameter_variables.len(), 3);
    assert_eq!(function.local_variables().len(), 3);

    // The inner block's local is delimited by its own brackets.
    let y = database
        .local_variables
        .first_handle_from_name("y")
        .unwrap();
    let y = database.local_variables.symbol_from_handle(y).unwrap();
    let live_range = y.live_range.unwrap();
    assert_eq!(live_range.low, 0x54);
    assert_eq!(live_range.high, 0x88);
}

// The import driver never creates two functions with overlapping address
// ranges within one translation unit.
#[test]
fn function_ranges_do_not_overlap() {
    let database = run_importer(vec![
        text_stab(StabsCode::N_FUN, 0x0, "_Z5firstv:F(0,23)"),
        text(SymbolType::Proc, 0x0, 1, "_Z5firstv"),
        text(SymbolType::End, 0x20, 10, "_Z5firstv"),
        stab(StabsCode::N_FUN, 0, ""),
        text_stab(StabsCode::N_FUN, 0x20, "_Z6secondv:F(0,23)"),
        text(SymbolType::Proc, 0x20, 1, "_Z6secondv"),
        text(SymbolType::End, 0x30, 20, "_Z6secondv"),
    ]);
    assert_eq!(database.functions.len(), 2);
    let ranges: Vec<_> = database
        .functions
        .iter()
        .filter_map(|function| function.address_range())
        .collect();
    assert_eq!(ranges.len(), 2);
    assert!(!ranges[0].overlaps(&ranges[1]));
}

// Two files defining identical structs merge into one data type recording
// both files.
#[test]
fn identical_types_deduplicate() {
    let foo = "Foo:T(1,1)=s4a:(0,1),0,32;;";
    let database = run_importer_with_files(
        vec![
            vec![stab(StabsCode::N_LSYM, 0, foo)],
            vec![stab(StabsCode::N_LSYM, 0, foo)],
        ],
        ImporterFlags::empty(),
    );
    assert_eq!(database.data_types.len(), 1);
    let handle = database.data_types.first_handle_from_name("Foo").unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    assert_eq!(data_type.files.len(), 2);
    assert!(!data_type.conflict);
}

// A differing field size keeps both copies and marks the conflict.
#[test]
fn differing_types_conflict() {
    let database = run_importer_with_files(
        vec![
            vec![stab(StabsCode::N_LSYM, 0, "Foo:T(1,1)=s4a:(0,1),0,32;;")],
            vec![stab(StabsCode::N_LSYM, 0, "Foo:T(1,1)=s4a:(0,1),0,16;;")],
        ],
        ImporterFlags::empty(),
    );
    assert_eq!(database.data_types.len(), 2);
    for handle in database.data_types.handles_from_name("Foo") {
        let data_type = database.data_types.symbol_from_handle(*handle).unwrap();
        assert!(data_type.conflict);
        assert_eq!(data_type.compare_fail_reason, Some("sizes"));
    }
}

#[test]
fn per_file_flag_disables_deduplication() {
    let foo = "Foo:T(1,1)=s4a:(0,1),0,32;;";
    let database = run_importer_with_files(
        vec![
            vec![stab(StabsCode::N_LSYM, 0, foo)],
            vec![stab(StabsCode::N_LSYM, 0, foo)],
        ],
        ImporterFlags::DONT_DEDUPLICATE_TYPES,
    );
    assert_eq!(database.data_types.len(), 2);
}

#[test]
fn deduplication_is_idempotent() {
    let mut database = run_importer_with_files(
        vec![
            vec![stab(StabsCode::N_LSYM, 0, "Foo:T(1,1)=s4a:(0,1),0,32;;")],
            vec![stab(StabsCode::N_LSYM, 0, "Foo:T(1,1)=s4a:(0,1),0,32;;")],
            vec![stab(StabsCode::N_LSYM, 0, "Foo:T(1,1)=s4a:(0,1),0,16;;")],
        ],
        ImporterFlags::empty(),
    );
    assert_eq!(database.data_types.len(), 2);
    let names_before: Vec<String> = database
        .data_types
        .iter()
        .map(|data_type| data_type.name().to_string())
        .collect();

    deduplicate_types(&mut database);

    assert_eq!(database.data_types.len(), 2);
    let names_after: Vec<String> = database
        .data_types
        .iter()
        .map(|data_type| data_type.name().to_string())
        .collect();
    assert_eq!(names_before, names_after);
}

// Anonymous enums merge only when their constants match.
#[test]
fn anonymous_enums() {
    let database = run_importer_with_files(
        vec![
            vec![stab(StabsCode::N_LSYM, 0, " :T(1,1)=eA:0,B:1,;")],
            vec![stab(StabsCode::N_LSYM, 0, " :T(1,1)=eA:0,B:1,;")],
            vec![stab(StabsCode::N_LSYM, 0, " :T(1,1)=eC:7,;")],
        ],
        ImporterFlags::empty(),
    );
    assert_eq!(database.data_types.len(), 2);
    for data_type in database.data_types.iter() {
        assert!(!data_type.conflict);
    }
}

// A string split over two records with a trailing backslash is joined
// before parsing.
#[test]
fn continuation_strings() {
    let database = run_importer(vec![
        stab(StabsCode::N_LSYM, 0, "LongStruct:T(1,1)=s8a:(0,1)"),
        stab(StabsCode::N_LSYM, 0, ",0,32;b:(0,1),32,32;;"),
    ]);
    // The first string has no backslash, so the two records parse (and
    // fail) separately.
    assert_eq!(database.data_types.len(), 0);

    let database = run_importer(vec![
        stab(StabsCode::N_LSYM, 0, "LongStruct:T(1,1)=s8a:(0,1)\\"),
        stab(StabsCode::N_LSYM, 0, ",0,32;b:(0,1),32,32;;"),
    ]);
    assert_eq!(database.data_types.len(), 1);
    let handle = database
        .data_types
        .first_handle_from_name("LongStruct")
        .unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let NodeData::InlineStructOrUnion(sou) = &data_type.node.as_ref().unwrap().data else {
        panic!("not a struct");
    };
    assert_eq!(sou.fields.len(), 2);
}

// A self-referential struct lowers to a pointer to a type name instead of
// recursing forever.
#[test]
fn self_referential_struct() {
    let database = run_importer(vec![stab(
        StabsCode::N_LSYM,
        0,
        "Node:T(1,1)=s8value:(0,1),0,32;next:(1,2)=*(1,1),32,32;;",
    )]);
    assert_eq!(database.data_types.len(), 1);
    let handle = database.data_types.first_handle_from_name("Node").unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let NodeData::InlineStructOrUnion(sou) = &data_type.node.as_ref().unwrap().data else {
        panic!("not a struct");
    };
    let NodeData::Pointer(pointer) = &sou.fields[1].data else {
        panic!("not a pointer");
    };
    let NodeData::TypeName(type_name) = &pointer.value_type.data else {
        panic!("not a type name");
    };
    assert_eq!(type_name.type_name, "Node");
}

// Globals pull their addresses from the external symbol table.
#[test]
fn global_variable_address_join() {
    let table = SymbolTable {
        files: vec![File {
            full_path: "test.cpp".to_string(),
            text_address: 0,
            symbols: vec![stab(StabsCode::N_GSYM, 0, "global_counter:G(0,1)")],
        }],
        externals: vec![Symbol {
            value: 0x1000,
            storage_type: SymbolType::Global,
            storage_class: SymbolClass::Data,
            index: 0,
            string: "global_counter".into(),
        }],
    };
    let mut database = SymbolDatabase::default();
    import_symbol_table(&mut database, &table, ImporterFlags::empty(), None).unwrap();
    assert_eq!(database.global_variables.len(), 1);
    let global = database.global_variables.iter().next().unwrap();
    assert_eq!(global.address().map(|address| address.0), Some(0x1000));
}

// Member functions can be stripped at import time.
#[test]
fn omit_member_functions() {
    let symbol = "WithMethods:T(1,1)=s4value:(0,1),0,32;get::(1,2)=##(0,1);:_Zget;2A.;;";
    let database = run_importer_with_files(
        vec![vec![stab(StabsCode::N_LSYM, 0, symbol)]],
        ImporterFlags::NO_MEMBER_FUNCTIONS,
    );
    let handle = database
        .data_types
        .first_handle_from_name("WithMethods")
        .unwrap();
    let data_type = database.data_types.symbol_from_handle(handle).unwrap();
    let NodeData::InlineStructOrUnion(sou) = &data_type.node.as_ref().unwrap().data else {
        panic!("not a struct");
    };
    assert!(sou.member_functions.is_empty());
    assert_eq!(sou.fields.len(), 1);
}
