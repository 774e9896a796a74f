use crate::cursor::Cursor;
use crate::symbol_parser::{parse_stabs_symbol, StabsSymbol, StabsSymbolDescriptor};
use crate::types::*;

fn parse(input: &str) -> StabsSymbol {
    let mut cursor = Cursor::new(input.as_bytes());
    let symbol = parse_stabs_symbol(&mut cursor).expect(input);
    assert!(cursor.is_empty(), "trailing data: {:?}", cursor.remaining());
    symbol
}

// typedef int s32;
#[test]
fn type_number() {
    let symbol = parse("s32:t1=0");
    assert!(!symbol.ty.anonymous);
    assert_eq!(symbol.ty.type_number.file, -1);
    assert_eq!(symbol.ty.type_number.number, 1);
    assert!(symbol.ty.has_body());
    assert!(symbol.ty.is_typedef);
    assert!(symbol.ty.is_root);
}

// typedef int s32;
#[test]
fn fancy_type_number() {
    let symbol = parse("s32:t(1,1)=(0,1)");
    assert!(!symbol.ty.anonymous);
    assert_eq!(symbol.ty.type_number.file, 1);
    assert_eq!(symbol.ty.type_number.number, 1);
    assert!(symbol.ty.has_body());
}

// namespace Namespace { struct A; }
// template <typename T> struct DodgyTypeName {};
// template class DodgyTypeName<Namespace::A>;
#[test]
fn dodgy_type_name() {
    let symbol = parse("DodgyTypeName<Namespace::A>:T(1,1)=s1;");
    assert_eq!(symbol.name, "DodgyTypeName<Namespace::A>");
    assert_eq!(symbol.descriptor, StabsSymbolDescriptor::EnumStructOrTypeTag);
}

// typedef int s32;
#[test]
fn type_reference() {
    let symbol = parse("s32:t(1,1)=(0,1)");
    let Some(StabsTypeData::TypeReference(inner)) = &symbol.ty.data else {
        panic!("not a type reference");
    };
    assert!(!inner.anonymous);
    assert_eq!(inner.type_number.file, 0);
    assert_eq!(inner.type_number.number, 1);
    assert!(!inner.has_body());
}

// typedef int Array[1][2];
#[test]
fn multi_dimensional_array() {
    let symbol = parse(
        "Array:t(1,1)=(1,2)=ar(1,3)=r(1,3);0;4294967295;;0;0;(1,4)=ar(1,3);0;1;(1,5)=ar(1,3);0;2;(0,1)",
    );
    let Some(StabsTypeData::TypeReference(inner)) = &symbol.ty.data else {
        panic!("not a type reference");
    };
    assert!(matches!(inner.data, Some(StabsTypeData::Array { .. })));
}

// enum E { A = 0, B = 1, C = 2147483647, D = -2147483648 };
#[test]
fn enum_type() {
    let symbol = parse("E:t(1,1)=eA:0,B:1,C:2147483647,D:-2147483648,;");
    let Some(StabsTypeData::Enum(fields)) = &symbol.ty.data else {
        panic!("not an enum");
    };
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0], (0, "A".to_string()));
    assert_eq!(fields[1], (1, "B".to_string()));
    assert_eq!(fields[2], (2147483647, "C".to_string()));
    assert_eq!(fields[3], (-2147483648, "D".to_string()));
}

// typedef int (function)();
#[test]
fn function_type() {
    let symbol = parse("function:t(1,1)=(1,2)=f(0,1)");
    let Some(StabsTypeData::TypeReference(inner)) = &symbol.ty.data else {
        panic!("not a type reference");
    };
    let Some(StabsTypeData::Function { return_type }) = &inner.data else {
        panic!("not a function");
    };
    assert_eq!(return_type.type_number.file, 0);
    assert_eq!(return_type.type_number.number, 1);
}

// int
#[test]
fn range_builtin() {
    let symbol = parse("int:t(0,1)=r(0,1);-2147483648;2147483647;");
    let Some(StabsTypeData::Range { low, high, .. }) = &symbol.ty.data else {
        panic!("not a range");
    };
    assert_eq!(low, "-2147483648");
    assert_eq!(high, "2147483647");
    assert_eq!(symbol.ty.name.as_deref(), Some("int"));
}

// struct SimpleStruct { int a; };
#[test]
fn simple_struct() {
    let symbol = parse("SimpleStruct:T(1,1)=s4a:(0,1),0,32;;");
    let Some(StabsTypeData::Struct { body, .. }) = &symbol.ty.data else {
        panic!("not a struct");
    };
    assert_eq!(body.size, 4);
    assert_eq!(body.base_classes.len(), 0);
    assert_eq!(body.fields.len(), 1);
    assert_eq!(body.member_functions.len(), 0);

    let field = &body.fields[0];
    assert_eq!(field.name, "a");
    assert_eq!(field.offset_bits, 0);
    assert_eq!(field.size_bits, 32);
    assert!(!field.is_static);
}

// union Union { int i; float f; };
#[test]
fn union_type() {
    let symbol = parse("Union:T(1,1)=u4i:(0,1),0,32;f:(0,14),0,32;;");
    let Some(StabsTypeData::Union(body)) = &symbol.ty.data else {
        panic!("not a union");
    };
    assert_eq!(body.size, 4);
    assert_eq!(body.fields.len(), 2);
    assert_eq!(body.member_functions.len(), 0);
}

// struct ForwardDeclared;
// typedef ForwardDeclared* ForwardDeclaredPtr;
#[test]
fn cross_reference() {
    let symbol = parse("ForwardDeclaredPtr:t(1,1)=(1,2)=*(1,3)=xsForwardDeclared:");
    let Some(StabsTypeData::TypeReference(pointer)) = &symbol.ty.data else {
        panic!("not a type reference");
    };
    let Some(StabsTypeData::Pointer { value_type }) = &pointer.data else {
        panic!("not a pointer");
    };
    let Some(StabsTypeData::CrossReference { kind, identifier }) = &value_type.data else {
        panic!("not a cross reference");
    };
    assert_eq!(*kind, CrossReferenceKind::Struct);
    assert_eq!(identifier, "ForwardDeclared");
    assert_eq!(value_type.name.as_deref(), Some("ForwardDeclared"));
}

// struct Base {}; struct Derived : Base { int x; };
#[test]
fn base_classes() {
    let symbol = parse("Derived:T(1,2)=s4!1,020,(1,1);x:(0,1),0,32;;");
    let Some(StabsTypeData::Struct { body, .. }) = &symbol.ty.data else {
        panic!("not a struct");
    };
    assert_eq!(body.base_classes.len(), 1);
    let base = &body.base_classes[0];
    assert_eq!(base.visibility, StabsVisibility::Public);
    assert_eq!(base.offset, 0);
    assert_eq!(base.ty.type_number.number, 1);
    assert_eq!(body.fields.len(), 1);
}

// struct Bitfields { int a : 3; int b : 5; };
#[test]
fn bitfields() {
    let symbol = parse("Bitfields:T(1,1)=s4a:(0,1),0,3;b:(0,1),3,5;;");
    let Some(StabsTypeData::Struct { body, .. }) = &symbol.ty.data else {
        panic!("not a struct");
    };
    assert_eq!(body.fields.len(), 2);
    assert_eq!(body.fields[1].offset_bits, 3);
    assert_eq!(body.fields[1].size_bits, 5);
}

// class WithMethods { public: int get() const; };
#[test]
fn member_functions() {
    let symbol = parse("WithMethods:T(1,1)=s4value:/0(0,1),0,32;get::(1,2)=#(1,1),(0,1),(1,3)=*(1,1);:_ZNK11WithMethods3getEv;2B.;;");
    let Some(StabsTypeData::Struct { body, .. }) = &symbol.ty.data else {
        panic!("not a struct");
    };
    assert_eq!(body.fields.len(), 1);
    assert_eq!(body.fields[0].visibility, StabsVisibility::Private);
    assert_eq!(body.member_functions.len(), 1);

    let set = &body.member_functions[0];
    assert_eq!(set.name, "get");
    assert_eq!(set.overloads.len(), 1);
    let overload = &set.overloads[0];
    assert!(overload.is_const);
    assert!(!overload.is_volatile);
    assert_eq!(overload.visibility, StabsVisibility::Public);
    assert_eq!(overload.modifier, MemberFunctionModifier::None);
}

// class Virtual { virtual void method(); };
#[test]
fn virtual_member_function() {
    let symbol = parse(
        "Virtual:T(1,1)=s4$vf:(1,2)=*(0,1),0;method::(1,4)=##(0,23);:_ZN7Virtual6methodEv;0A*0;(1,1);;;",
    );
    let Some(StabsTypeData::Struct { body, .. }) = &symbol.ty.data else {
        panic!("not a struct");
    };
    let field = &body.fields[0];
    assert!(field.name.starts_with("$vf"));
    assert_eq!(field.size_bits, 0);

    let overload = &body.member_functions[0].overloads[0];
    assert_eq!(overload.modifier, MemberFunctionModifier::Virtual);
    assert_eq!(overload.vtable_index, Some(0));
    assert!(overload.virtual_type.is_some());
}

// A static member.
#[test]
fn static_field() {
    let symbol =
        parse("WithStatic:T(1,1)=s4instance:/2(0,30):_ZN10WithStatic8instanceE;count:(0,1),0,32;;");
    let Some(StabsTypeData::Struct { body, .. }) = &symbol.ty.data else {
        panic!("not a struct");
    };
    assert_eq!(body.fields.len(), 2);
    assert!(body.fields[0].is_static);
    assert_eq!(
        body.fields[0].type_name.as_deref(),
        Some("_ZN10WithStatic8instanceE")
    );
    assert!(!body.fields[1].is_static);
}

#[test]
fn first_base_class_suffix() {
    let symbol = parse("Derived:T(1,2)=s4!1,020,(1,1);;~%(1,1);");
    let Some(StabsTypeData::Struct {
        first_base_class, ..
    }) = &symbol.ty.data
    else {
        panic!("not a struct");
    };
    assert!(first_base_class.is_some());
}

#[test]
fn live_range_suffix() {
    let symbol = parse("local:(0,1);l(#3,#7)");
    assert_eq!(symbol.descriptor, StabsSymbolDescriptor::LocalVariable);
    assert!(!symbol.ty.has_body());
}

#[test]
fn nested_function_suffix() {
    let symbol = parse("inner:f(0,1),inner,outer");
    assert_eq!(symbol.descriptor, StabsSymbolDescriptor::LocalFunction);
}

#[test]
fn pointer_to_data_member() {
    let symbol = parse("memptr:t(1,1)=(1,2)=@(1,3),(0,1)");
    let Some(StabsTypeData::TypeReference(inner)) = &symbol.ty.data else {
        panic!("not a type reference");
    };
    assert!(matches!(
        inner.data,
        Some(StabsTypeData::PointerToDataMember { .. })
    ));
}

#[test]
fn size_type_attribute() {
    let symbol = parse("u128:t(1,1)=(1,2)=@s128;(0,1)");
    let Some(StabsTypeData::TypeReference(inner)) = &symbol.ty.data else {
        panic!("not a type reference");
    };
    let Some(StabsTypeData::SizeTypeAttribute { size_bits, .. }) = &inner.data else {
        panic!("not a size type attribute");
    };
    assert_eq!(*size_bits, 128);
}

#[test]
fn floating_point_builtin() {
    let symbol = parse("float:t(0,14)=R1;4;0;");
    let Some(StabsTypeData::FloatingPointBuiltin { fpclass, bytes }) = &symbol.ty.data else {
        panic!("not a floating point builtin");
    };
    assert_eq!(*fpclass, 1);
    assert_eq!(*bytes, 4);
}

#[test]
fn builtin_bool() {
    let symbol = parse("bool:t(0,20)=-16;");
    let Some(StabsTypeData::Builtin { type_id }) = &symbol.ty.data else {
        panic!("not a builtin");
    };
    assert_eq!(*type_id, 16);
}

#[test]
fn unknown_descriptor_is_rejected() {
    let mut cursor = Cursor::new(b"name:Z(0,1)");
    assert!(parse_stabs_symbol(&mut cursor).is_err());
}

#[test]
fn truncated_symbol_is_distinguished() {
    let mut cursor = Cursor::new(b"Type:T(1,1)=s4field:(0,1");
    let error = parse_stabs_symbol(&mut cursor).unwrap_err();
    assert!(!error.is_truncated());

    // Cut in the middle of an identifier instead.
    let mut cursor = Cursor::new(b"Type:T(1,1)=s4fie");
    let error = parse_stabs_symbol(&mut cursor).unwrap_err();
    assert!(error.is_truncated());
}
