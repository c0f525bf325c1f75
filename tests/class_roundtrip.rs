//! Build a class exercising every attribute the serializer knows, write it, parse it back,
//! and check the parsed image both structurally and byte-for-byte.

use classfile_codec::class_file::{
    ClassFile, ConstantPool, Serialize, Tag, Version,
};
use classfile_codec::code::{
    assemble, ConstOperand, Instruction, InstructionSequence, MemberRef, OpCode, Operand,
};
use classfile_codec::model::{
    Annotation, Class, ElementValue, ExceptionSpan, Field, LocalVariable, Method, MethodBody,
    Parameter, RetentionPolicy,
};
use classfile_codec::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};

fn runtime_annotation(type_descriptor: &str) -> Annotation {
    let mut annotation = Annotation::new(type_descriptor);
    annotation.retention = Some(RetentionPolicy::Runtime);
    annotation
}

/// A class with constants, a real method body, exception handlers, locals, and annotations
fn build_class() -> (Class, ConstantPool) {
    let mut class = Class::new(
        "com/example/Counter",
        Some("java/lang/Object"),
        ClassAccessFlags::PUBLIC,
    );
    class.interfaces.push("java/lang/Runnable".to_string());
    class.generic_signature =
        Some("Ljava/lang/Object;Ljava/lang/Runnable;".to_string());
    class.deprecated = true;
    class.annotations.push(runtime_annotation("Lcom/example/Component;"));
    class.annotations.push(Annotation::new("Lcom/example/Internal;"));

    let mut limit = Field::new(
        FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL,
        "LIMIT",
        "I",
    );
    limit.constant_value = Some(ElementValue::Int(500));
    class.add_field(limit);

    class.add_field(Field::new(FieldAccessFlags::PRIVATE, "total", "J"));

    // void run(): loads a constant, increments local 1, loops once backwards
    let mut constants = ConstantPool::new();
    let mut code = InstructionSequence::new();
    let start = code.push(
        Instruction::new(
            OpCode::Ldc,
            Operand::Constant(ConstOperand::String("tick".to_string())),
        )
        .unwrap(),
    );
    code.push(Instruction::simple(OpCode::Pop).unwrap());
    code.push(Instruction::new(OpCode::IInc, Operand::LocalConst(1, 1)).unwrap());
    code.push(Instruction::new(OpCode::IfEq, Operand::Branch(start)).unwrap());
    code.push(
        Instruction::new(
            OpCode::GetStatic,
            Operand::Field(MemberRef {
                class: "com/example/Counter".to_string(),
                name: "LIMIT".to_string(),
                descriptor: "I".to_string(),
            }),
        )
        .unwrap(),
    );
    code.push(Instruction::simple(OpCode::Pop).unwrap());
    code.push(Instruction::simple(OpCode::Return).unwrap());
    let code_length = code.layout();
    let mut body_bytes = vec![];
    assemble(&code, &mut constants, &mut body_bytes).unwrap();
    assert_eq!(body_bytes.len(), code_length as usize);

    let mut run = Method::new(MethodAccessFlags::PUBLIC, "run", "()V");
    run.exceptions.push("java/lang/InterruptedException".to_string());
    run.parameters = vec![];
    run.body = Some(MethodBody {
        max_stack: 2,
        code: body_bytes,
        locals: vec![LocalVariable {
            name: "ticks".to_string(),
            descriptor: "Ljava/util/List;".to_string(),
            generic_signature: Some("Ljava/util/List<Ljava/lang/String;>;".to_string()),
            start_pc: 0,
            length: code_length as u16,
        }],
        exception_spans: vec![ExceptionSpan {
            start_pc: 0,
            end_pc: 6,
            catch_handlers: vec![(8, "java/lang/IllegalStateException".to_string())],
            finally_handlers: vec![10],
        }],
    });
    class.add_method(run);

    let mut add = Method::new(MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT, "add", "(IJ)J");
    add.parameters.push(Parameter {
        name: "amount".to_string(),
        annotations: vec![runtime_annotation("Lcom/example/Positive;")],
    });
    add.parameters.push(Parameter {
        name: "base".to_string(),
        annotations: vec![],
    });
    class.add_method(add);

    (class, constants)
}

#[test]
fn class_round_trips_byte_for_byte() {
    let (class, constants) = build_class();
    let mut bytes = vec![];
    class
        .write_class(Version::Java7, constants, &mut bytes)
        .unwrap();

    let parsed = ClassFile::parse(&mut &bytes[..]).unwrap();

    // Re-encoding the parsed image reproduces the input exactly (pool order, attribute
    // lengths, everything)
    let mut reencoded = vec![];
    parsed.serialize(&mut reencoded).unwrap();
    assert_eq!(bytes, reencoded);
}

#[test]
fn parsed_class_structure() {
    let (class, constants) = build_class();
    let mut bytes = vec![];
    class
        .write_class(Version::Java7, constants, &mut bytes)
        .unwrap();
    let parsed = ClassFile::parse(&mut &bytes[..]).unwrap();

    assert_eq!(parsed.version, Version::Java7);
    assert!(parsed.access_flags.contains(ClassAccessFlags::PUBLIC));
    assert!(parsed.access_flags.contains(ClassAccessFlags::SUPER));

    // this/super/interface tokens resolve through the decoded pool
    let pool = &parsed.constants;
    let class_name = |index: classfile_codec::class_file::TypeInfoConstantIndex| {
        match pool.get_tagged(index.0, Tag::TypeInfo).unwrap() {
            classfile_codec::class_file::Constant::TypeInfo(name) => {
                pool.lookup_utf8(*name).unwrap().to_string()
            }
            _ => unreachable!(),
        }
    };
    assert_eq!(class_name(parsed.this_class), "com/example/Counter");
    assert_eq!(class_name(parsed.super_class.unwrap()), "java/lang/Object");
    assert_eq!(parsed.interfaces.len(), 1);
    assert_eq!(class_name(parsed.interfaces[0]), "java/lang/Runnable");

    assert_eq!(parsed.fields.len(), 2);
    assert_eq!(parsed.methods.len(), 2);

    // Class attributes: Signature, Deprecated, visible + invisible annotations
    let attribute_names: Vec<String> = parsed
        .attributes
        .iter()
        .map(|attribute| pool.lookup_utf8(attribute.name_index).unwrap().to_string())
        .collect();
    assert_eq!(
        attribute_names,
        vec![
            "Signature",
            "Deprecated",
            "RuntimeVisibleAnnotations",
            "RuntimeInvisibleAnnotations",
        ]
    );

    // Marker attributes are empty; the interning pool stored each name once
    assert!(parsed.attributes[1].info.is_empty());
}

#[test]
fn code_attribute_internals_measure_out() {
    let (class, constants) = build_class();
    let mut bytes = vec![];
    class
        .write_class(Version::Java7, constants, &mut bytes)
        .unwrap();
    let parsed = ClassFile::parse(&mut &bytes[..]).unwrap();
    let pool = &parsed.constants;

    let run = &parsed.methods[0];
    assert_eq!(pool.lookup_utf8(run.name_index).unwrap(), "run");
    assert_eq!(pool.lookup_utf8(run.descriptor_index).unwrap(), "()V");

    let code_attribute = run
        .attributes
        .iter()
        .find(|attribute| pool.lookup_utf8(attribute.name_index).unwrap() == "Code")
        .expect("run() has a Code attribute");

    // Walk the Code attribute body by hand and check every internal length agrees with the
    // frame length the attribute header declared
    let info = &code_attribute.info;
    let u16_at = |at: usize| u16::from_be_bytes([info[at], info[at + 1]]);
    let u32_at = |at: usize| u32::from_be_bytes([info[at], info[at + 1], info[at + 2], info[at + 3]]);

    let max_stack = u16_at(0);
    let max_locals = u16_at(2);
    assert_eq!(max_stack, 2);
    // receiver + the declared list local
    assert_eq!(max_locals, 2);

    let code_length = u32_at(4) as usize;
    let mut at = 8 + code_length;

    let exception_count = u16_at(at) as usize;
    assert_eq!(exception_count, 2);
    at += 2 + exception_count * 8;

    let nested_count = u16_at(at) as usize;
    at += 2;
    let mut nested_names = vec![];
    for _ in 0..nested_count {
        let name = pool
            .lookup_utf8(classfile_codec::class_file::Utf8ConstantIndex(
                classfile_codec::class_file::ConstantIndex(u16_at(at)),
            ))
            .unwrap();
        nested_names.push(name.to_string());
        let length = u32_at(at + 2) as usize;
        at += 6 + length;
    }
    assert_eq!(nested_names, vec!["LocalVariableTable", "LocalVariableTypeTable"]);

    // The walk consumed the attribute body exactly
    assert_eq!(at, info.len());
}

#[test]
fn abstract_method_and_parameter_annotations() {
    let (class, constants) = build_class();
    let mut bytes = vec![];
    class
        .write_class(Version::Java7, constants, &mut bytes)
        .unwrap();
    let parsed = ClassFile::parse(&mut &bytes[..]).unwrap();
    let pool = &parsed.constants;

    let add = &parsed.methods[1];
    assert_eq!(pool.lookup_utf8(add.name_index).unwrap(), "add");

    let attribute_names: Vec<String> = add
        .attributes
        .iter()
        .map(|attribute| pool.lookup_utf8(attribute.name_index).unwrap().to_string())
        .collect();
    assert_eq!(attribute_names, vec!["RuntimeVisibleParameterAnnotations"]);

    // Two parameters, one annotated
    let info = &add.attributes[0].info;
    assert_eq!(info[0], 2);
    let first_parameter_annotations = u16::from_be_bytes([info[1], info[2]]);
    assert_eq!(first_parameter_annotations, 1);
}
