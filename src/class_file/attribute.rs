use crate::class_file::{
    ConstantIndex, Serialize, TypeInfoConstantIndex, Utf8ConstantIndex,
};
use byteorder::WriteBytesExt;

/// Attributes (used on classes, fields, methods, and on the `Code` attribute itself)
///
/// Every attribute is framed the same way on the wire: name token, 4-byte body length, body.
/// The body is accumulated into `info` up front, so the length prefix is always the measured
/// size of the real content and no patching of raw buffer offsets is ever needed.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

/// Things which can be framed into an [`Attribute`]
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.2
pub struct ConstantValue(pub ConstantIndex);

impl Serialize for ConstantValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for ConstantValue {
    const NAME: &'static str = "ConstantValue";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

/// One entry of the exception table inside a `Code` attribute
pub struct ExceptionHandler {
    /// Start of the protected range (inclusive)
    pub start_pc: BytecodeIndex,

    /// End of the protected range (exclusive)
    pub end_pc: BytecodeIndex,

    /// Start of the handler
    pub handler_pc: BytecodeIndex,

    /// Caught class, or `None` for the catch-everything entries backing `finally`
    pub catch_type: Option<TypeInfoConstantIndex>,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        match self.catch_type {
            Some(catch_type) => catch_type.serialize(writer)?,
            None => 0u16.serialize(writer)?,
        }
        Ok(())
    }
}

/// Encoded bytecode instructions
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.0.len() as u32).serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

/// Index into a [`BytecodeArray`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BytecodeIndex(pub u16);

impl Serialize for BytecodeIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Declared checked exceptions of a method
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.5
pub struct Exceptions(pub Vec<TypeInfoConstantIndex>);

impl Serialize for Exceptions {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for Exceptions {
    const NAME: &'static str = "Exceptions";
}

/// Generic signature of a class, field, or method
#[derive(Debug)]
pub struct Signature {
    pub signature: Utf8ConstantIndex,
}

impl AttributeLike for Signature {
    const NAME: &'static str = "Signature";
}

impl Serialize for Signature {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.signature.serialize(writer)?;
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.13
pub struct LocalVariableTable(pub Vec<LocalVariable>);

pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

impl Serialize for LocalVariable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.index.serialize(writer)?;
        Ok(())
    }
}

impl Serialize for LocalVariableTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for LocalVariableTable {
    const NAME: &'static str = "LocalVariableTable";
}

/// Generic-signature counterpart of [`LocalVariableTable`], listing only locals whose static
/// type differs from its erasure
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.14
pub struct LocalVariableTypeTable(pub Vec<LocalVariableType>);

pub struct LocalVariableType {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: Utf8ConstantIndex,
    pub signature_index: Utf8ConstantIndex,
    pub index: u16,
}

impl Serialize for LocalVariableType {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.signature_index.serialize(writer)?;
        self.index.serialize(writer)?;
        Ok(())
    }
}

impl Serialize for LocalVariableTypeTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for LocalVariableTypeTable {
    const NAME: &'static str = "LocalVariableTypeTable";
}

/// Annotation as stored in the class file: a type descriptor token plus named element values
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16
#[derive(Debug, Clone)]
pub struct Annotation {
    pub type_index: Utf8ConstantIndex,
    pub elements: Vec<AnnotationElement>,
}

#[derive(Debug, Clone)]
pub struct AnnotationElement {
    pub name_index: Utf8ConstantIndex,
    pub value: AnnotationValue,
}

/// An element value: a one-byte kind tag followed by the kind-specific payload
#[derive(Debug, Clone)]
pub enum AnnotationValue {
    Byte(ConstantIndex),
    Char(ConstantIndex),
    Double(ConstantIndex),
    Float(ConstantIndex),
    Int(ConstantIndex),
    Long(ConstantIndex),
    Short(ConstantIndex),
    Boolean(ConstantIndex),
    String(Utf8ConstantIndex),
    Enum {
        type_name: Utf8ConstantIndex,
        const_name: Utf8ConstantIndex,
    },
    Class(Utf8ConstantIndex),
    Annotation(Box<Annotation>),
    Array(Vec<AnnotationValue>),
}

impl Serialize for Annotation {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.type_index.serialize(writer)?;
        self.elements.serialize(writer)?;
        Ok(())
    }
}

impl Serialize for AnnotationElement {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name_index.serialize(writer)?;
        self.value.serialize(writer)?;
        Ok(())
    }
}

impl Serialize for AnnotationValue {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            AnnotationValue::Byte(index) => {
                b'B'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Char(index) => {
                b'C'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Double(index) => {
                b'D'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Float(index) => {
                b'F'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Int(index) => {
                b'I'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Long(index) => {
                b'J'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Short(index) => {
                b'S'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Boolean(index) => {
                b'Z'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::String(index) => {
                b's'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Enum {
                type_name,
                const_name,
            } => {
                b'e'.serialize(writer)?;
                type_name.serialize(writer)?;
                const_name.serialize(writer)?;
            }
            AnnotationValue::Class(index) => {
                b'c'.serialize(writer)?;
                index.serialize(writer)?;
            }
            AnnotationValue::Annotation(nested) => {
                b'@'.serialize(writer)?;
                nested.serialize(writer)?;
            }
            AnnotationValue::Array(values) => {
                b'['.serialize(writer)?;
                values.serialize(writer)?;
            }
        }
        Ok(())
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16
pub struct RuntimeVisibleAnnotations(pub Vec<Annotation>);

impl Serialize for RuntimeVisibleAnnotations {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for RuntimeVisibleAnnotations {
    const NAME: &'static str = "RuntimeVisibleAnnotations";
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.17
pub struct RuntimeInvisibleAnnotations(pub Vec<Annotation>);

impl Serialize for RuntimeInvisibleAnnotations {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for RuntimeInvisibleAnnotations {
    const NAME: &'static str = "RuntimeInvisibleAnnotations";
}

/// Per-parameter annotation lists; the parameter count is a single byte
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.18
pub struct RuntimeVisibleParameterAnnotations(pub Vec<Vec<Annotation>>);

impl Serialize for RuntimeVisibleParameterAnnotations {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        serialize_parameter_annotations(&self.0, writer)
    }
}

impl AttributeLike for RuntimeVisibleParameterAnnotations {
    const NAME: &'static str = "RuntimeVisibleParameterAnnotations";
}

pub struct RuntimeInvisibleParameterAnnotations(pub Vec<Vec<Annotation>>);

impl Serialize for RuntimeInvisibleParameterAnnotations {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        serialize_parameter_annotations(&self.0, writer)
    }
}

impl AttributeLike for RuntimeInvisibleParameterAnnotations {
    const NAME: &'static str = "RuntimeInvisibleParameterAnnotations";
}

fn serialize_parameter_annotations<W: WriteBytesExt>(
    parameters: &[Vec<Annotation>],
    writer: &mut W,
) -> std::io::Result<()> {
    (parameters.len() as u8).serialize(writer)?;
    for annotations in parameters {
        annotations.serialize(writer)?;
    }
    Ok(())
}

/// Default value of an annotation interface member
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.22
pub struct AnnotationDefault(pub AnnotationValue);

impl Serialize for AnnotationDefault {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl AttributeLike for AnnotationDefault {
    const NAME: &'static str = "AnnotationDefault";
}
