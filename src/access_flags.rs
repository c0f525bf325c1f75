use crate::class_file::Serialize;
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::io::Result;

bitflags! {
    /// Access flags on classes
    ///
    /// The source-level `PROTECTED` and `STRICT` bits are representable so that flag
    /// normalization (see [`crate::model::Class`]) has something to normalize; neither
    /// survives into a serialized class.
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PROTECTED = 0x0004;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl ClassAccessFlags {
    /// Flags that may appear in a serialized class
    pub const LEGAL: ClassAccessFlags = ClassAccessFlags::from_bits_truncate(
        ClassAccessFlags::PUBLIC.bits
            | ClassAccessFlags::FINAL.bits
            | ClassAccessFlags::SUPER.bits
            | ClassAccessFlags::INTERFACE.bits
            | ClassAccessFlags::ABSTRACT.bits
            | ClassAccessFlags::SYNTHETIC.bits
            | ClassAccessFlags::ANNOTATION.bits
            | ClassAccessFlags::ENUM.bits
            | ClassAccessFlags::MODULE.bits,
    );
}

bitflags! {
    /// Access flags on fields
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Access flags on methods
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl Serialize for ClassAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for FieldAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}

impl Serialize for MethodAccessFlags {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.bits().serialize(writer)
    }
}
