use crate::class_file::{Attribute, AttributeLike, Serialize};
use crate::errors::Error;
use crate::util::{Offset, OffsetResult, OffsetVec, Width};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::io::Read;

/// Interning constant pool
///
/// The pool is append only: entries are created on demand by the `get_*` family and never
/// removed or mutated. Two structurally equal requests always resolve to the same index, so
/// every distinct constant is stored exactly once. Indices are 1-based; `long` and `double`
/// entries consume two index slots (the second slot is reserved and unaddressable), which the
/// backing [`OffsetVec`] models directly.
///
/// A pool belongs to a single class being encoded (or decoded) and is not meant to be shared:
/// interning relies on exclusive check-then-insert access to the lookup maps.
pub struct ConstantPool {
    constants: OffsetVec<Constant>,

    /// Interning map for every entry kind except `Utf8`
    ///
    /// Keys are small copyable fingerprints of an entry's defining fields, so a fresh key per
    /// query costs nothing. Scalar `float`/`double` keys hold the raw bit pattern: `+0.0` and
    /// `-0.0` (or distinct NaN payloads) must intern separately.
    lookup: HashMap<ConstantKey, ConstantIndex>,

    /// Interning map for `Utf8` entries, keyed by string content
    utf8s: HashMap<String, Utf8ConstantIndex>,
}

impl ConstantPool {
    /// Make a fresh empty constant pool
    pub fn new() -> ConstantPool {
        ConstantPool {
            constants: OffsetVec::new_starting_at(Offset(1)),
            lookup: HashMap::new(),
            utf8s: HashMap::new(),
        }
    }

    /// Number of logical index slots in use
    pub fn size(&self) -> u16 {
        self.constants.slot_len() as u16
    }

    /// Number of physical entries
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Push a constant into the pool, provided there is index space left for it
    ///
    /// Indexing starts at 1 and the serialized count is one more than the slot total, so the
    /// slots in use can never exceed 65534.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset = self.constants.offset_len().0;
        if offset + constant.width() > 0xffff {
            return Err(Error::ConstantPoolOverflow { constant, offset });
        }
        let offset = self.constants.push(constant);
        Ok(ConstantIndex(offset.0 as u16))
    }

    fn intern(
        &mut self,
        key: ConstantKey,
        constant: impl FnOnce() -> Constant,
    ) -> Result<ConstantIndex, Error> {
        if let Some(index) = self.lookup.get(&key) {
            return Ok(*index);
        }
        let index = self.push_constant(constant())?;
        self.lookup.insert(key, index);
        Ok(index)
    }

    /// Get or insert a `Utf8` constant
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let cow = utf8.into();
        if let Some(index) = self.utf8s.get::<str>(cow.borrow()) {
            return Ok(*index);
        }
        let owned = cow.into_owned();
        let index = Utf8ConstantIndex(self.push_constant(Constant::Utf8(owned.clone()))?);
        self.utf8s.insert(owned, index);
        Ok(index)
    }

    /// Get or insert an `Integer` constant
    pub fn get_integer(&mut self, value: i32) -> Result<ConstantIndex, Error> {
        self.intern(ConstantKey::Integer(value), || Constant::Integer(value))
    }

    /// Get or insert a `Float` constant (interned by bit pattern)
    pub fn get_float(&mut self, value: f32) -> Result<ConstantIndex, Error> {
        self.intern(ConstantKey::Float(value.to_bits()), || Constant::Float(value))
    }

    /// Get or insert a `Long` constant (occupies two index slots)
    pub fn get_long(&mut self, value: i64) -> Result<ConstantIndex, Error> {
        self.intern(ConstantKey::Long(value), || Constant::Long(value))
    }

    /// Get or insert a `Double` constant (interned by bit pattern, occupies two index slots)
    pub fn get_double(&mut self, value: f64) -> Result<ConstantIndex, Error> {
        self.intern(ConstantKey::Double(value.to_bits()), || Constant::Double(value))
    }

    /// Get or insert a `String` constant
    pub fn get_string(&mut self, value: &str) -> Result<StringConstantIndex, Error> {
        let utf8 = self.get_utf8(value)?;
        let index = self.intern(ConstantKey::String(utf8.0 .0), || Constant::String(utf8))?;
        Ok(StringConstantIndex(index))
    }

    /// Get or insert a `TypeInfo` constant for a class or interface internal name
    pub fn get_type_info(&mut self, internal_name: &str) -> Result<TypeInfoConstantIndex, Error> {
        let name = self.get_utf8(internal_name)?;
        let index = self.intern(ConstantKey::TypeInfo(name.0 .0), || Constant::TypeInfo(name))?;
        Ok(TypeInfoConstantIndex(index))
    }

    /// Get or insert a `NameAndType` constant
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        let index = self.intern(ConstantKey::NameAndType(name.0 .0, descriptor.0 .0), || {
            Constant::NameAndType { name, descriptor }
        })?;
        Ok(NameAndTypeConstantIndex(index))
    }

    /// Get or insert a `FieldRef` constant (transitively interning the class and
    /// name-and-type entries it points at)
    pub fn get_field_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<FieldRefConstantIndex, Error> {
        let class = self.get_type_info(class)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        let index = self.intern(
            ConstantKey::FieldRef(class.0 .0, name_and_type.0 .0),
            || Constant::FieldRef {
                class,
                name_and_type,
            },
        )?;
        Ok(FieldRefConstantIndex(index))
    }

    /// Get or insert a `MethodRef` constant
    pub fn get_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodRefConstantIndex, Error> {
        let class = self.get_type_info(class)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        let index = self.intern(
            ConstantKey::MethodRef(class.0 .0, name_and_type.0 .0),
            || Constant::MethodRef {
                class,
                name_and_type,
            },
        )?;
        Ok(MethodRefConstantIndex(index))
    }

    /// Get or insert an `InterfaceMethodRef` constant
    pub fn get_interface_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<MethodRefConstantIndex, Error> {
        let class = self.get_type_info(class)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        let index = self.intern(
            ConstantKey::InterfaceMethodRef(class.0 .0, name_and_type.0 .0),
            || Constant::InterfaceMethodRef {
                class,
                name_and_type,
            },
        )?;
        Ok(MethodRefConstantIndex(index))
    }

    /// Get or insert a `MethodHandle` constant
    ///
    /// Depending on the reference kind, `member` must point at a field reference
    /// (`GetField`, `GetStatic`, `PutField`, `PutStatic`) or a method reference (the rest).
    pub fn get_method_handle(
        &mut self,
        kind: ReferenceKind,
        member: ConstantIndex,
    ) -> Result<ConstantIndex, Error> {
        self.intern(ConstantKey::MethodHandle(kind.tag(), member.0), || {
            Constant::MethodHandle { kind, member }
        })
    }

    /// Get or insert a `MethodType` constant
    pub fn get_method_type(&mut self, descriptor: &str) -> Result<ConstantIndex, Error> {
        let descriptor = self.get_utf8(descriptor)?;
        self.intern(ConstantKey::MethodType(descriptor.0 .0), || {
            Constant::MethodType { descriptor }
        })
    }

    /// Get or insert an `InvokeDynamic` constant
    pub fn get_invoke_dynamic(
        &mut self,
        bootstrap_method: u16,
        name: &str,
        descriptor: &str,
    ) -> Result<InvokeDynamicConstantIndex, Error> {
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        let index = self.intern(
            ConstantKey::InvokeDynamic(bootstrap_method, name_and_type.0 .0),
            || Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            },
        )?;
        Ok(InvokeDynamicConstantIndex(index))
    }

    /// Get the entry at an index
    ///
    /// Fails for index 0, indices past the end, and the reserved slot following a `long` or
    /// `double` entry. Such an index reaching this call means the model being encoded (or the
    /// class being decoded) was already inconsistent.
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        match self.constants.get_offset(Offset(index.0 as usize)) {
            OffsetResult::Found(constant) => Ok(constant),
            OffsetResult::Reserved(_) | OffsetResult::OutOfRange => {
                Err(Error::ConstantIndexOutOfRange(index.0))
            }
        }
    }

    /// Get the entry at an index, checking it has the expected tag
    pub fn get_tagged(&self, index: ConstantIndex, expected: Tag) -> Result<&Constant, Error> {
        let constant = self.get(index)?;
        let actual = constant.tag();
        if actual != expected {
            log::error!(
                "Constant at index {} is a {:?} but a {:?} was requested",
                index.0,
                actual,
                expected,
            );
            return Err(Error::ConstantTagMismatch {
                index: index.0,
                expected,
                actual,
            });
        }
        Ok(constant)
    }

    /// Look up the string content of a `Utf8` entry
    pub fn lookup_utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.get_tagged(index.0, Tag::Utf8)? {
            Constant::Utf8(string) => Ok(string),
            _ => unreachable!("tag already checked"),
        }
    }

    /// Look up the string content of a `String` entry
    pub fn lookup_string(&self, index: StringConstantIndex) -> Result<&str, Error> {
        match self.get_tagged(index.0, Tag::String)? {
            Constant::String(utf8) => self.lookup_utf8(*utf8),
            _ => unreachable!("tag already checked"),
        }
    }

    /// Look up the value of an `Integer` entry
    pub fn lookup_integer(&self, index: ConstantIndex) -> Result<i32, Error> {
        match self.get_tagged(index, Tag::Integer)? {
            Constant::Integer(value) => Ok(*value),
            _ => unreachable!("tag already checked"),
        }
    }

    /// Look up the value of a `Long` entry
    pub fn lookup_long(&self, index: ConstantIndex) -> Result<i64, Error> {
        match self.get_tagged(index, Tag::Long)? {
            Constant::Long(value) => Ok(*value),
            _ => unreachable!("tag already checked"),
        }
    }

    /// Look up the value of a `Float` entry
    pub fn lookup_float(&self, index: ConstantIndex) -> Result<f32, Error> {
        match self.get_tagged(index, Tag::Float)? {
            Constant::Float(value) => Ok(*value),
            _ => unreachable!("tag already checked"),
        }
    }

    /// Look up the value of a `Double` entry
    pub fn lookup_double(&self, index: ConstantIndex) -> Result<f64, Error> {
        match self.get_tagged(index, Tag::Double)? {
            Constant::Double(value) => Ok(*value),
            _ => unreachable!("tag already checked"),
        }
    }

    /// Iterate over the physical entries with their indices
    pub fn iter(&self) -> impl Iterator<Item = (ConstantIndex, &Constant)> {
        self.constants
            .iter()
            .map(|(offset, constant)| (ConstantIndex(offset.0 as u16), constant))
    }

    /// Build an [`Attribute`] from anything attribute-like, interning its name
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];
        attribute.serialize(&mut info).map_err(Error::IoError)?;
        Ok(Attribute { name_index, info })
    }

    /// Serialize the pool: a `u16` count one greater than the logical slot count, then each
    /// physical entry. Reserved slots after 64-bit scalars occupy index space only, never
    /// bytes.
    pub fn write<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        (self.size() + 1).serialize(writer)?;
        for (_, constant) in self.constants.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }

    /// Parse a pool from its serialized form
    ///
    /// The inverse of [`ConstantPool::write`]: `count - 1` logical slots are filled, where a
    /// `long` or `double` fills two slots from one physical record. An unrecognized tag byte
    /// fails the whole parse; there is no partial pool.
    pub fn read<R: Read>(reader: &mut R) -> Result<ConstantPool, Error> {
        let mut pool = ConstantPool::new();
        let count = reader.read_u16::<BigEndian>()?;

        let mut slot = 1u16;
        while slot < count {
            let tag_byte = reader.read_u8()?;
            let tag = Tag::from_value(tag_byte).ok_or(Error::UnknownConstantTag(tag_byte))?;
            let constant = match tag {
                Tag::Utf8 => {
                    let length = reader.read_u16::<BigEndian>()? as usize;
                    let mut bytes = vec![0u8; length];
                    reader.read_exact(&mut bytes)?;
                    Constant::Utf8(decode_modified_utf8(&bytes)?)
                }
                Tag::Integer => Constant::Integer(reader.read_i32::<BigEndian>()?),
                Tag::Float => Constant::Float(reader.read_f32::<BigEndian>()?),
                Tag::Long => Constant::Long(reader.read_i64::<BigEndian>()?),
                Tag::Double => Constant::Double(reader.read_f64::<BigEndian>()?),
                Tag::TypeInfo => Constant::TypeInfo(Utf8ConstantIndex(read_index(reader)?)),
                Tag::String => Constant::String(Utf8ConstantIndex(read_index(reader)?)),
                Tag::FieldRef => Constant::FieldRef {
                    class: TypeInfoConstantIndex(read_index(reader)?),
                    name_and_type: NameAndTypeConstantIndex(read_index(reader)?),
                },
                Tag::MethodRef => Constant::MethodRef {
                    class: TypeInfoConstantIndex(read_index(reader)?),
                    name_and_type: NameAndTypeConstantIndex(read_index(reader)?),
                },
                Tag::InterfaceMethodRef => Constant::InterfaceMethodRef {
                    class: TypeInfoConstantIndex(read_index(reader)?),
                    name_and_type: NameAndTypeConstantIndex(read_index(reader)?),
                },
                Tag::NameAndType => Constant::NameAndType {
                    name: Utf8ConstantIndex(read_index(reader)?),
                    descriptor: Utf8ConstantIndex(read_index(reader)?),
                },
                Tag::MethodHandle => {
                    let kind_tag = reader.read_u8()?;
                    let kind = ReferenceKind::from_tag(kind_tag)
                        .ok_or(Error::UnknownConstantTag(kind_tag))?;
                    Constant::MethodHandle {
                        kind,
                        member: read_index(reader)?,
                    }
                }
                Tag::MethodType => Constant::MethodType {
                    descriptor: Utf8ConstantIndex(read_index(reader)?),
                },
                Tag::InvokeDynamic => Constant::InvokeDynamic {
                    bootstrap_method: reader.read_u16::<BigEndian>()?,
                    name_and_type: NameAndTypeConstantIndex(read_index(reader)?),
                },
            };

            slot += constant.width() as u16;

            // Rebuild the interning maps so a decoded pool can keep growing consistently
            let utf8_content = match &constant {
                Constant::Utf8(string) => Some(string.clone()),
                _ => None,
            };
            let key = utf8_content.is_none().then(|| ConstantKey::of(&constant));
            let index = pool.push_constant(constant)?;
            if let Some(string) = utf8_content {
                pool.utf8s.entry(string).or_insert(Utf8ConstantIndex(index));
            } else if let Some(key) = key {
                pool.lookup.entry(key).or_insert(index);
            }
        }

        Ok(pool)
    }
}

impl Default for ConstantPool {
    fn default() -> ConstantPool {
        ConstantPool::new()
    }
}

impl std::fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.constants.fmt(f)
    }
}

fn read_index<R: Read>(reader: &mut R) -> Result<ConstantIndex, Error> {
    Ok(ConstantIndex(reader.read_u16::<BigEndian>()?))
}

/// One record in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the null character
    /// and of supplementary characters is different).
    Utf8(String),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long` (occupies two index slots)
    Long(i64),

    /// Constant primitive of type `double` (occupies two index slots)
    Double(f64),

    /// Class or interface, pointing at its internal name
    TypeInfo(Utf8ConstantIndex),

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Field reference
    FieldRef {
        class: TypeInfoConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Method reference
    MethodRef {
        class: TypeInfoConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Interface method reference
    InterfaceMethodRef {
        class: TypeInfoConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Name and descriptor of a field or method
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        kind: ReferenceKind,

        /// Field reference for the `Get*`/`Put*` kinds, method reference for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },
}

impl Constant {
    pub fn tag(&self) -> Tag {
        match self {
            Constant::Utf8(_) => Tag::Utf8,
            Constant::Integer(_) => Tag::Integer,
            Constant::Float(_) => Tag::Float,
            Constant::Long(_) => Tag::Long,
            Constant::Double(_) => Tag::Double,
            Constant::TypeInfo(_) => Tag::TypeInfo,
            Constant::String(_) => Tag::String,
            Constant::FieldRef { .. } => Tag::FieldRef,
            Constant::MethodRef { .. } => Tag::MethodRef,
            Constant::InterfaceMethodRef { .. } => Tag::InterfaceMethodRef,
            Constant::NameAndType { .. } => Tag::NameAndType,
            Constant::MethodHandle { .. } => Tag::MethodHandle,
            Constant::MethodType { .. } => Tag::MethodType,
            Constant::InvokeDynamic { .. } => Tag::InvokeDynamic,
        }
    }

    /// Exact number of bytes this entry occupies when serialized, tag byte included
    pub fn byte_length(&self) -> usize {
        match self {
            Constant::Utf8(string) => 3 + encode_modified_utf8(string).len(),
            Constant::Integer(_) | Constant::Float(_) => 5,
            Constant::Long(_) | Constant::Double(_) => 9,
            Constant::TypeInfo(_) | Constant::String(_) | Constant::MethodType { .. } => 3,
            Constant::FieldRef { .. }
            | Constant::MethodRef { .. }
            | Constant::InterfaceMethodRef { .. }
            | Constant::NameAndType { .. }
            | Constant::InvokeDynamic { .. } => 5,
            Constant::MethodHandle { .. } => 4,
        }
    }
}

/// `long` and `double` entries reserve the index slot after their own; the reserved slot is
/// never addressable and never serialized.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().value().serialize(writer)?;
        match self {
            Constant::Utf8(string) => {
                let buffer = encode_modified_utf8(string);
                (buffer.len() as u16).serialize(writer)?;
                writer.write_all(&buffer)?;
            }
            Constant::Integer(integer) => integer.serialize(writer)?,
            Constant::Float(float) => float.serialize(writer)?,
            Constant::Long(long) => long.serialize(writer)?,
            Constant::Double(double) => double.serialize(writer)?,
            Constant::TypeInfo(name) => name.serialize(writer)?,
            Constant::String(utf8) => utf8.serialize(writer)?,
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle { kind, member } => {
                kind.tag().serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => descriptor.serialize(writer)?,
            Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => {
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Fingerprint of a constant's defining fields, used only for interning lookups
///
/// Equality and hashing are derived, so two keys are equal exactly when the tag and every
/// defining field agree. Scalar floating point fields are the raw bit pattern.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
enum ConstantKey {
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    TypeInfo(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    InvokeDynamic(u16, u16),
}

impl ConstantKey {
    /// Fingerprint of an existing entry (`Utf8` entries are interned by content instead)
    fn of(constant: &Constant) -> ConstantKey {
        match constant {
            Constant::Utf8(_) => unreachable!("utf8 constants are interned by content"),
            Constant::Integer(value) => ConstantKey::Integer(*value),
            Constant::Float(value) => ConstantKey::Float(value.to_bits()),
            Constant::Long(value) => ConstantKey::Long(*value),
            Constant::Double(value) => ConstantKey::Double(value.to_bits()),
            Constant::TypeInfo(name) => ConstantKey::TypeInfo(name.0 .0),
            Constant::String(utf8) => ConstantKey::String(utf8.0 .0),
            Constant::FieldRef {
                class,
                name_and_type,
            } => ConstantKey::FieldRef(class.0 .0, name_and_type.0 .0),
            Constant::MethodRef {
                class,
                name_and_type,
            } => ConstantKey::MethodRef(class.0 .0, name_and_type.0 .0),
            Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => ConstantKey::InterfaceMethodRef(class.0 .0, name_and_type.0 .0),
            Constant::NameAndType { name, descriptor } => {
                ConstantKey::NameAndType(name.0 .0, descriptor.0 .0)
            }
            Constant::MethodHandle { kind, member } => {
                ConstantKey::MethodHandle(kind.tag(), member.0)
            }
            Constant::MethodType { descriptor } => ConstantKey::MethodType(descriptor.0 .0),
            Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => ConstantKey::InvokeDynamic(*bootstrap_method, name_and_type.0 .0),
        }
    }
}

/// Discriminant identifying a pool entry's kind, with its wire value
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Tag {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    TypeInfo,
    String,
    FieldRef,
    MethodRef,
    InterfaceMethodRef,
    NameAndType,
    MethodHandle,
    MethodType,
    InvokeDynamic,
}

impl Tag {
    pub fn value(self) -> u8 {
        match self {
            Tag::Utf8 => 1,
            Tag::Integer => 3,
            Tag::Float => 4,
            Tag::Long => 5,
            Tag::Double => 6,
            Tag::TypeInfo => 7,
            Tag::String => 8,
            Tag::FieldRef => 9,
            Tag::MethodRef => 10,
            Tag::InterfaceMethodRef => 11,
            Tag::NameAndType => 12,
            Tag::MethodHandle => 15,
            Tag::MethodType => 16,
            Tag::InvokeDynamic => 18,
        }
    }

    pub fn from_value(value: u8) -> Option<Tag> {
        match value {
            1 => Some(Tag::Utf8),
            3 => Some(Tag::Integer),
            4 => Some(Tag::Float),
            5 => Some(Tag::Long),
            6 => Some(Tag::Double),
            7 => Some(Tag::TypeInfo),
            8 => Some(Tag::String),
            9 => Some(Tag::FieldRef),
            10 => Some(Tag::MethodRef),
            11 => Some(Tag::InterfaceMethodRef),
            12 => Some(Tag::NameAndType),
            15 => Some(Tag::MethodHandle),
            16 => Some(Tag::MethodType),
            18 => Some(Tag::InvokeDynamic),
            _ => None,
        }
    }
}

/// Kind of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-5.html#jvms-5.4.3.5
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ReferenceKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl ReferenceKind {
    pub fn tag(self) -> u8 {
        match self {
            ReferenceKind::GetField => 1,
            ReferenceKind::GetStatic => 2,
            ReferenceKind::PutField => 3,
            ReferenceKind::PutStatic => 4,
            ReferenceKind::InvokeVirtual => 5,
            ReferenceKind::InvokeStatic => 6,
            ReferenceKind::InvokeSpecial => 7,
            ReferenceKind::NewInvokeSpecial => 8,
            ReferenceKind::InvokeInterface => 9,
        }
    }

    pub fn from_tag(tag: u8) -> Option<ReferenceKind> {
        match tag {
            1 => Some(ReferenceKind::GetField),
            2 => Some(ReferenceKind::GetStatic),
            3 => Some(ReferenceKind::PutField),
            4 => Some(ReferenceKind::PutStatic),
            5 => Some(ReferenceKind::InvokeVirtual),
            6 => Some(ReferenceKind::InvokeStatic),
            7 => Some(ReferenceKind::InvokeSpecial),
            8 => Some(ReferenceKind::NewInvokeSpecial),
            9 => Some(ReferenceKind::InvokeInterface),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct StringConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct TypeInfoConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct FieldRefConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct MethodRefConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct InvokeDynamicConstantIndex(pub ConstantIndex);

macro_rules! constant_index_impls {
    ($($index:ident),*) => {
        $(
            impl From<$index> for ConstantIndex {
                fn from(index: $index) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $index {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }
        )*
    };
}

constant_index_impls!(
    Utf8ConstantIndex,
    StringConstantIndex,
    TypeInfoConstantIndex,
    NameAndTypeConstantIndex,
    FieldRefConstantIndex,
    MethodRefConstantIndex,
    InvokeDynamicConstantIndex
);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

/// Modified UTF-8 format used in class files
///
/// The differences from standard UTF-8: the null character is encoded in 2-byte form (so
/// encoded strings never embed a null byte), only the 1 to 3 byte forms are used, and
/// supplementary characters are represented as surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut encoded: Vec<u8> = vec![];
    for c in string.chars() {
        let code = c as u32;
        match code {
            0x01..=0x7f => encoded.push(code as u8),

            // The null character takes the 2-byte form, so encoded strings never contain 0x00
            0x00 | 0x80..=0x7ff => {
                encoded.push(0b1100_0000 | (code >> 6) as u8);
                encoded.push(0b1000_0000 | (code & 0x3f) as u8);
            }

            0x800..=0xffff => {
                encoded.push(0b1110_0000 | (code >> 12) as u8);
                encoded.push(0b1000_0000 | (code >> 6 & 0x3f) as u8);
                encoded.push(0b1000_0000 | (code & 0x3f) as u8);
            }

            // Past the basic plane: a surrogate pair, each half in its own 3-byte form
            _ => {
                let reduced = code - 0x1_0000;
                for unit in [0xd800 | (reduced >> 10), 0xdc00 | (reduced & 0x3ff)] {
                    encoded.push(0b1110_0000 | (unit >> 12) as u8);
                    encoded.push(0b1000_0000 | (unit >> 6 & 0x3f) as u8);
                    encoded.push(0b1000_0000 | (unit & 0x3f) as u8);
                }
            }
        }
    }
    encoded
}

/// Inverse of [`encode_modified_utf8`]
///
/// The 1 to 3 byte forms each decode to one UTF-16 code unit; surrogate pairing is then
/// resolved the usual way, which also takes care of supplementary characters.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    let mut units: Vec<u16> = vec![];
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0b1000_0000 == 0 {
            units.push(b0 as u16);
            i += 1;
        } else if b0 & 0b1110_0000 == 0b1100_0000 {
            let b1 = *bytes.get(i + 1).ok_or(Error::MalformedUtf8)?;
            if b1 & 0b1100_0000 != 0b1000_0000 {
                return Err(Error::MalformedUtf8);
            }
            units.push(((b0 as u16 & 0x1F) << 6) | (b1 as u16 & 0x3F));
            i += 2;
        } else if b0 & 0b1111_0000 == 0b1110_0000 {
            let b1 = *bytes.get(i + 1).ok_or(Error::MalformedUtf8)?;
            let b2 = *bytes.get(i + 2).ok_or(Error::MalformedUtf8)?;
            if b1 & 0b1100_0000 != 0b1000_0000 || b2 & 0b1100_0000 != 0b1000_0000 {
                return Err(Error::MalformedUtf8);
            }
            units.push(((b0 as u16 & 0x0F) << 12) | ((b1 as u16 & 0x3F) << 6) | (b2 as u16 & 0x3F));
            i += 3;
        } else {
            return Err(Error::MalformedUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| Error::MalformedUtf8)
}

#[cfg(test)]
mod modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]).unwrap(), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(
            encode_modified_utf8("hel10_World"),
            vec![104, 101, 108, 49, 48, 95, 87, 111, 114, 108, 100]
        );
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(
            encode_modified_utf8("ĄǍǞǠǺȀȂȦȺӐӒ"),
            vec![
                196, 132, 199, 141, 199, 158, 199, 160, 199, 186, 200, 128, 200, 130, 200, 166,
                200, 186, 211, 144, 211, 146
            ]
        );
        assert_eq!(
            decode_modified_utf8(&encode_modified_utf8("ऄअॲঅਅઅଅஅఅಅഅะະ༁ཨ")).unwrap(),
            "ऄअॲঅਅઅଅஅఅಅഅะະ༁ཨ"
        );
    }

    #[test]
    fn supplementary_characters() {
        assert_eq!(
            encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}"),
            vec![
                237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237,
                191, 191
            ]
        );
        assert_eq!(
            decode_modified_utf8(&encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}")).unwrap(),
            "\u{10000}\u{dffff}\u{10FFFF}"
        );
    }

    #[test]
    fn malformed_input() {
        assert!(matches!(decode_modified_utf8(&[0b1100_0010]), Err(Error::MalformedUtf8)));
        assert!(matches!(
            decode_modified_utf8(&[0b1111_1000, 0x80]),
            Err(Error::MalformedUtf8)
        ));
        // Lone high surrogate
        assert!(matches!(
            decode_modified_utf8(&[237, 160, 128]),
            Err(Error::MalformedUtf8)
        ));
    }
}

#[cfg(test)]
mod pool_tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut pool = ConstantPool::new();

        let first = pool.get_utf8("foo").unwrap();
        let size_after_first = pool.size();
        let second = pool.get_utf8("foo").unwrap();

        assert_eq!(first, second);
        assert_eq!(pool.size(), size_after_first);
        assert_eq!(pool.len(), 1);

        let ref1 = pool.get_method_ref("A", "m", "()V").unwrap();
        let len_after_ref = pool.len();
        let ref2 = pool.get_method_ref("A", "m", "()V").unwrap();
        assert_eq!(ref1, ref2);
        assert_eq!(pool.len(), len_after_ref);
    }

    #[test]
    fn slot_accounting() {
        let mut pool = ConstantPool::new();
        pool.get_utf8("a").unwrap();
        pool.get_long(42).unwrap();
        pool.get_integer(7).unwrap();
        pool.get_double(1.5).unwrap();

        // 1 + 2 + 1 + 2 logical slots
        assert_eq!(pool.size(), 6);
        assert_eq!(pool.len(), 4);

        let mut bytes = vec![];
        pool.write(&mut bytes).unwrap();
        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), 7);
    }

    #[test]
    fn float_and_double_keys_compare_by_bit_pattern() {
        let mut pool = ConstantPool::new();

        let pos = pool.get_double(0.0).unwrap();
        let neg = pool.get_double(-0.0).unwrap();
        assert_ne!(pos, neg);

        let pos = pool.get_float(0.0f32).unwrap();
        let neg = pool.get_float(-0.0f32).unwrap();
        assert_ne!(pos, neg);

        // NaNs with identical payloads do intern together
        let nan1 = pool.get_double(f64::NAN).unwrap();
        let nan2 = pool.get_double(f64::NAN).unwrap();
        assert_eq!(nan1, nan2);
    }

    #[test]
    fn two_slot_entries_reserve_their_successor() {
        let mut pool = ConstantPool::new();
        let long_index = pool.get_long(99).unwrap();
        let next_index = pool.get_integer(1).unwrap();

        assert_eq!(long_index, ConstantIndex(1));
        assert_eq!(next_index, ConstantIndex(3));
        assert!(matches!(
            pool.get(ConstantIndex(2)),
            Err(Error::ConstantIndexOutOfRange(2))
        ));
        assert!(matches!(
            pool.get(ConstantIndex(0)),
            Err(Error::ConstantIndexOutOfRange(0))
        ));
        assert!(matches!(
            pool.get(ConstantIndex(4)),
            Err(Error::ConstantIndexOutOfRange(4))
        ));
    }

    #[test]
    fn tag_mismatch_is_detected() {
        let mut pool = ConstantPool::new();
        let index = pool.get_integer(5).unwrap();

        assert!(pool.get_tagged(index, Tag::Integer).is_ok());
        assert!(matches!(
            pool.get_tagged(index, Tag::Float),
            Err(Error::ConstantTagMismatch {
                index: 1,
                expected: Tag::Float,
                actual: Tag::Integer,
            })
        ));
    }

    #[test]
    fn field_ref_interns_its_parts() {
        let mut pool = ConstantPool::new();
        pool.get_utf8("foo").unwrap();
        pool.get_float(3.14).unwrap();
        pool.get_utf8("foo").unwrap();
        let field_ref = pool.get_field_ref("A", "f", "I").unwrap();

        // "foo", 3.14, "A", TypeInfo(A), "f", "I", NameAndType, FieldRef
        assert_eq!(pool.len(), 8);

        let (class, name_and_type) = match pool.get(field_ref.0).unwrap() {
            Constant::FieldRef {
                class,
                name_and_type,
            } => (*class, *name_and_type),
            other => panic!("expected field ref, got {:?}", other),
        };
        match pool.get_tagged(class.0, Tag::TypeInfo).unwrap() {
            Constant::TypeInfo(name) => assert_eq!(pool.lookup_utf8(*name).unwrap(), "A"),
            _ => unreachable!(),
        }
        match pool.get_tagged(name_and_type.0, Tag::NameAndType).unwrap() {
            Constant::NameAndType { name, descriptor } => {
                assert_eq!(pool.lookup_utf8(*name).unwrap(), "f");
                assert_eq!(pool.lookup_utf8(*descriptor).unwrap(), "I");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut pool = ConstantPool::new();
        pool.get_utf8("Point").unwrap();
        pool.get_integer(-7).unwrap();
        pool.get_long(1 << 40).unwrap();
        pool.get_double(-0.0).unwrap();
        pool.get_string("hello").unwrap();
        pool.get_field_ref("Point", "x", "I").unwrap();
        pool.get_interface_method_ref("Runnable", "run", "()V").unwrap();
        let method = pool.get_method_ref("Point", "norm", "()D").unwrap();
        pool.get_method_handle(ReferenceKind::InvokeVirtual, method.into())
            .unwrap();
        pool.get_method_type("(I)I").unwrap();
        pool.get_invoke_dynamic(0, "apply", "()Ljava/lang/Object;")
            .unwrap();

        let mut bytes = vec![];
        pool.write(&mut bytes).unwrap();

        let decoded = ConstantPool::read(&mut &bytes[..]).unwrap();
        assert_eq!(decoded.size(), pool.size());
        assert_eq!(decoded.len(), pool.len());
        for ((index1, constant1), (index2, constant2)) in pool.iter().zip(decoded.iter()) {
            assert_eq!(index1, index2);
            assert_eq!(constant1.tag(), constant2.tag());
        }

        // Re-encoding the decoded pool is byte-identical
        let mut bytes2 = vec![];
        decoded.write(&mut bytes2).unwrap();
        assert_eq!(bytes, bytes2);
    }

    #[test]
    fn serialized_length_matches_byte_length() {
        let mut pool = ConstantPool::new();
        pool.get_utf8("αβγ").unwrap();
        pool.get_long(3).unwrap();
        pool.get_string("s").unwrap();
        pool.get_method_type("()V").unwrap();

        let expected: usize = pool.iter().map(|(_, c)| c.byte_length()).sum();
        let mut bytes = vec![];
        pool.write(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 2 + expected);
    }

    #[test]
    fn unknown_tag_fails_the_parse() {
        // count = 2, then a bogus tag byte
        let bytes = [0u8, 2, 19, 0, 0];
        assert!(matches!(
            ConstantPool::read(&mut &bytes[..]),
            Err(Error::UnknownConstantTag(19))
        ));
    }

    #[test]
    fn pool_overflows_at_the_index_space_limit() {
        let mut pool = ConstantPool::new();
        let mut overflowed = false;
        for i in 0..40_000i64 {
            match pool.get_long(i) {
                Ok(_) => (),
                Err(Error::ConstantPoolOverflow { .. }) => {
                    overflowed = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert!(overflowed);
        // 32767 two-slot entries fit before the next one would spill past index 65535
        assert_eq!(pool.len(), 32767);
        assert_eq!(pool.size(), 65534);
    }
}
