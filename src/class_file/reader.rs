use crate::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::class_file::{
    Attribute, ClassFile, ConstantPool, Field, Method, TypeInfoConstantIndex, Utf8ConstantIndex,
    Version,
};
use crate::class_file::ConstantIndex;
use crate::errors::Error;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

/// Decoding of an existing class image, the inverse of [`ClassFile`]'s `Serialize`
///
/// Attribute bodies are kept as raw byte frames; the pool is fully reconstructed (including
/// its interning maps, so the decoded class can be inspected and re-encoded).
impl ClassFile {
    pub fn parse<R: Read>(reader: &mut R) -> Result<ClassFile, Error> {
        let magic = reader.read_u32::<BigEndian>()?;
        if magic.to_be_bytes() != ClassFile::MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let _minor = reader.read_u16::<BigEndian>()?;
        let major = reader.read_u16::<BigEndian>()?;
        let version = Version::from_major(major).ok_or(Error::UnsupportedVersion(major))?;

        let constants = ConstantPool::read(reader)?;

        let access_flags =
            ClassAccessFlags::from_bits_truncate(reader.read_u16::<BigEndian>()?);
        let this_class = TypeInfoConstantIndex(ConstantIndex(reader.read_u16::<BigEndian>()?));
        let super_class = match reader.read_u16::<BigEndian>()? {
            0 => None,
            index => Some(TypeInfoConstantIndex(ConstantIndex(index))),
        };

        let interface_count = reader.read_u16::<BigEndian>()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(TypeInfoConstantIndex(ConstantIndex(
                reader.read_u16::<BigEndian>()?,
            )));
        }

        let field_count = reader.read_u16::<BigEndian>()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(Field {
                access_flags: FieldAccessFlags::from_bits_truncate(
                    reader.read_u16::<BigEndian>()?,
                ),
                name_index: Utf8ConstantIndex(ConstantIndex(reader.read_u16::<BigEndian>()?)),
                descriptor_index: Utf8ConstantIndex(ConstantIndex(
                    reader.read_u16::<BigEndian>()?,
                )),
                attributes: parse_attributes(reader)?,
            });
        }

        let method_count = reader.read_u16::<BigEndian>()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(Method {
                access_flags: MethodAccessFlags::from_bits_truncate(
                    reader.read_u16::<BigEndian>()?,
                ),
                name_index: Utf8ConstantIndex(ConstantIndex(reader.read_u16::<BigEndian>()?)),
                descriptor_index: Utf8ConstantIndex(ConstantIndex(
                    reader.read_u16::<BigEndian>()?,
                )),
                attributes: parse_attributes(reader)?,
            });
        }

        let attributes = parse_attributes(reader)?;

        log::trace!(
            "parsed class file: {} pool entries, {} fields, {} methods",
            constants.len(),
            fields.len(),
            methods.len()
        );

        Ok(ClassFile {
            version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

/// Parse a `u16`-counted attribute table, keeping each body as its raw frame
pub fn parse_attributes<R: Read>(reader: &mut R) -> Result<Vec<Attribute>, Error> {
    let count = reader.read_u16::<BigEndian>()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = Utf8ConstantIndex(ConstantIndex(reader.read_u16::<BigEndian>()?));
        let length = reader.read_u32::<BigEndian>()?;
        let mut info = vec![0u8; length as usize];
        reader.read_exact(&mut info)?;
        attributes.push(Attribute { name_index, info });
    }
    Ok(attributes)
}
