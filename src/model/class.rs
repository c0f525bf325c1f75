use crate::access_flags::ClassAccessFlags;
use crate::class_file;
use crate::class_file::{ClassFile, ConstantPool, Serialize, Signature, Version};
use crate::errors::Error;
use crate::model::annotation::{annotation_attributes, marker_attribute};
use crate::model::{Annotation, Field, Method};
use byteorder::WriteBytesExt;

/// Semantic representation of a class, ready to be encoded
///
/// Serialization walks fields, methods, and attributes first, interning every name,
/// descriptor, and constant through a fresh pool as a side effect; the pool can only be
/// written once that walk is complete, and the class file format wants it near the front, so
/// the walk accumulates its output in per-member buffers which [`ClassFile`] concatenates
/// after the serialized pool.
pub struct Class {
    /// Internal name (eg. `com/example/Widget`)
    pub name: String,

    /// Internal name of the superclass; `None` only for the root of the hierarchy
    pub superclass: Option<String>,

    /// Internal names of implemented interfaces
    pub interfaces: Vec<String>,

    pub access_flags: ClassAccessFlags,

    /// Generic signature, present when the type, its supertype, or an interface is generic
    pub generic_signature: Option<String>,

    pub deprecated: bool,

    pub annotations: Vec<Annotation>,

    pub fields: Vec<Field>,

    pub methods: Vec<Method>,
}

impl Class {
    pub fn new(name: &str, superclass: Option<&str>, access_flags: ClassAccessFlags) -> Class {
        Class {
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            interfaces: vec![],
            access_flags,
            generic_signature: None,
            deprecated: false,
            annotations: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn add_method(&mut self, method: Method) {
        self.methods.push(method);
    }

    /// Flags as they appear in the serialized class
    ///
    /// `PROTECTED` (possible on nested types) implies `PUBLIC`; the strict floating point
    /// bit is stripped; every non-interface type gets the `SUPER` marker; anything outside
    /// the legal class flag set is masked off.
    fn normalized_flags(&self) -> ClassAccessFlags {
        let mut flags = self.access_flags;
        if flags.contains(ClassAccessFlags::PROTECTED) {
            flags |= ClassAccessFlags::PUBLIC;
        }
        flags &= ClassAccessFlags::LEGAL;
        if !flags.contains(ClassAccessFlags::INTERFACE) {
            flags |= ClassAccessFlags::SUPER;
        }
        flags
    }

    /// Serialize the class into a class file
    ///
    /// `constants` is the pool associated with this class. Method bodies were assembled
    /// against it, so their encoded bytes already hold its token numbers; serialization keeps
    /// growing the same pool while walking fields, methods, and attributes. A class with no
    /// pre-assembled bodies can simply pass a fresh pool.
    pub fn serialize(self, version: Version, mut constants: ConstantPool) -> Result<ClassFile, Error> {
        log::trace!("serializing class {}", self.name);

        let access_flags = self.normalized_flags();

        let this_class = constants.get_type_info(&self.name)?;
        let super_class = match &self.superclass {
            Some(superclass) => Some(constants.get_type_info(superclass)?),
            None => None,
        };
        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| constants.get_type_info(interface))
            .collect::<Result<_, Error>>()?;

        // Serialize fields and methods; this is where most of the pool gets populated
        let class_name = self.name;
        let fields = self
            .fields
            .into_iter()
            .map(|field| field.serialize_field(&mut constants))
            .collect::<Result<Vec<class_file::Field>, Error>>()?;
        let methods = self
            .methods
            .into_iter()
            .map(|method| method.serialize_method(&class_name, &mut constants))
            .collect::<Result<Vec<class_file::Method>, Error>>()?;

        let mut attributes = vec![];

        // `Signature` attribute, only when something generic is left to describe
        if let Some(signature) = &self.generic_signature {
            let signature = constants.get_utf8(signature)?;
            attributes.push(constants.get_attribute(Signature { signature })?);
        }

        if self.deprecated {
            attributes.push(marker_attribute("Deprecated", &mut constants)?);
        }
        if access_flags.contains(ClassAccessFlags::ENUM) {
            attributes.push(marker_attribute("Enum", &mut constants)?);
        }
        if access_flags.contains(ClassAccessFlags::SYNTHETIC) {
            attributes.push(marker_attribute("Synthetic", &mut constants)?);
        }
        if access_flags.contains(ClassAccessFlags::ANNOTATION) {
            attributes.push(marker_attribute("Annotation", &mut constants)?);
        }

        attributes.extend(annotation_attributes(&self.annotations, &mut constants)?);

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

    /// Serialize straight into an output sink
    pub fn write_class<W: WriteBytesExt>(
        self,
        version: Version,
        constants: ConstantPool,
        writer: &mut W,
    ) -> Result<(), Error> {
        let class_file = self.serialize(version, constants)?;
        class_file.serialize(writer).map_err(Error::IoError)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn protected_implies_public_and_strict_is_stripped() {
        let class = Class::new(
            "Outer$Inner",
            Some("java/lang/Object"),
            ClassAccessFlags::PROTECTED | ClassAccessFlags::STRICT | ClassAccessFlags::FINAL,
        );
        let flags = class.normalized_flags();

        assert!(flags.contains(ClassAccessFlags::PUBLIC));
        assert!(flags.contains(ClassAccessFlags::SUPER));
        assert!(flags.contains(ClassAccessFlags::FINAL));
        assert!(!flags.contains(ClassAccessFlags::PROTECTED));
        assert!(!flags.contains(ClassAccessFlags::STRICT));
    }

    #[test]
    fn interfaces_do_not_get_the_super_marker() {
        let interface = Class::new(
            "com/example/Handler",
            Some("java/lang/Object"),
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT,
        );
        let flags = interface.normalized_flags();

        assert!(flags.contains(ClassAccessFlags::INTERFACE));
        assert!(!flags.contains(ClassAccessFlags::SUPER));
    }

    #[test]
    fn empty_class_serializes_with_pool_before_body() {
        let class = Class::new("Empty", Some("java/lang/Object"), ClassAccessFlags::PUBLIC);
        let mut bytes = vec![];
        class
            .write_class(Version::Java8, ConstantPool::new(), &mut bytes)
            .unwrap();

        assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        // minor 0, major 52
        assert_eq!(&bytes[4..8], &[0, 0, 0, 52]);
        // Pool holds: "Empty", TypeInfo(Empty), "java/lang/Object", TypeInfo(...) = 4
        // entries, so the count is 5
        assert_eq!(&bytes[8..10], &[0, 5]);
    }
}
