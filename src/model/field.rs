use crate::access_flags::FieldAccessFlags;
use crate::class_file;
use crate::class_file::{ConstantPool, ConstantValue, Signature};
use crate::errors::Error;
use crate::model::annotation::{annotation_attributes, marker_attribute};
use crate::model::{Annotation, ElementValue};

/// Semantic representation of a field
pub struct Field {
    pub access_flags: FieldAccessFlags,

    pub name: String,

    /// Erased field descriptor (eg. `Ljava/util/List;`)
    pub descriptor: String,

    /// Compile-time constant initializer, if the field has one
    pub constant_value: Option<ElementValue>,

    /// Generic signature, present only when it differs from the erased descriptor
    pub generic_signature: Option<String>,

    pub deprecated: bool,

    pub annotations: Vec<Annotation>,
}

impl Field {
    pub fn new(access_flags: FieldAccessFlags, name: &str, descriptor: &str) -> Field {
        Field {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            constant_value: None,
            generic_signature: None,
            deprecated: false,
            annotations: vec![],
        }
    }

    /// Serialize the field record, interning every name and constant it mentions
    pub fn serialize_field(self, constants: &mut ConstantPool) -> Result<class_file::Field, Error> {
        let name_index = constants.get_utf8(&self.name)?;
        let descriptor_index = constants.get_utf8(&self.descriptor)?;

        let mut attributes = vec![];

        // `ConstantValue` attribute, kind-dispatched on the initializer
        if let Some(value) = &self.constant_value {
            let index = value.constant_value_index(constants)?;
            attributes.push(constants.get_attribute(ConstantValue(index))?);
        }

        if self.deprecated {
            attributes.push(marker_attribute("Deprecated", constants)?);
        }
        if self.access_flags.contains(FieldAccessFlags::ENUM) {
            attributes.push(marker_attribute("Enum", constants)?);
        }
        if self.access_flags.contains(FieldAccessFlags::SYNTHETIC) {
            attributes.push(marker_attribute("Synthetic", constants)?);
        }

        // `Signature` attribute
        if let Some(signature) = &self.generic_signature {
            let signature = constants.get_utf8(signature)?;
            attributes.push(constants.get_attribute(Signature { signature })?);
        }

        attributes.extend(annotation_attributes(&self.annotations, constants)?);

        Ok(class_file::Field {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }
}
