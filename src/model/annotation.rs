use crate::class_file;
use crate::class_file::{Attribute, ConstantIndex, ConstantPool};
use crate::errors::Error;

/// How long an annotation sticks around
///
/// Annotation types whose retention is unknown default to [`RetentionPolicy::Class`]
/// (recorded in the class file but invisible to reflection); that default is a documented
/// policy, not an error.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RetentionPolicy {
    Source,
    Class,
    Runtime,
}

/// An annotation as supplied by the caller's annotation model
#[derive(Clone, Debug)]
pub struct Annotation {
    /// Descriptor of the annotation interface (eg. `Lcom/example/Log;`)
    pub type_descriptor: String,

    /// Retention declared on the annotation interface, if any was found
    pub retention: Option<RetentionPolicy>,

    /// Named element values
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub fn new(type_descriptor: &str) -> Annotation {
        Annotation {
            type_descriptor: type_descriptor.to_string(),
            retention: None,
            elements: vec![],
        }
    }

    pub fn effective_retention(&self) -> RetentionPolicy {
        self.retention.unwrap_or(RetentionPolicy::Class)
    }

    /// Resolve names and constants through the pool into the wire form
    pub fn resolve(&self, constants: &mut ConstantPool) -> Result<class_file::Annotation, Error> {
        let type_index = constants.get_utf8(&self.type_descriptor)?;
        let elements = self
            .elements
            .iter()
            .map(|(name, value)| {
                Ok(class_file::AnnotationElement {
                    name_index: constants.get_utf8(name)?,
                    value: value.resolve(constants)?,
                })
            })
            .collect::<Result<_, Error>>()?;
        Ok(class_file::Annotation {
            type_index,
            elements,
        })
    }
}

/// A typed annotation element value
#[derive(Clone, Debug)]
pub enum ElementValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Enum {
        /// Descriptor of the enum type
        type_descriptor: String,
        constant_name: String,
    },
    /// Class literal, by descriptor
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// Resolve into the wire form: a kind tag plus pool tokens
    pub fn resolve(&self, constants: &mut ConstantPool) -> Result<class_file::AnnotationValue, Error> {
        use crate::class_file::AnnotationValue;
        Ok(match self {
            ElementValue::Boolean(value) => {
                AnnotationValue::Boolean(constants.get_integer(*value as i32)?)
            }
            ElementValue::Byte(value) => {
                AnnotationValue::Byte(constants.get_integer(*value as i32)?)
            }
            ElementValue::Char(value) => {
                AnnotationValue::Char(constants.get_integer(*value as u32 as i32)?)
            }
            ElementValue::Short(value) => {
                AnnotationValue::Short(constants.get_integer(*value as i32)?)
            }
            ElementValue::Int(value) => AnnotationValue::Int(constants.get_integer(*value)?),
            ElementValue::Long(value) => AnnotationValue::Long(constants.get_long(*value)?),
            ElementValue::Float(value) => AnnotationValue::Float(constants.get_float(*value)?),
            ElementValue::Double(value) => AnnotationValue::Double(constants.get_double(*value)?),
            ElementValue::String(value) => AnnotationValue::String(constants.get_utf8(value)?),
            ElementValue::Enum {
                type_descriptor,
                constant_name,
            } => AnnotationValue::Enum {
                type_name: constants.get_utf8(type_descriptor)?,
                const_name: constants.get_utf8(constant_name)?,
            },
            ElementValue::Class(descriptor) => {
                AnnotationValue::Class(constants.get_utf8(descriptor)?)
            }
            ElementValue::Annotation(nested) => {
                AnnotationValue::Annotation(Box::new(nested.resolve(constants)?))
            }
            ElementValue::Array(values) => AnnotationValue::Array(
                values
                    .iter()
                    .map(|value| value.resolve(constants))
                    .collect::<Result<_, Error>>()?,
            ),
        })
    }

    /// Pool token for a field's `ConstantValue` attribute
    ///
    /// Only the primitive kinds have a constant encoding: booleans become 0/1 integer
    /// tokens, `byte`/`short` widen to integer tokens, and `char` stores its code point.
    /// Everything else fails with [`Error::ValueMustBeConstant`].
    pub fn constant_value_index(&self, constants: &mut ConstantPool) -> Result<ConstantIndex, Error> {
        match self {
            ElementValue::Boolean(value) => constants.get_integer(*value as i32),
            ElementValue::Byte(value) => constants.get_integer(*value as i32),
            ElementValue::Short(value) => constants.get_integer(*value as i32),
            ElementValue::Int(value) => constants.get_integer(*value),
            ElementValue::Char(value) => constants.get_integer(*value as u32 as i32),
            ElementValue::Long(value) => constants.get_long(*value),
            ElementValue::Float(value) => constants.get_float(*value),
            ElementValue::Double(value) => constants.get_double(*value),
            _ => Err(Error::ValueMustBeConstant),
        }
    }
}

/// Build the `RuntimeVisibleAnnotations`/`RuntimeInvisibleAnnotations` attributes for a list
/// of annotations, splitting by retention; source-retained annotations are dropped entirely
pub fn annotation_attributes(
    annotations: &[Annotation],
    constants: &mut ConstantPool,
) -> Result<Vec<Attribute>, Error> {
    let mut visible = vec![];
    let mut invisible = vec![];

    for annotation in annotations {
        match annotation.effective_retention() {
            RetentionPolicy::Source => (),
            RetentionPolicy::Class => invisible.push(annotation.resolve(constants)?),
            RetentionPolicy::Runtime => visible.push(annotation.resolve(constants)?),
        }
    }

    let mut attributes = vec![];
    if !visible.is_empty() {
        attributes.push(constants.get_attribute(class_file::RuntimeVisibleAnnotations(visible))?);
    }
    if !invisible.is_empty() {
        attributes
            .push(constants.get_attribute(class_file::RuntimeInvisibleAnnotations(invisible))?);
    }
    Ok(attributes)
}

/// Zero-length marker attribute (`Deprecated`, `Synthetic`, ...)
pub(crate) fn marker_attribute(
    name: &str,
    constants: &mut ConstantPool,
) -> Result<Attribute, Error> {
    Ok(Attribute {
        name_index: constants.get_utf8(name)?,
        info: vec![],
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_retention_defaults_to_invisible() {
        let mut constants = ConstantPool::new();
        let annotation = Annotation::new("Lcom/example/Tag;");
        assert_eq!(annotation.effective_retention(), RetentionPolicy::Class);

        let attributes = annotation_attributes(&[annotation], &mut constants).unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(
            constants.lookup_utf8(attributes[0].name_index).unwrap(),
            "RuntimeInvisibleAnnotations"
        );
    }

    #[test]
    fn source_annotations_are_dropped() {
        let mut constants = ConstantPool::new();
        let mut annotation = Annotation::new("Lcom/example/Gone;");
        annotation.retention = Some(RetentionPolicy::Source);

        let attributes = annotation_attributes(&[annotation], &mut constants).unwrap();
        assert!(attributes.is_empty());
    }

    #[test]
    fn non_constant_field_values_are_rejected() {
        let mut constants = ConstantPool::new();
        assert!(matches!(
            ElementValue::String("s".to_string()).constant_value_index(&mut constants),
            Err(Error::ValueMustBeConstant)
        ));
        assert!(matches!(
            ElementValue::Array(vec![]).constant_value_index(&mut constants),
            Err(Error::ValueMustBeConstant)
        ));

        // Booleans encode as 0/1 integers, chars as their code point
        let t = ElementValue::Boolean(true).constant_value_index(&mut constants).unwrap();
        let one = constants.get_integer(1).unwrap();
        assert_eq!(t, one);
        let c = ElementValue::Char('A').constant_value_index(&mut constants).unwrap();
        let sixty_five = constants.get_integer(65).unwrap();
        assert_eq!(c, sixty_five);
    }
}
