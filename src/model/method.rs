use crate::access_flags::MethodAccessFlags;
use crate::class_file;
use crate::class_file::{
    AnnotationDefault, BytecodeArray, BytecodeIndex, ConstantPool, ExceptionHandler, Exceptions,
    LocalVariable as LocalVariableEntry, LocalVariableTable, LocalVariableType,
    LocalVariableTypeTable, Signature,
};
use crate::descriptors::{field_type_width, parameter_descriptors};
use crate::errors::Error;
use crate::model::annotation::{annotation_attributes, marker_attribute};
use crate::model::{Annotation, ElementValue, RetentionPolicy};

/// Semantic representation of a method
pub struct Method {
    pub access_flags: MethodAccessFlags,

    pub name: String,

    /// Erased method descriptor (eg. `(IJ)V`)
    pub descriptor: String,

    /// Declared parameters, positionally matching the descriptor
    pub parameters: Vec<Parameter>,

    /// Generated body, absent for `abstract` and `native` methods
    pub body: Option<MethodBody>,

    /// Declared checked exceptions, by internal name
    pub exceptions: Vec<String>,

    /// Default value, for members of annotation interfaces
    pub annotation_default: Option<ElementValue>,

    pub generic_signature: Option<String>,

    pub deprecated: bool,

    pub annotations: Vec<Annotation>,
}

/// One declared parameter
pub struct Parameter {
    pub name: String,
    pub annotations: Vec<Annotation>,
}

/// An already-generated method body, as handed over by the bytecode generator
pub struct MethodBody {
    /// Maximum operand stack depth, computed by the generator
    pub max_stack: u16,

    /// Encoded instructions (see [`crate::code::assemble`])
    pub code: Vec<u8>,

    /// Declared local variables, in slot-assignment order after the receiver and parameters
    pub locals: Vec<LocalVariable>,

    /// Protected ranges and their handlers
    pub exception_spans: Vec<ExceptionSpan>,
}

/// A local variable declared in a method body
pub struct LocalVariable {
    pub name: String,

    /// Erased descriptor; decides the slot width
    pub descriptor: String,

    /// Generic signature, present only for locals whose static type differs from its erasure
    /// (composite/intersection types never carry one)
    pub generic_signature: Option<String>,

    /// Range of the body in which the variable is live
    pub start_pc: u16,
    pub length: u16,
}

/// One protected range: catch handlers get their caught class, finally handlers are encoded
/// with the catch-everything zero token
pub struct ExceptionSpan {
    pub start_pc: u16,
    pub end_pc: u16,
    pub catch_handlers: Vec<(u16, String)>,
    pub finally_handlers: Vec<u16>,
}

impl Method {
    pub fn new(access_flags: MethodAccessFlags, name: &str, descriptor: &str) -> Method {
        Method {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            parameters: vec![],
            body: None,
            exceptions: vec![],
            annotation_default: None,
            generic_signature: None,
            deprecated: false,
            annotations: vec![],
        }
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Serialize the method record
    ///
    /// `class_name` is the internal name of the declaring class (needed for the receiver's
    /// entry in the local variable table).
    pub fn serialize_method(
        self,
        class_name: &str,
        constants: &mut ConstantPool,
    ) -> Result<class_file::Method, Error> {
        let name_index = constants.get_utf8(&self.name)?;
        let descriptor_index = constants.get_utf8(&self.descriptor)?;

        let mut attributes = vec![];

        // `Code` attribute
        if let Some(body) = &self.body {
            let code = self.serialize_body(class_name, body, constants)?;
            attributes.push(constants.get_attribute(code)?);
        }

        // `Exceptions` attribute
        if !self.exceptions.is_empty() {
            let exceptions = self
                .exceptions
                .iter()
                .map(|exception| constants.get_type_info(exception))
                .collect::<Result<_, Error>>()?;
            attributes.push(constants.get_attribute(Exceptions(exceptions))?);
        }

        // `AnnotationDefault` attribute
        if let Some(default) = &self.annotation_default {
            let value = default.resolve(constants)?;
            attributes.push(constants.get_attribute(AnnotationDefault(value))?);
        }

        if self.deprecated {
            attributes.push(marker_attribute("Deprecated", constants)?);
        }
        if self.access_flags.contains(MethodAccessFlags::SYNTHETIC) {
            attributes.push(marker_attribute("Synthetic", constants)?);
        }
        if self.access_flags.contains(MethodAccessFlags::BRIDGE) {
            attributes.push(marker_attribute("Bridge", constants)?);
        }
        if self.access_flags.contains(MethodAccessFlags::VARARGS) {
            attributes.push(marker_attribute("Varargs", constants)?);
        }

        // `Signature` attribute
        if let Some(signature) = &self.generic_signature {
            let signature = constants.get_utf8(signature)?;
            attributes.push(constants.get_attribute(Signature { signature })?);
        }

        attributes.extend(annotation_attributes(&self.annotations, constants)?);
        attributes.extend(self.parameter_annotation_attributes(constants)?);

        Ok(class_file::Method {
            access_flags: self.access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn serialize_body(
        &self,
        class_name: &str,
        body: &MethodBody,
        constants: &mut ConstantPool,
    ) -> Result<class_file::Code, Error> {
        let code_length = body.code.len() as u16;
        let parameters = parameter_descriptors(&self.descriptor)?;

        // Slot layout: receiver (instance methods), then parameters, then declared locals,
        // each advancing by its own width
        let mut next_slot: u16 = 0;
        let mut variables = vec![];
        let mut variable_types = vec![];

        if !self.is_static() {
            variables.push(LocalVariableEntry {
                start_pc: 0,
                length: code_length,
                name_index: constants.get_utf8("this")?,
                descriptor_index: constants.get_utf8(format!("L{};", class_name))?,
                index: next_slot,
            });
            next_slot += 1;
        }

        for (position, descriptor) in parameters.iter().enumerate() {
            let name = match self.parameters.get(position) {
                Some(parameter) => parameter.name.clone(),
                None => format!("arg{}", position),
            };
            variables.push(LocalVariableEntry {
                start_pc: 0,
                length: code_length,
                name_index: constants.get_utf8(name)?,
                descriptor_index: constants.get_utf8(*descriptor)?,
                index: next_slot,
            });
            next_slot += field_type_width(descriptor);
        }

        for local in &body.locals {
            variables.push(LocalVariableEntry {
                start_pc: local.start_pc,
                length: local.length,
                name_index: constants.get_utf8(&local.name)?,
                descriptor_index: constants.get_utf8(&local.descriptor)?,
                index: next_slot,
            });
            if let Some(signature) = &local.generic_signature {
                variable_types.push(LocalVariableType {
                    start_pc: local.start_pc,
                    length: local.length,
                    name_index: constants.get_utf8(&local.name)?,
                    signature_index: constants.get_utf8(signature)?,
                    index: next_slot,
                });
            }
            next_slot += field_type_width(&local.descriptor);
        }

        let max_locals = next_slot;

        let mut exception_table = vec![];
        for span in &body.exception_spans {
            for (handler_pc, catch_type) in &span.catch_handlers {
                exception_table.push(ExceptionHandler {
                    start_pc: BytecodeIndex(span.start_pc),
                    end_pc: BytecodeIndex(span.end_pc),
                    handler_pc: BytecodeIndex(*handler_pc),
                    catch_type: Some(constants.get_type_info(catch_type)?),
                });
            }
            for handler_pc in &span.finally_handlers {
                exception_table.push(ExceptionHandler {
                    start_pc: BytecodeIndex(span.start_pc),
                    end_pc: BytecodeIndex(span.end_pc),
                    handler_pc: BytecodeIndex(*handler_pc),
                    catch_type: None,
                });
            }
        }

        let mut code_attributes = vec![];
        if !variables.is_empty() {
            code_attributes.push(constants.get_attribute(LocalVariableTable(variables))?);
        }
        if !variable_types.is_empty() {
            code_attributes.push(constants.get_attribute(LocalVariableTypeTable(variable_types))?);
        }

        Ok(class_file::Code {
            max_stack: body.max_stack,
            max_locals,
            code_array: BytecodeArray(body.code.clone()),
            exception_table,
            attributes: code_attributes,
        })
    }

    fn parameter_annotation_attributes(
        &self,
        constants: &mut ConstantPool,
    ) -> Result<Vec<class_file::Attribute>, Error> {
        let mut has_visible = false;
        let mut has_invisible = false;
        for parameter in &self.parameters {
            for annotation in &parameter.annotations {
                match annotation.effective_retention() {
                    RetentionPolicy::Source => (),
                    RetentionPolicy::Class => has_invisible = true,
                    RetentionPolicy::Runtime => has_visible = true,
                }
            }
        }

        let mut attributes = vec![];

        if has_visible {
            let parameters = self.filtered_parameter_annotations(RetentionPolicy::Runtime, constants)?;
            attributes.push(constants.get_attribute(
                class_file::RuntimeVisibleParameterAnnotations(parameters),
            )?);
        }
        if has_invisible {
            let parameters = self.filtered_parameter_annotations(RetentionPolicy::Class, constants)?;
            attributes.push(constants.get_attribute(
                class_file::RuntimeInvisibleParameterAnnotations(parameters),
            )?);
        }

        Ok(attributes)
    }

    fn filtered_parameter_annotations(
        &self,
        retention: RetentionPolicy,
        constants: &mut ConstantPool,
    ) -> Result<Vec<Vec<class_file::Annotation>>, Error> {
        self.parameters
            .iter()
            .map(|parameter| {
                parameter
                    .annotations
                    .iter()
                    .filter(|annotation| annotation.effective_retention() == retention)
                    .map(|annotation| annotation.resolve(constants))
                    .collect::<Result<_, Error>>()
            })
            .collect()
    }
}
