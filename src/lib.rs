//! Encode and decode JVM class files
//!
//! The three moving parts are the interning [`class_file::ConstantPool`], the
//! [`code`] instruction model with its layout pass and assembler, and the [`model`] layer
//! that serializes a whole class. One pool is shared by a class and its method bodies: the
//! assembler interns every constant a body mentions, the class serializer interns names and
//! descriptors while walking members, and only then is the pool itself written, ahead of the
//! body bytes, the way the format wants it.
//!
//! ### Simple example
//!
//! Consider the following simple Java class:
//!
//! ```java,ignore,no_run
//! public class Point {
//!     public final int x;
//!
//!     public Point(int x) {
//!         this.x = x;
//!     }
//! }
//! ```
//!
//! Generating an analogous class file can be done as follows:
//!
//! ```
//! use classfile_codec::class_file::{ConstantPool, Version};
//! use classfile_codec::code::{
//!     assemble, Instruction, InstructionSequence, MemberRef, OpCode, Operand,
//! };
//! use classfile_codec::model::{Class, Field, Method, MethodBody, Parameter};
//! use classfile_codec::{ClassAccessFlags, Error, FieldAccessFlags, MethodAccessFlags};
//!
//! # fn generate_class() -> Result<Vec<u8>, Error> {
//! let mut class = Class::new("me/alec/Point", Some("java/lang/Object"), ClassAccessFlags::PUBLIC);
//! class.add_field(Field::new(
//!     FieldAccessFlags::PUBLIC | FieldAccessFlags::FINAL,
//!     "x",
//!     "I",
//! ));
//!
//! // Generate the constructor body against the class's pool
//! let mut constants = ConstantPool::new();
//! let mut code = InstructionSequence::new();
//! code.push(Instruction::simple(OpCode::ALoad0)?);
//! code.push(Instruction::new(
//!     OpCode::InvokeSpecial,
//!     Operand::Method(MemberRef {
//!         class: "java/lang/Object".to_string(),
//!         name: "<init>".to_string(),
//!         descriptor: "()V".to_string(),
//!     }),
//! )?);
//! code.push(Instruction::simple(OpCode::ALoad0)?);
//! code.push(Instruction::simple(OpCode::ILoad1)?);
//! code.push(Instruction::new(
//!     OpCode::PutField,
//!     Operand::Field(MemberRef {
//!         class: "me/alec/Point".to_string(),
//!         name: "x".to_string(),
//!         descriptor: "I".to_string(),
//!     }),
//! )?);
//! code.push(Instruction::simple(OpCode::Return)?);
//!
//! code.layout();
//! let mut body_bytes = vec![];
//! assemble(&code, &mut constants, &mut body_bytes)?;
//!
//! let mut constructor = Method::new(MethodAccessFlags::PUBLIC, "<init>", "(I)V");
//! constructor.parameters.push(Parameter { name: "x".to_string(), annotations: vec![] });
//! constructor.body = Some(MethodBody {
//!     max_stack: 2,
//!     code: body_bytes,
//!     locals: vec![],
//!     exception_spans: vec![],
//! });
//! class.add_method(constructor);
//!
//! // Finally, encode the class into bytes; the pool lands ahead of the body
//! let mut class_bytes: Vec<u8> = vec![];
//! class.write_class(Version::Java8, constants, &mut class_bytes)?;
//! # Ok(class_bytes)
//! # }
//! # generate_class().unwrap();
//! ```
//!
//! [`class_file::ClassFile::parse`] decodes an existing image back for inspection.

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
pub(crate) mod util;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
