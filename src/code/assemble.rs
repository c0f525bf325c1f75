use crate::class_file::{ConstantIndex, ConstantPool, Serialize};
use crate::code::{
    ConstOperand, InstructionId, InstructionSequence, InstructionVisitor, MemberRef, OpCode,
    OperandType, SwitchInfo, TypeRef,
};
use crate::descriptors::{parameter_slots, BaseType};
use crate::errors::Error;
use byteorder::WriteBytesExt;

/// Encode a laid-out instruction sequence, resolving every symbolic operand through the pool
///
/// The sequence must have been through [`InstructionSequence::layout`] first: branch and
/// switch encoding needs the resolved offsets of both the instruction and its targets.
pub fn assemble<W: WriteBytesExt>(
    sequence: &InstructionSequence,
    constants: &mut ConstantPool,
    writer: &mut W,
) -> Result<(), Error> {
    log::trace!("assembling {} instructions", sequence.len());
    for (id, instruction) in sequence.iter() {
        let offset = instruction.offset().ok_or(Error::UnresolvedTarget(id))?;
        let mut assembler = Assembler {
            sequence,
            constants: &mut *constants,
            writer: &mut *writer,
            offset,
        };
        instruction.accept(&mut assembler)?;
    }
    Ok(())
}

/// The encoding half of the instruction visitor
struct Assembler<'a, W> {
    sequence: &'a InstructionSequence,
    constants: &'a mut ConstantPool,
    writer: &'a mut W,
    /// Offset of the instruction currently being encoded
    offset: u32,
}

impl<'a, W: WriteBytesExt> Assembler<'a, W> {
    fn write_opcode(&mut self, opcode: OpCode) -> Result<(), Error> {
        let code = opcode.code();
        if code > 0xff {
            ((code >> 8) as u8).serialize(self.writer)?;
        }
        ((code & 0xff) as u8).serialize(self.writer)?;
        Ok(())
    }

    fn relative_target(&self, target: InstructionId) -> Result<i64, Error> {
        let target_offset = self
            .sequence
            .get(target)
            .and_then(|instruction| instruction.offset())
            .ok_or(Error::UnresolvedTarget(target))?;
        Ok(target_offset as i64 - self.offset as i64)
    }
}

impl<'a, W: WriteBytesExt> InstructionVisitor for Assembler<'a, W> {
    fn visit_no_operand(&mut self, opcode: OpCode) -> Result<(), Error> {
        self.write_opcode(opcode)
    }

    fn visit_primitive_type(&mut self, opcode: OpCode, base: BaseType) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        base.newarray_code().serialize(self.writer)?;
        Ok(())
    }

    fn visit_type(&mut self, opcode: OpCode, type_ref: &TypeRef) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        let index = self.constants.get_type_info(&type_ref.0)?;
        index.serialize(self.writer)?;
        Ok(())
    }

    fn visit_type_with_dimensions(
        &mut self,
        opcode: OpCode,
        type_ref: &TypeRef,
        dimensions: u8,
    ) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        let index = self.constants.get_type_info(&type_ref.0)?;
        index.serialize(self.writer)?;
        dimensions.serialize(self.writer)?;
        Ok(())
    }

    fn visit_method(&mut self, opcode: OpCode, member: &MemberRef) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        match opcode {
            OpCode::InvokeInterface => {
                let index = self.constants.get_interface_method_ref(
                    &member.class,
                    &member.name,
                    &member.descriptor,
                )?;
                index.serialize(self.writer)?;

                // Argument slot count (receiver included), then a zero byte
                let count = 1 + parameter_slots(&member.descriptor)?;
                (count as u8).serialize(self.writer)?;
                0u8.serialize(self.writer)?;
            }
            OpCode::InvokeDynamic => {
                // The bootstrap method table is maintained by the caller; entry 0 is the
                // convention for bodies assembled standalone
                let index = self.constants.get_invoke_dynamic(
                    0,
                    &member.name,
                    &member.descriptor,
                )?;
                index.serialize(self.writer)?;
                0u16.serialize(self.writer)?;
            }
            _ => {
                let index = self.constants.get_method_ref(
                    &member.class,
                    &member.name,
                    &member.descriptor,
                )?;
                index.serialize(self.writer)?;
            }
        }
        Ok(())
    }

    fn visit_field(&mut self, opcode: OpCode, member: &MemberRef) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        let index =
            self.constants
                .get_field_ref(&member.class, &member.name, &member.descriptor)?;
        index.serialize(self.writer)?;
        Ok(())
    }

    fn visit_branch(&mut self, opcode: OpCode, target: InstructionId) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        let relative = self.relative_target(target)?;
        if opcode.is_wide() {
            (relative as i32).serialize(self.writer)?;
        } else {
            let narrow = i16::try_from(relative).map_err(|_| Error::BranchOffsetOverflow {
                at: self.offset,
                relative,
            })?;
            narrow.serialize(self.writer)?;
        }
        Ok(())
    }

    fn visit_int(&mut self, opcode: OpCode, value: i32) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        match opcode.operand_type() {
            OperandType::I1 => (value as i8).serialize(self.writer)?,
            _ => (value as i16).serialize(self.writer)?,
        }
        Ok(())
    }

    fn visit_long(&mut self, opcode: OpCode, value: i64) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        value.serialize(self.writer)?;
        Ok(())
    }

    fn visit_constant(&mut self, opcode: OpCode, constant: &ConstOperand) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        let index: ConstantIndex = match constant {
            ConstOperand::Integer(value) => self.constants.get_integer(*value)?,
            ConstOperand::Float(value) => self.constants.get_float(*value)?,
            ConstOperand::Long(value) => self.constants.get_long(*value)?,
            ConstOperand::Double(value) => self.constants.get_double(*value)?,
            ConstOperand::String(value) => self.constants.get_string(value)?.into(),
            ConstOperand::Type(type_ref) => self.constants.get_type_info(&type_ref.0)?.into(),
        };
        if opcode.operand_type() == OperandType::Constant {
            let narrow =
                u8::try_from(index.0).map_err(|_| Error::ConstantIndexTooWide(index))?;
            narrow.serialize(self.writer)?;
        } else {
            index.serialize(self.writer)?;
        }
        Ok(())
    }

    fn visit_switch(&mut self, opcode: OpCode, info: &SwitchInfo) -> Result<(), Error> {
        self.write_opcode(opcode)?;

        // Pad so the jump table starts on a 4-byte boundary; the instruction's size already
        // accounted for these bytes
        let padding = (4 - ((self.offset as usize + 1) % 4)) % 4;
        for _ in 0..padding {
            0u8.serialize(self.writer)?;
        }

        let default = self.relative_target(info.default_target)? as i32;
        match opcode {
            OpCode::TableSwitch => {
                default.serialize(self.writer)?;
                info.low_value.serialize(self.writer)?;
                info.high_value().serialize(self.writer)?;
                for target in &info.targets {
                    (self.relative_target(*target)? as i32).serialize(self.writer)?;
                }
            }
            _ => {
                default.serialize(self.writer)?;
                (info.keys.len() as i32).serialize(self.writer)?;
                for (key, target) in info.keys.iter().zip(&info.targets) {
                    key.serialize(self.writer)?;
                    (self.relative_target(*target)? as i32).serialize(self.writer)?;
                }
            }
        }
        Ok(())
    }

    fn visit_local(&mut self, opcode: OpCode, slot: u16) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        if opcode.is_wide() {
            slot.serialize(self.writer)?;
        } else {
            (slot as u8).serialize(self.writer)?;
        }
        Ok(())
    }

    fn visit_local_int(&mut self, opcode: OpCode, slot: u16, value: i16) -> Result<(), Error> {
        self.write_opcode(opcode)?;
        if opcode.is_wide() {
            slot.serialize(self.writer)?;
            value.serialize(self.writer)?;
        } else {
            (slot as u8).serialize(self.writer)?;
            (value as i8).serialize(self.writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::code::{Instruction, Operand};

    fn assemble_all(sequence: &mut InstructionSequence) -> (Vec<u8>, ConstantPool) {
        let mut constants = ConstantPool::new();
        let total = sequence.layout();
        let mut bytes = vec![];
        assemble(sequence, &mut constants, &mut bytes).unwrap();
        assert_eq!(bytes.len(), total as usize);
        (bytes, constants)
    }

    #[test]
    fn forward_and_backward_branches() {
        let mut sequence = InstructionSequence::new();
        let start = sequence.push(Instruction::simple(OpCode::IConst0).unwrap());
        let goto_id = sequence.push_placeholder();
        sequence.push(Instruction::simple(OpCode::Pop).unwrap());
        let end = sequence.push(Instruction::simple(OpCode::Return).unwrap());
        sequence.replace(
            goto_id,
            Instruction::new(OpCode::Goto, Operand::Branch(end)).unwrap(),
        );
        sequence.push(
            Instruction::new(OpCode::IfEq, Operand::Branch(start)).unwrap(),
        );

        let (bytes, _) = assemble_all(&mut sequence);

        // iconst_0, goto +4, pop, return, ifeq -6
        assert_eq!(
            bytes,
            vec![0x03, 0xa7, 0x00, 0x04, 0x57, 0xb1, 0x99, 0xff, 0xfa]
        );
    }

    #[test]
    fn wide_goto_uses_four_byte_offsets() {
        let mut sequence = InstructionSequence::new();
        let goto_id = sequence.push_placeholder();
        let end = sequence.push(Instruction::simple(OpCode::Return).unwrap());
        sequence.replace(
            goto_id,
            Instruction::new(OpCode::GotoW, Operand::Branch(end)).unwrap(),
        );

        let (bytes, _) = assemble_all(&mut sequence);
        assert_eq!(bytes, vec![0xc8, 0x00, 0x00, 0x00, 0x05, 0xb1]);
    }

    #[test]
    fn narrow_branch_overflow_is_reported() {
        let mut sequence = InstructionSequence::new();
        let goto_id = sequence.push_placeholder();
        for _ in 0..40_000 {
            sequence.push(Instruction::simple(OpCode::Pop2).unwrap());
        }
        let end = sequence.push(Instruction::simple(OpCode::Return).unwrap());
        sequence.replace(
            goto_id,
            Instruction::new(OpCode::Goto, Operand::Branch(end)).unwrap(),
        );

        sequence.layout();
        let mut constants = ConstantPool::new();
        let mut bytes = vec![];
        assert!(matches!(
            assemble(&sequence, &mut constants, &mut bytes),
            Err(Error::BranchOffsetOverflow { at: 0, .. })
        ));
    }

    #[test]
    fn table_switch_encoding() {
        let mut sequence = InstructionSequence::new();
        let switch_id = sequence.push_placeholder();
        let case_a = sequence.push(Instruction::simple(OpCode::IConst0).unwrap());
        let case_b = sequence.push(Instruction::simple(OpCode::IConst1).unwrap());
        let default = sequence.push(Instruction::simple(OpCode::Return).unwrap());
        sequence.replace(
            switch_id,
            Instruction::new(
                OpCode::TableSwitch,
                Operand::Switch(SwitchInfo {
                    default_target: default,
                    low_value: 7,
                    keys: vec![],
                    targets: vec![case_a, case_b],
                }),
            )
            .unwrap(),
        );

        let (bytes, _) = assemble_all(&mut sequence);

        // At offset 0 the table needs 3 bytes of padding; cases land at 24, 25, 26
        let mut expected = vec![0xaa, 0, 0, 0];
        expected.extend_from_slice(&26i32.to_be_bytes()); // default
        expected.extend_from_slice(&7i32.to_be_bytes()); // low
        expected.extend_from_slice(&8i32.to_be_bytes()); // high
        expected.extend_from_slice(&24i32.to_be_bytes());
        expected.extend_from_slice(&25i32.to_be_bytes());
        expected.extend_from_slice(&[0x03, 0x04, 0xb1]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn lookup_switch_encoding() {
        let mut sequence = InstructionSequence::new();
        sequence.push(Instruction::simple(OpCode::IConst0).unwrap());
        let switch_id = sequence.push_placeholder();
        let case = sequence.push(Instruction::simple(OpCode::Pop).unwrap());
        let default = sequence.push(Instruction::simple(OpCode::Return).unwrap());
        sequence.replace(
            switch_id,
            Instruction::new(
                OpCode::LookupSwitch,
                Operand::Switch(SwitchInfo {
                    default_target: default,
                    low_value: 0,
                    keys: vec![42],
                    targets: vec![case],
                }),
            )
            .unwrap(),
        );

        let (bytes, _) = assemble_all(&mut sequence);

        // lookupswitch at offset 1: opcode, 2 bytes padding, default, npairs, one pair
        let mut expected = vec![0x03, 0xab, 0, 0];
        expected.extend_from_slice(&20i32.to_be_bytes()); // default: 21 - 1
        expected.extend_from_slice(&1i32.to_be_bytes()); // npairs
        expected.extend_from_slice(&42i32.to_be_bytes());
        expected.extend_from_slice(&19i32.to_be_bytes()); // case: 20 - 1
        expected.extend_from_slice(&[0x57, 0xb1]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn locals_and_increments() {
        let mut sequence = InstructionSequence::new();
        sequence.push(Instruction::new(OpCode::ILoad, Operand::Local(4)).unwrap());
        sequence.push(Instruction::new(OpCode::ILoadW, Operand::Local(300)).unwrap());
        sequence.push(Instruction::new(OpCode::IInc, Operand::LocalConst(4, -1)).unwrap());
        sequence.push(Instruction::new(OpCode::IIncW, Operand::LocalConst(300, 500)).unwrap());
        sequence.push(Instruction::simple(OpCode::Return).unwrap());

        let (bytes, _) = assemble_all(&mut sequence);
        assert_eq!(
            bytes,
            vec![
                0x15, 4, // iload 4
                0xc4, 0x15, 0x01, 0x2c, // wide iload 300
                0x84, 4, 0xff, // iinc 4, -1
                0xc4, 0x84, 0x01, 0x2c, 0x01, 0xf4, // wide iinc 300, 500
                0xb1,
            ]
        );
    }

    #[test]
    fn constants_resolve_through_the_pool() {
        let mut sequence = InstructionSequence::new();
        sequence.push(
            Instruction::new(
                OpCode::Ldc,
                Operand::Constant(ConstOperand::String("hi".to_string())),
            )
            .unwrap(),
        );
        sequence.push(
            Instruction::new(
                OpCode::Ldc2W,
                Operand::Constant(ConstOperand::Long(9)),
            )
            .unwrap(),
        );
        sequence.push(Instruction::simple(OpCode::Return).unwrap());

        let (bytes, constants) = assemble_all(&mut sequence);

        // "hi" utf8 at 1, string at 2, long at 3
        assert_eq!(bytes, vec![0x12, 2, 0x14, 0x00, 3, 0xb1]);
        assert_eq!(constants.len(), 3);
    }

    #[test]
    fn invoke_interface_carries_the_argument_count() {
        let mut sequence = InstructionSequence::new();
        sequence.push(
            Instruction::new(
                OpCode::InvokeInterface,
                Operand::Method(MemberRef {
                    class: "java/util/List".to_string(),
                    name: "add".to_string(),
                    descriptor: "(ILjava/lang/Object;)Z".to_string(),
                }),
            )
            .unwrap(),
        );

        let (bytes, constants) = assemble_all(&mut sequence);
        let index = match bytes.as_slice() {
            [0xb9, hi, lo, count, 0] => {
                assert_eq!(*count, 3); // receiver + int + reference
                u16::from_be_bytes([*hi, *lo])
            }
            other => panic!("unexpected encoding: {:?}", other),
        };
        assert!(constants
            .get_tagged(ConstantIndex(index), crate::class_file::Tag::InterfaceMethodRef)
            .is_ok());
    }
}
