use crate::code::{OpCode, OperandType};
use crate::descriptors::BaseType;
use crate::errors::Error;

/// Reference to a class or interface by internal name (eg. `java/lang/String`), or to an
/// array type by descriptor (eg. `[I`)
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeRef(pub String);

/// Reference to a field or method by declaring class, name, and descriptor
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

/// Constant loadable by the `ldc` family
#[derive(Clone, PartialEq, Debug)]
pub enum ConstOperand {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    Type(TypeRef),
}

impl ConstOperand {
    /// Whether the constant occupies two words (and so needs `ldc2_w`)
    pub fn is_double_width(&self) -> bool {
        matches!(self, ConstOperand::Long(_) | ConstOperand::Double(_))
    }
}

/// Identity of an instruction within its [`InstructionSequence`]
///
/// Branch and switch operands hold the target instruction itself (by id, not by offset), so
/// offsets can be computed in a fix-up pass after every size has stabilized.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct InstructionId(pub(crate) usize);

/// Jump table operand of `tableswitch`/`lookupswitch`
///
/// An empty `keys` list means the dense table form: `targets` covers the contiguous key range
/// starting at `low_value`. A non-empty `keys` list pairs up with `targets` for the sparse
/// form. Which shape gets encoded is decided by the opcode, not inferred from the keys.
#[derive(Clone, PartialEq, Debug)]
pub struct SwitchInfo {
    pub default_target: InstructionId,
    pub low_value: i32,
    pub keys: Vec<i32>,
    pub targets: Vec<InstructionId>,
}

impl SwitchInfo {
    pub fn high_value(&self) -> i32 {
        self.low_value + self.targets.len() as i32 - 1
    }
}

/// Source position marker attached to an instruction
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label(pub u32);

/// Operand of one instruction, typed by the opcode's [`OperandType`]
#[derive(Clone, PartialEq, Debug)]
pub enum Operand {
    None,
    PrimitiveType(BaseType),
    Type(TypeRef),
    TypeWithDimensions(TypeRef, u8),
    Method(MemberRef),
    Field(MemberRef),
    Branch(InstructionId),
    Byte(i8),
    Short(i16),
    Long(i64),
    Constant(ConstOperand),
    Switch(SwitchInfo),
    Local(u16),
    LocalConst(u16, i16),
}

/// Borrowed view of a single operand position (see [`Instruction::operand_at`])
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue<'a> {
    PrimitiveType(BaseType),
    Type(&'a TypeRef),
    Method(&'a MemberRef),
    Field(&'a MemberRef),
    Branch(InstructionId),
    Int(i32),
    Long(i64),
    Constant(&'a ConstOperand),
    Switch(&'a SwitchInfo),
    Local(u16),
}

/// One bytecode instruction: an opcode plus the operand its category calls for
///
/// Instructions are mutated in place during layout (the offset) and become effectively frozen
/// once the owning sequence has been assembled.
#[derive(Clone, PartialEq, Debug)]
pub struct Instruction {
    opcode: OpCode,
    operand: Operand,
    label: Option<Label>,
    offset: Option<u32>,
}

impl Instruction {
    /// Build an instruction, checking the operand against the opcode's declared category
    ///
    /// Incompatibilities fail here, at construction, rather than surfacing later during
    /// emission.
    pub fn new(opcode: OpCode, operand: Operand) -> Result<Instruction, Error> {
        let compatible = match (&operand, opcode.operand_type()) {
            (Operand::None, OperandType::None) => true,
            (Operand::PrimitiveType(_), OperandType::PrimitiveTypeCode) => true,
            (Operand::Type(_), OperandType::TypeReference) => true,
            (Operand::TypeWithDimensions(_, dimensions), OperandType::TypeReferenceU1) => {
                *dimensions >= 1
            }
            (Operand::Method(_), OperandType::MethodReference) => true,
            (Operand::Field(_), OperandType::FieldReference) => true,
            (Operand::Branch(_), OperandType::BranchTarget) => true,
            (Operand::Byte(_), OperandType::I1) => true,
            (Operand::Short(_), OperandType::I2) => true,
            (Operand::Long(_), OperandType::I8) => true,
            (Operand::Constant(constant), OperandType::Constant) => !constant.is_double_width(),
            (Operand::Constant(constant), OperandType::WideConstant) => {
                // `ldc2_w` loads the two-word constants, `ldc_w` everything else
                constant.is_double_width() == (opcode == OpCode::Ldc2W)
            }
            // Dense tables carry no keys; sparse tables pair every key with a target
            (Operand::Switch(info), OperandType::Switch) => match opcode {
                OpCode::LookupSwitch => info.keys.len() == info.targets.len(),
                _ => info.keys.is_empty(),
            },
            (Operand::Local(slot), OperandType::Local) => {
                opcode.is_wide() || *slot <= u8::MAX as u16
            }
            (Operand::LocalConst(slot, value), OperandType::LocalI1) => {
                *slot <= u8::MAX as u16
                    && *value >= i8::MIN as i16
                    && *value <= i8::MAX as i16
            }
            (Operand::LocalConst(_, _), OperandType::LocalI2) => true,
            _ => false,
        };

        if !compatible {
            return Err(Error::InvalidOperand(opcode));
        }
        Ok(Instruction {
            opcode,
            operand,
            label: None,
            offset: None,
        })
    }

    /// Shorthand for opcodes that take no operand
    pub fn simple(opcode: OpCode) -> Result<Instruction, Error> {
        Instruction::new(opcode, Operand::None)
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn label(&self) -> Option<Label> {
        self.label
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = Some(label);
    }

    /// Offset assigned by the most recent layout pass
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn set_offset(&mut self, offset: u32) {
        self.offset = Some(offset);
    }

    pub fn operand_count(&self) -> usize {
        match &self.operand {
            Operand::None => 0,
            Operand::TypeWithDimensions(_, _) | Operand::LocalConst(_, _) => 2,
            _ => 1,
        }
    }

    /// Retrieve one operand position
    pub fn operand_at(&self, index: usize) -> Result<OperandValue<'_>, Error> {
        let out_of_range = || Error::OperandOutOfRange {
            index,
            count: self.operand_count(),
        };
        if index >= self.operand_count() {
            return Err(out_of_range());
        }
        Ok(match (&self.operand, index) {
            (Operand::PrimitiveType(base), 0) => OperandValue::PrimitiveType(*base),
            (Operand::Type(type_ref), 0) => OperandValue::Type(type_ref),
            (Operand::TypeWithDimensions(type_ref, _), 0) => OperandValue::Type(type_ref),
            (Operand::TypeWithDimensions(_, dimensions), 1) => {
                OperandValue::Int(*dimensions as i32)
            }
            (Operand::Method(member), 0) => OperandValue::Method(member),
            (Operand::Field(member), 0) => OperandValue::Field(member),
            (Operand::Branch(target), 0) => OperandValue::Branch(*target),
            (Operand::Byte(value), 0) => OperandValue::Int(*value as i32),
            (Operand::Short(value), 0) => OperandValue::Int(*value as i32),
            (Operand::Long(value), 0) => OperandValue::Long(*value),
            (Operand::Constant(constant), 0) => OperandValue::Constant(constant),
            (Operand::Switch(info), 0) => OperandValue::Switch(info),
            (Operand::Local(slot), 0) => OperandValue::Local(*slot),
            (Operand::LocalConst(slot, _), 0) => OperandValue::Local(*slot),
            (Operand::LocalConst(_, value), 1) => OperandValue::Int(*value as i32),
            _ => return Err(out_of_range()),
        })
    }

    /// Exact encoded byte length of this instruction in its current state
    ///
    /// For switches the length includes the alignment padding implied by the instruction's
    /// current offset (no offset yet means no padding is assumed); for branches and locals it
    /// is decided by the opcode's wide flag. Everything else is fixed per category.
    pub fn size(&self) -> usize {
        let opcode_size = self.opcode.opcode_size();
        match self.opcode.operand_type() {
            OperandType::None => opcode_size,

            OperandType::PrimitiveTypeCode
            | OperandType::TypeReference
            | OperandType::TypeReferenceU1
            | OperandType::FieldReference
            | OperandType::I1
            | OperandType::I2
            | OperandType::I8
            | OperandType::Constant
            | OperandType::WideConstant
            | OperandType::LocalI1
            | OperandType::LocalI2 => opcode_size + self.opcode.operand_type().base_size(),

            OperandType::MethodReference => {
                let extra = match self.opcode {
                    // Count byte + zero for `invokeinterface`, two zero bytes for
                    // `invokedynamic`
                    OpCode::InvokeInterface | OpCode::InvokeDynamic => 2,
                    _ => 0,
                };
                opcode_size + OperandType::MethodReference.base_size() + extra
            }

            OperandType::BranchTarget => {
                opcode_size + if self.opcode.is_wide() { 4 } else { 2 }
            }

            OperandType::Local => opcode_size + if self.opcode.is_wide() { 2 } else { 1 },

            OperandType::Switch => {
                let padding = match self.offset {
                    Some(offset) => (4 - (offset as usize + 1) % 4) % 4,
                    None => 0,
                };
                let targets = match &self.operand {
                    Operand::Switch(info) => info.targets.len(),
                    _ => unreachable!("switch opcode with non-switch operand"),
                };
                match self.opcode {
                    // opcode + padding + default + low + high + targets
                    OpCode::TableSwitch => opcode_size + padding + (3 + targets) * 4,
                    // opcode + padding + default + pair count + match/offset pairs
                    _ => opcode_size + padding + 8 + targets * 8,
                }
            }
        }
    }

    /// Dispatch to the visitor callback matching this instruction's operand category
    pub fn accept<V: InstructionVisitor>(&self, visitor: &mut V) -> Result<(), Error> {
        if let Some(label) = self.label {
            visitor.visit_label(label)?;
        }
        match &self.operand {
            Operand::None => visitor.visit_no_operand(self.opcode),
            Operand::PrimitiveType(base) => visitor.visit_primitive_type(self.opcode, *base),
            Operand::Type(type_ref) => visitor.visit_type(self.opcode, type_ref),
            Operand::TypeWithDimensions(type_ref, dimensions) => {
                visitor.visit_type_with_dimensions(self.opcode, type_ref, *dimensions)
            }
            Operand::Method(member) => visitor.visit_method(self.opcode, member),
            Operand::Field(member) => visitor.visit_field(self.opcode, member),
            Operand::Branch(target) => visitor.visit_branch(self.opcode, *target),
            Operand::Byte(value) => visitor.visit_int(self.opcode, *value as i32),
            Operand::Short(value) => visitor.visit_int(self.opcode, *value as i32),
            Operand::Long(value) => visitor.visit_long(self.opcode, *value),
            Operand::Constant(constant) => visitor.visit_constant(self.opcode, constant),
            Operand::Switch(info) => visitor.visit_switch(self.opcode, info),
            Operand::Local(slot) => visitor.visit_local(self.opcode, *slot),
            Operand::LocalConst(slot, value) => {
                visitor.visit_local_int(self.opcode, *slot, *value)
            }
        }
    }
}

/// One callback per operand category
///
/// Emission and analysis passes (assembler, disassembler, size audits) implement this instead
/// of matching on [`Operand`] themselves, so new consumers never touch the instruction type.
pub trait InstructionVisitor {
    fn visit_label(&mut self, _label: Label) -> Result<(), Error> {
        Ok(())
    }
    fn visit_no_operand(&mut self, opcode: OpCode) -> Result<(), Error>;
    fn visit_primitive_type(&mut self, opcode: OpCode, base: BaseType) -> Result<(), Error>;
    fn visit_type(&mut self, opcode: OpCode, type_ref: &TypeRef) -> Result<(), Error>;
    fn visit_type_with_dimensions(
        &mut self,
        opcode: OpCode,
        type_ref: &TypeRef,
        dimensions: u8,
    ) -> Result<(), Error>;
    fn visit_method(&mut self, opcode: OpCode, member: &MemberRef) -> Result<(), Error>;
    fn visit_field(&mut self, opcode: OpCode, member: &MemberRef) -> Result<(), Error>;
    fn visit_branch(&mut self, opcode: OpCode, target: InstructionId) -> Result<(), Error>;
    fn visit_int(&mut self, opcode: OpCode, value: i32) -> Result<(), Error>;
    fn visit_long(&mut self, opcode: OpCode, value: i64) -> Result<(), Error>;
    fn visit_constant(&mut self, opcode: OpCode, constant: &ConstOperand) -> Result<(), Error>;
    fn visit_switch(&mut self, opcode: OpCode, info: &SwitchInfo) -> Result<(), Error>;
    fn visit_local(&mut self, opcode: OpCode, slot: u16) -> Result<(), Error>;
    fn visit_local_int(&mut self, opcode: OpCode, slot: u16, value: i16) -> Result<(), Error>;
}

struct Node {
    instruction: Instruction,
    previous: Option<InstructionId>,
    next: Option<InstructionId>,
}

/// Ordered, doubly-linked sequence of instructions forming one method body
///
/// Instructions live in the sequence and are addressed by [`InstructionId`]; branch operands
/// refer to those ids, so moving from construction to layout to assembly never needs offsets
/// to be known up front.
#[derive(Default)]
pub struct InstructionSequence {
    nodes: Vec<Node>,
}

impl InstructionSequence {
    pub fn new() -> InstructionSequence {
        InstructionSequence { nodes: vec![] }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append an instruction, linking it after the current tail
    pub fn push(&mut self, instruction: Instruction) -> InstructionId {
        let id = InstructionId(self.nodes.len());
        let previous = id.0.checked_sub(1).map(InstructionId);
        if let Some(previous) = previous {
            self.nodes[previous.0].next = Some(id);
        }
        self.nodes.push(Node {
            instruction,
            previous,
            next: None,
        });
        id
    }

    /// Reserve an id for an instruction that will be pushed later
    ///
    /// Forward branches need a target id before the target instruction exists; the
    /// placeholder is a `nop` that must be overwritten with [`InstructionSequence::replace`]
    /// before layout.
    pub fn push_placeholder(&mut self) -> InstructionId {
        self.push(Instruction {
            opcode: OpCode::Nop,
            operand: Operand::None,
            label: None,
            offset: None,
        })
    }

    /// Overwrite the instruction at an id, keeping its place in the order
    pub fn replace(&mut self, id: InstructionId, instruction: Instruction) {
        self.nodes[id.0].instruction = instruction;
    }

    pub fn get(&self, id: InstructionId) -> Option<&Instruction> {
        self.nodes.get(id.0).map(|node| &node.instruction)
    }

    pub fn get_mut(&mut self, id: InstructionId) -> Option<&mut Instruction> {
        self.nodes.get_mut(id.0).map(|node| &mut node.instruction)
    }

    pub fn previous(&self, id: InstructionId) -> Option<InstructionId> {
        self.nodes.get(id.0).and_then(|node| node.previous)
    }

    pub fn next(&self, id: InstructionId) -> Option<InstructionId> {
        self.nodes.get(id.0).and_then(|node| node.next)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstructionId, &Instruction)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (InstructionId(index), &node.instruction))
    }

    /// Assign offsets in one forward pass and return the total encoded size
    ///
    /// Each instruction's size is recomputed from the offset just assigned to it before
    /// moving on, which resolves the offset/size interdependency of switch padding without
    /// iteration: widening decisions are baked into the opcodes, so no later size can change
    /// an earlier one.
    pub fn layout(&mut self) -> u32 {
        let mut offset: u32 = 0;
        for node in &mut self.nodes {
            node.instruction.set_offset(offset);
            offset += node.instruction.size() as u32;
        }
        offset
    }
}
