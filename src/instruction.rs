use crate::script::ScriptError;
use crate::variables::Globals;
use std::fmt::{Display, Error, Formatter};

/// Operand slots per instruction (fixed, positional)
pub const MAX_OPERANDS: usize = 9;

/// Encoded size of one instruction record in bytes:
/// opcode word + 9 kind tags + 9 payloads, all 32-bit
pub const INSTRUCTION_SIZE: usize = 4 + MAX_OPERANDS * 4 + MAX_OPERANDS * 4;

/// Operand kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Literal constant carried in the payload
    Immediate,
    /// Index into the word plane of the global variable table
    GlobalWord,
    /// Index into the byte plane of the global variable table
    GlobalByte,
    /// Line offset into the current script, used as a jump target
    CodePointer,
}

impl OperandKind {
    /// Parse an operand kind from its blob tag. Tag 0 is the zero-fill
    /// padding value and decodes as an immediate.
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 | 1 => Some(OperandKind::Immediate),
            2 => Some(OperandKind::GlobalWord),
            3 => Some(OperandKind::GlobalByte),
            9 => Some(OperandKind::CodePointer),
            _ => None,
        }
    }
}

/// A typed operand slot. The payload is mutable at runtime: handlers use
/// their own slots as counters and remembered values across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operand {
    pub kind: OperandKind,
    pub raw: i32,
}

impl Operand {
    /// Resolve this operand to a value. Immediates and code pointers read
    /// the payload directly; variable references go through the table.
    pub fn resolve(&self, globals: &Globals) -> Result<i32, ScriptError> {
        match self.kind {
            OperandKind::Immediate | OperandKind::CodePointer => Ok(self.raw),
            OperandKind::GlobalWord => globals.word(self.raw),
            OperandKind::GlobalByte => globals.byte(self.raw),
        }
    }

    /// Store a value through this operand. Immediates and code pointers
    /// rewrite the slot in place; variable references write through to
    /// the table, leaving the slot (the index) untouched.
    pub fn store(&mut self, globals: &mut Globals, value: i32) -> Result<(), ScriptError> {
        match self.kind {
            OperandKind::Immediate | OperandKind::CodePointer => {
                self.raw = value;
                Ok(())
            }
            OperandKind::GlobalWord => globals.set_word(self.raw, value),
            OperandKind::GlobalByte => globals.set_byte(self.raw, value),
        }
    }
}

/// Cross-tick sub-state for opcodes that kick off an asynchronous action
/// and then poll it to completion. Runtime-only; never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPhase {
    /// The action has not been started (or has completed)
    #[default]
    Idle,
    /// The action was started on an earlier tick and is being polled
    Waiting,
}

/// A decoded script instruction: a fixed-shape record of one opcode word
/// and nine positional operand slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The raw opcode value
    pub opcode: u32,
    /// Operand slots (arity is declared by the opcode table, not here)
    pub operands: [Operand; MAX_OPERANDS],
    /// Async sub-state for the suspend-until-done opcodes
    pub phase: WaitPhase,
}

impl Instruction {
    /// Decode one fixed-width instruction record at `addr`. Unknown operand
    /// kind tags fail here, at load time; out-of-table opcodes do not (they
    /// surface as a recoverable error when the line is executed).
    pub fn decode(memory: &[u8], addr: usize) -> Result<Self, ScriptError> {
        if addr + INSTRUCTION_SIZE > memory.len() {
            return Err(ScriptError::BlobTruncated { offset: addr });
        }

        let opcode = read_u32(memory, addr);

        let mut kinds = [OperandKind::Immediate; MAX_OPERANDS];
        for (i, kind) in kinds.iter_mut().enumerate() {
            let offset = addr + 4 + i * 4;
            let tag = read_i32(memory, offset);
            *kind = OperandKind::from_tag(tag)
                .ok_or(ScriptError::UnknownOperandKind { tag, offset })?;
        }

        let mut operands = [Operand {
            kind: OperandKind::Immediate,
            raw: 0,
        }; MAX_OPERANDS];
        for (i, operand) in operands.iter_mut().enumerate() {
            operand.kind = kinds[i];
            operand.raw = read_i32(memory, addr + 4 + MAX_OPERANDS * 4 + i * 4);
        }

        Ok(Instruction {
            opcode,
            operands,
            phase: WaitPhase::Idle,
        })
    }

    /// An all-zero instruction, the padding value for unused script lines
    pub fn zeroed() -> Self {
        Instruction {
            opcode: 0,
            operands: [Operand {
                kind: OperandKind::Immediate,
                raw: 0,
            }; MAX_OPERANDS],
            phase: WaitPhase::Idle,
        }
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.kind {
            OperandKind::Immediate => write!(f, "{}", self.raw),
            OperandKind::GlobalWord => write!(f, "W[{}]", self.raw),
            OperandKind::GlobalByte => write!(f, "B[{}]", self.raw),
            OperandKind::CodePointer => write!(f, "->{}", self.raw),
        }
    }
}

fn read_u32(memory: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        memory[offset],
        memory[offset + 1],
        memory[offset + 2],
        memory[offset + 3],
    ])
}

fn read_i32(memory: &[u8], offset: usize) -> i32 {
    read_u32(memory, offset) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(opcode: u32, tags: [i32; MAX_OPERANDS], payloads: [i32; MAX_OPERANDS]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(INSTRUCTION_SIZE);
        bytes.extend_from_slice(&opcode.to_le_bytes());
        for tag in tags {
            bytes.extend_from_slice(&tag.to_le_bytes());
        }
        for payload in payloads {
            bytes.extend_from_slice(&payload.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(OperandKind::from_tag(0), Some(OperandKind::Immediate));
        assert_eq!(OperandKind::from_tag(1), Some(OperandKind::Immediate));
        assert_eq!(OperandKind::from_tag(2), Some(OperandKind::GlobalWord));
        assert_eq!(OperandKind::from_tag(3), Some(OperandKind::GlobalByte));
        assert_eq!(OperandKind::from_tag(9), Some(OperandKind::CodePointer));
        assert_eq!(OperandKind::from_tag(4), None);
        assert_eq!(OperandKind::from_tag(-1), None);
    }

    #[test]
    fn test_decode_typed_operands() {
        let bytes = encode(
            0x0C,
            [1, 2, 9, 0, 0, 0, 0, 0, 0],
            [42, 7, 12, 0, 0, 0, 0, 0, 0],
        );

        let inst = Instruction::decode(&bytes, 0).unwrap();
        assert_eq!(inst.opcode, 0x0C);
        assert_eq!(inst.operands[0].kind, OperandKind::Immediate);
        assert_eq!(inst.operands[0].raw, 42);
        assert_eq!(inst.operands[1].kind, OperandKind::GlobalWord);
        assert_eq!(inst.operands[1].raw, 7);
        assert_eq!(inst.operands[2].kind, OperandKind::CodePointer);
        assert_eq!(inst.operands[2].raw, 12);
        assert_eq!(inst.phase, WaitPhase::Idle);
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        let bytes = encode(
            0x01,
            [0, 5, 0, 0, 0, 0, 0, 0, 0],
            [0; MAX_OPERANDS],
        );

        match Instruction::decode(&bytes, 0) {
            Err(ScriptError::UnknownOperandKind { tag: 5, offset: 8 }) => {}
            other => panic!("expected UnknownOperandKind, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = encode(0, [0; MAX_OPERANDS], [0; MAX_OPERANDS]);
        assert!(matches!(
            Instruction::decode(&bytes[..40], 0),
            Err(ScriptError::BlobTruncated { .. })
        ));
    }

    #[test]
    fn test_resolve_and_store_immediate() {
        let mut globals = Globals::new(8, 8);
        let mut op = Operand {
            kind: OperandKind::Immediate,
            raw: 3,
        };
        assert_eq!(op.resolve(&globals).unwrap(), 3);
        op.store(&mut globals, 11).unwrap();
        assert_eq!(op.raw, 11);
    }

    #[test]
    fn test_resolve_and_store_global_word() {
        let mut globals = Globals::new(8, 8);
        globals.set_word(2, 99).unwrap();
        let mut op = Operand {
            kind: OperandKind::GlobalWord,
            raw: 2,
        };
        assert_eq!(op.resolve(&globals).unwrap(), 99);
        op.store(&mut globals, 17).unwrap();
        // the slot still holds the index; the table holds the value
        assert_eq!(op.raw, 2);
        assert_eq!(globals.word(2).unwrap(), 17);
    }
}
