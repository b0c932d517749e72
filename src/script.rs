use crate::instruction::{Instruction, INSTRUCTION_SIZE};
use log::debug;
use std::fmt;

/// Fixed line capacity of a compiled script; the compiler pads every
/// script to this length
pub const MAX_SCRIPT_LINES: usize = 161;

/// Encoded size of one script record: the padded instruction array plus
/// the trailing scalar metadata
pub const SCRIPT_SIZE: usize = MAX_SCRIPT_LINES * INSTRUCTION_SIZE + 3 * 4;

/// Errors raised while loading or executing scene scripts
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// Opcode value past the end of the dispatch table. Recoverable: the
    /// offending script is aborted and the queue moves on.
    InvalidOpcode {
        opcode: u32,
        script: usize,
        line: usize,
    },
    /// Unrecognized operand kind tag in the blob. Fatal at load time,
    /// since it means the script dialect is not one we understand.
    UnknownOperandKind { tag: i32, offset: usize },
    /// The blob ended before the declared contents did
    BlobTruncated { offset: usize },
    /// Current line ran past the script's instruction array
    LineOutOfRange { script: usize, line: usize },
    /// Global variable reference outside the configured table
    VariableOutOfRange { index: i32 },
    /// A line operation was attempted with no script on the processor.
    /// This is a host-contract violation, not a script defect.
    NoCurrentScript,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::InvalidOpcode {
                opcode,
                script,
                line,
            } => write!(
                f,
                "invalid opcode 0x{:02X} in script {} line {}",
                opcode, script, line
            ),
            ScriptError::UnknownOperandKind { tag, offset } => write!(
                f,
                "unknown operand kind tag {} at blob offset 0x{:X}",
                tag, offset
            ),
            ScriptError::BlobTruncated { offset } => {
                write!(f, "script blob truncated at offset 0x{:X}", offset)
            }
            ScriptError::LineOutOfRange { script, line } => {
                write!(f, "line {} out of range in script {}", line, script)
            }
            ScriptError::VariableOutOfRange { index } => {
                write!(f, "global variable index {} out of range", index)
            }
            ScriptError::NoCurrentScript => write!(f, "no current script on the processor"),
        }
    }
}

impl std::error::Error for ScriptError {}

/// One compiled scene script: a fixed-capacity instruction array plus a
/// few scalar cells that persist across runs of the script within the
/// current scene.
#[derive(Debug, Clone)]
pub struct Script {
    /// The padded instruction array (always MAX_SCRIPT_LINES long when
    /// loaded from a blob)
    pub lines: Vec<Instruction>,
    /// Repeat counter used by the staged-reveal opcode
    pub counter: i32,
    /// Scratch cells written and compared by dedicated opcodes
    pub scratch: [i32; 2],
}

impl Script {
    /// Decode one script record at `addr`
    pub fn decode(memory: &[u8], addr: usize) -> Result<Self, ScriptError> {
        if addr + SCRIPT_SIZE > memory.len() {
            return Err(ScriptError::BlobTruncated { offset: addr });
        }

        let mut lines = Vec::with_capacity(MAX_SCRIPT_LINES);
        for i in 0..MAX_SCRIPT_LINES {
            lines.push(Instruction::decode(memory, addr + i * INSTRUCTION_SIZE)?);
        }

        let trailer = addr + MAX_SCRIPT_LINES * INSTRUCTION_SIZE;
        Ok(Script {
            lines,
            counter: read_i32(memory, trailer),
            scratch: [read_i32(memory, trailer + 4), read_i32(memory, trailer + 8)],
        })
    }

    /// An empty script padded with zeroed (Return) lines; handy for tests
    /// and for hosts that assemble scripts in memory.
    pub fn empty() -> Self {
        Script {
            lines: vec![Instruction::zeroed(); MAX_SCRIPT_LINES],
            counter: 0,
            scratch: [0; 2],
        }
    }
}

/// All scripts for the current scene, loaded in bulk and destroyed en
/// masse on scene teardown.
#[derive(Default)]
pub struct ScriptStore {
    pub scripts: Vec<Script>,
}

impl ScriptStore {
    pub fn new() -> Self {
        ScriptStore {
            scripts: Vec::new(),
        }
    }

    /// Parse a count-prefixed script blob. Pure: no execution side
    /// effects, and every operand kind tag is validated here rather than
    /// mid-execution.
    pub fn load(memory: &[u8]) -> Result<Self, ScriptError> {
        if memory.len() < 8 {
            return Err(ScriptError::BlobTruncated { offset: 0 });
        }

        let declared_size = read_i32(memory, 0) as usize;
        let count = read_i32(memory, 4) as usize;

        if declared_size != memory.len() {
            debug!(
                "blob declares {} bytes but carries {}",
                declared_size,
                memory.len()
            );
        }

        let mut scripts = Vec::with_capacity(count);
        for i in 0..count {
            scripts.push(Script::decode(memory, 8 + i * SCRIPT_SIZE)?);
        }

        debug!("loaded {} scene scripts", scripts.len());
        Ok(ScriptStore { scripts })
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// Drop every script (scene teardown)
    pub fn clear(&mut self) {
        self.scripts.clear();
    }
}

fn read_i32(memory: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        memory[offset],
        memory[offset + 1],
        memory[offset + 2],
        memory[offset + 3],
    ])
}
