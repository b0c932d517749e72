#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod disasm;
pub mod instruction;
pub mod interpreter;
pub mod opcode_table;
pub mod opcodes_actor;
pub mod opcodes_flow;
pub mod opcodes_scene;
pub mod opcodes_sound;
pub mod queue;
pub mod rng;
pub mod script;
pub mod trace;
pub mod variables;
pub mod world;

#[cfg(test)]
mod interpreter_tests;

/*
Scene script blob layout (all fields little-endian):

        +0000   total payload size in bytes (u32)
        +0004   script count (u32)
        +0008   script records, 12248 bytes each:
                  161 instruction records of 76 bytes:
                    opcode (u32)
                    9 operand kind tags (i32 each)
                    9 operand payloads (i32 each)
                  counter (i32)
                  scratch[0] (i32)
                  scratch[1] (i32)

Compiled scripts always pad to the full 161 lines; unused lines are
zero-filled, which decodes as Return with immediate-zero operands.
*/
