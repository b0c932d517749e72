//! Script listings for the debug console and the binary's `--dump`
//! mode. Formatting is table-free on purpose: it only needs the
//! mnemonic map, not a constructed interpreter.

use crate::instruction::Instruction;
use crate::opcode_table::OpcodeTable;
use crate::script::{Script, ScriptStore};
use std::collections::HashMap;
use std::fmt::Write;

lazy_static! {
    /// Opcode number -> (mnemonic, arity)
    static ref MNEMONICS: HashMap<u32, (&'static str, u8)> = {
        let table = OpcodeTable::new();
        (0..table.len() as u32)
            .filter_map(|op| {
                table
                    .lookup(op, 0, 0)
                    .ok()
                    .map(|entry| (op, (entry.name, entry.arity)))
            })
            .collect()
    };
}

/// Format one instruction as `mnemonic arg, arg, ...`. Out-of-table
/// opcodes render as raw hex so corrupt scripts are still listable.
pub fn format_instruction(inst: &Instruction) -> String {
    let (name, arity) = match MNEMONICS.get(&inst.opcode) {
        Some((name, arity)) => (*name, *arity as usize),
        None => return format!("db 0x{:02X} ; not in table", inst.opcode),
    };

    let mut out = String::from(name);
    for (i, operand) in inst.operands.iter().take(arity).enumerate() {
        if i == 0 {
            out.push(' ');
        } else {
            out.push_str(", ");
        }
        write!(out, "{}", operand).unwrap();
    }
    out
}

/// List one script: header, then every line up to the last one that is
/// not zero-fill padding.
pub fn dump_script(script: &Script, index: usize) -> String {
    let last = script
        .lines
        .iter()
        .rposition(|inst| inst.opcode != 0 || inst.operands.iter().any(|o| o.raw != 0))
        .unwrap_or(0);

    let mut out = format!(
        "script {:<3} counter={} scratch=[{}, {}]\n",
        index, script.counter, script.scratch[0], script.scratch[1]
    );
    for (line, inst) in script.lines.iter().take(last + 1).enumerate() {
        writeln!(out, "  {:>4}: {}", line, format_instruction(inst)).unwrap();
    }
    let padding = script.lines.len() - (last + 1);
    if padding > 0 {
        writeln!(out, "  ... {} padded lines", padding).unwrap();
    }
    out
}

/// List the whole store
pub fn dump_store(store: &ScriptStore) -> String {
    let mut out = String::new();
    for (index, script) in store.scripts.iter().enumerate() {
        out.push_str(&dump_script(script, index));
        out.push('\n');
    }
    write!(out, "-- {} scripts", store.len()).unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Operand, OperandKind};
    use crate::script::Script;

    fn inst(opcode: u32, ops: &[(OperandKind, i32)]) -> Instruction {
        let mut inst = Instruction::zeroed();
        inst.opcode = opcode;
        for (i, (kind, raw)) in ops.iter().enumerate() {
            inst.operands[i] = Operand {
                kind: *kind,
                raw: *raw,
            };
        }
        inst
    }

    #[test]
    fn test_format_with_typed_operands() {
        let line = inst(
            0x0C,
            &[
                (OperandKind::Immediate, 4),
                (OperandKind::GlobalWord, 1),
                (OperandKind::CodePointer, 12),
            ],
        );
        assert_eq!(format_instruction(&line), "jump_if_world_flag 4, W[1], ->12");
    }

    #[test]
    fn test_format_out_of_table() {
        let line = inst(0xFE, &[]);
        assert_eq!(format_instruction(&line), "db 0xFE ; not in table");
    }

    #[test]
    fn test_dump_script_trims_padding() {
        let mut script = Script::empty();
        script.lines[0] = inst(0x09, &[(OperandKind::Immediate, 7)]);
        script.lines[1] = inst(0x00, &[]);
        let listing = dump_script(&script, 3);
        assert!(listing.starts_with("script 3"));
        assert!(listing.contains("0: set_world_flag 7"));
        assert!(listing.contains("padded lines"));
        // padding should not be listed line by line
        assert!(!listing.contains("  10:"));
    }
}
