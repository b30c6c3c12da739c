use std::io::{self, Write};

use crate::runtime::machine::{Machine, Op};
use crate::runtime::memory::{MEM, Memory, Program};

/// Printable opcodes render as themselves, anything else as `$XX`
pub fn render_opcode(opcode: u8) -> String {
    if opcode.is_ascii_graphic() {
        (opcode as char).to_string()
    } else {
        format!("${:02X}", opcode)
    }
}

/// Print the disassembly of an instruction slot, in source form
pub fn disasm_instruction(program: &Program, pc: u8) -> String {
    format!(
        "{}{}",
        render_opcode(program.opcode_at(pc)),
        program.operand_at(pc)
    )
}

pub fn dump_program(
    program: &Program,
    start: usize,
    end: usize,
    w: &mut dyn Write,
) -> io::Result<()> {
    let end = end.min(MEM);
    let mut slot = start;
    while slot < end {
        write!(w, "{:03}: ", slot)?;

        let line_end = (slot + 8).min(end);
        for pc in slot..line_end {
            let pc = pc as u8;
            write!(
                w,
                "{:02X} {:02X} : {:<6}",
                program.opcode_at(pc),
                program.operand_at(pc),
                disasm_instruction(program, pc)
            )?;
        }

        writeln!(w)?;
        slot = line_end;
    }

    Ok(())
}

pub fn dump_memory(memory: &Memory, w: &mut dyn Write) -> io::Result<()> {
    for (row, cells) in memory.cells().chunks(16).enumerate() {
        write!(w, "{:02X}:", row * 16)?;
        for cell in cells {
            write!(w, " {:02X}", cell)?;
        }
        writeln!(w)?;
    }

    Ok(())
}

/// Describe the instruction just executed at `pc`, reading the machine after
/// it ran. `D` and illegal opcodes leave no trace line.
pub fn trace_line(mach: &Machine, pc: u8) -> Option<String> {
    let op = Op::try_from(mach.program.opcode_at(pc)).ok()?;
    let imm = mach.program.operand_at(pc);
    let ac = mach.ac;
    let pointee = mach.memory.read(imm);
    let m = op.mnemonic();

    let line = match op {
        Op::LOAD | Op::STORE => format!("{:03} Executed {}: Acc ({}) Imm ({})", pc, m, ac, imm),
        Op::LOAD_IND | Op::STORE_IND | Op::ACC_TO_MEM => format!(
            "{:03} Executed {}: Acc ({}) Imm ({}) [Imm] ({})",
            pc, m, ac, imm, pointee
        ),
        Op::READ | Op::ADD_IMM | Op::SET => format!("{:03} Executed {}: Acc ({})", pc, m, ac),
        Op::BRZ | Op::BRZ_IND => format!("--- Executed {}: PC ({})", m, mach.pc),
        Op::PRINT | Op::ADD | Op::READ_MEM | Op::PRINT_MEM | Op::XOR | Op::ADD_IND => {
            format!("{:03} Executed {}", pc, m)
        }
        Op::DONE => return None,
    };

    Some(line)
}
