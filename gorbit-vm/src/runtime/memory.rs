//! Data memory and the read-only program tables

/// Number of cells in data memory, and number of slots in a program
pub const MEM: usize = 256;

/// The pseudo-instruction appended after the last loaded instruction
pub const HALT: u8 = b'D';

/// Opcode byte held by slots that were never loaded
pub const ILLEGAL: u8 = 0x00;

/// The slot the dispatch loop never executes; reaching it halts the machine
pub const LAST_SLOT: u8 = (MEM - 1) as u8;

/// 256 bytes of zero-initialized data memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: [u8; MEM],
}

impl Memory {
    pub fn new() -> Self {
        Self { cells: [0; MEM] }
    }

    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.cells[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.cells[addr as usize] = value;
    }

    pub fn cells(&self) -> &[u8; MEM] {
        &self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Instruction table: one opcode byte and one operand byte per slot.
///
/// Produced once by a loader and read-only while the machine runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    opcode: [u8; MEM],
    operand: [u8; MEM],
    len: usize,
}

impl Program {
    pub fn new() -> Self {
        Self {
            opcode: [ILLEGAL; MEM],
            operand: [0; MEM],
            len: 0,
        }
    }

    /// Build a program from `(opcode, operand)` pairs, appending a halt when
    /// there is room for one. Pairs past the last slot are ignored.
    pub fn from_instructions(instructions: &[(u8, u8)]) -> Self {
        let mut program = Self::new();
        for (slot, &(opcode, operand)) in instructions.iter().take(MEM).enumerate() {
            program.set(slot as u8, opcode, operand);
        }

        if instructions.len() < MEM {
            program.set(instructions.len() as u8, HALT, 0);
        }

        program
    }

    #[inline]
    pub fn opcode_at(&self, pc: u8) -> u8 {
        self.opcode[pc as usize]
    }

    #[inline]
    pub fn operand_at(&self, pc: u8) -> u8 {
        self.operand[pc as usize]
    }

    pub fn set(&mut self, slot: u8, opcode: u8, operand: u8) {
        self.opcode[slot as usize] = opcode;
        self.operand[slot as usize] = operand;
        self.len = self.len.max(slot as usize + 1);
    }

    /// Number of slots filled, counting the appended halt
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
