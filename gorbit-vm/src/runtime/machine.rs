#![allow(non_camel_case_types)]

//! Core of the GORBITSA VM
//! Our VM is a single accumulator machine which executes a table of two-byte instructions

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::{debug, trace};

use crate::runtime::disasm;
use crate::runtime::memory::{LAST_SLOT, MEM, Memory, Program};

/// What a read instruction stores once the input is exhausted: -1 truncated to a byte
pub const EOF: u8 = -1i8 as u8;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Direct
    LOAD = b'G',    // acc = mem[imm]
    STORE = b'O',   // mem[imm] = acc
    READ = b'R',    // acc = input
    BRZ = b'B',     // if acc == 0, goto imm
    ADD_IMM = b'I', // acc += imm
    PRINT = b'T',   // output acc
    SET = b'S',     // acc = imm
    ADD = b'A',     // acc += mem[imm]

    // Indirect
    LOAD_IND = b'g',   // acc = mem[mem[imm]]
    STORE_IND = b'o',  // mem[mem[imm]] = acc
    READ_MEM = b'r',   // mem[imm] = input
    BRZ_IND = b'b',    // if acc == 0, goto mem[imm]
    ACC_TO_MEM = b'i', // mem[imm] += acc
    PRINT_MEM = b't',  // output mem[imm]
    XOR = b's',        // acc ^= mem[imm]
    ADD_IND = b'a',    // acc += mem[mem[imm]]

    DONE = b'D',
}

impl Op {
    pub fn mnemonic(self) -> char {
        self as u8 as char
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'G' => Ok(Op::LOAD),
            b'O' => Ok(Op::STORE),
            b'R' => Ok(Op::READ),
            b'B' => Ok(Op::BRZ),
            b'I' => Ok(Op::ADD_IMM),
            b'T' => Ok(Op::PRINT),
            b'S' => Ok(Op::SET),
            b'A' => Ok(Op::ADD),
            b'g' => Ok(Op::LOAD_IND),
            b'o' => Ok(Op::STORE_IND),
            b'r' => Ok(Op::READ_MEM),
            b'b' => Ok(Op::BRZ_IND),
            b'i' => Ok(Op::ACC_TO_MEM),
            b't' => Ok(Op::PRINT_MEM),
            b's' => Ok(Op::XOR),
            b'a' => Ok(Op::ADD_IND),
            b'D' => Ok(Op::DONE),
            _ => Err(byte),
        }
    }
}

/// An attempt to execute a byte that is not an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "Attempt to execute illegal instruction at program counter {pc}. Accumulator: {ac}. Instruction: {}{operand}",
    opcode_text(.opcode)
)]
pub struct Fault {
    pub pc: u8,
    pub ac: u8,
    pub opcode: u8,
    pub operand: u8,
}

fn opcode_text(opcode: &u8) -> String {
    disasm::render_opcode(*opcode)
}

#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("console i/o failed")]
    Io(#[from] io::Error),
}

/// Character I/O as seen by the read and print instructions
pub trait Console {
    /// Next input byte, or `None` once the input is exhausted
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Emit one byte. It must be visible before the next instruction runs.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
}

/// A console over any pair of byte streams
#[derive(Debug)]
pub struct Terminal<R, W> {
    pub input: R,
    pub output: W,
}

impl<R: Read, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: Read, W: Write> Console for Terminal<R, W> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.write_all(&[byte])?;
        self.output.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running { pc: u8, ac: u8 },
    Halted,
    Faulted(Fault),
}

/// How the next instruction's semantics are selected.
///
/// Both strategies run inside the same loop and are observably identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Decode into an [`Op`] and `match` on it
    #[default]
    Switch,
    /// Index a 256-entry handler table with the raw opcode byte
    Table,
}

impl Dispatch {
    pub const ALL: [Dispatch; 2] = [Dispatch::Switch, Dispatch::Table];
}

/// Where control goes after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Branch(u8),
    Halt,
}

type Handler = fn(&mut Machine, u8, &mut dyn Console) -> Result<Flow, VmError>;

const HANDLERS: [Handler; MEM] = {
    let mut table = [Machine::illegal as Handler; MEM];

    table[Op::LOAD as usize] = Machine::load;
    table[Op::STORE as usize] = Machine::store;
    table[Op::READ as usize] = Machine::read;
    table[Op::BRZ as usize] = Machine::brz;
    table[Op::ADD_IMM as usize] = Machine::add_imm;
    table[Op::PRINT as usize] = Machine::print;
    table[Op::SET as usize] = Machine::set;
    table[Op::ADD as usize] = Machine::add;

    table[Op::LOAD_IND as usize] = Machine::load_ind;
    table[Op::STORE_IND as usize] = Machine::store_ind;
    table[Op::READ_MEM as usize] = Machine::read_mem;
    table[Op::BRZ_IND as usize] = Machine::brz_ind;
    table[Op::ACC_TO_MEM as usize] = Machine::acc_to_mem;
    table[Op::PRINT_MEM as usize] = Machine::print_mem;
    table[Op::XOR as usize] = Machine::xor;
    table[Op::ADD_IND as usize] = Machine::add_ind;

    table[Op::DONE as usize] = Machine::done;

    table
};

#[derive(Debug, Clone)]
pub struct Machine {
    pub pc: u8, // program counter, a slot index
    pub ac: u8, // accumulator

    pub memory: Memory,
    pub program: Program,

    state: State,
    dispatch: Dispatch,
    steps: u64,
}

impl Machine {
    pub fn new(program: Program) -> Self {
        Self {
            pc: 0,
            ac: 0,
            memory: Memory::new(),
            program,
            state: State::Running { pc: 0, ac: 0 },
            dispatch: Dispatch::default(),
            steps: 0,
        }
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Instructions executed so far, including a final `D`
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    // Instruction semantics
    // --------------------------------------

    fn load(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = self.memory.read(imm);
        Ok(Flow::Next)
    }

    fn store(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.memory.write(imm, self.ac);
        Ok(Flow::Next)
    }

    fn read(&mut self, _imm: u8, console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = console.read_byte()?.unwrap_or(EOF);
        Ok(Flow::Next)
    }

    fn brz(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        if self.ac == 0 {
            return Ok(Flow::Branch(imm));
        }
        Ok(Flow::Next)
    }

    fn add_imm(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = self.ac.wrapping_add(imm);
        Ok(Flow::Next)
    }

    fn print(&mut self, _imm: u8, console: &mut dyn Console) -> Result<Flow, VmError> {
        console.write_byte(self.ac)?;
        Ok(Flow::Next)
    }

    fn set(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = imm;
        Ok(Flow::Next)
    }

    fn add(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = self.ac.wrapping_add(self.memory.read(imm));
        Ok(Flow::Next)
    }

    fn load_ind(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = self.memory.read(self.memory.read(imm));
        Ok(Flow::Next)
    }

    fn store_ind(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        let addr = self.memory.read(imm);
        self.memory.write(addr, self.ac);
        Ok(Flow::Next)
    }

    fn read_mem(&mut self, imm: u8, console: &mut dyn Console) -> Result<Flow, VmError> {
        let byte = console.read_byte()?.unwrap_or(EOF);
        self.memory.write(imm, byte);
        Ok(Flow::Next)
    }

    fn brz_ind(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        if self.ac == 0 {
            return Ok(Flow::Branch(self.memory.read(imm)));
        }
        Ok(Flow::Next)
    }

    fn acc_to_mem(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        let value = self.memory.read(imm).wrapping_add(self.ac);
        self.memory.write(imm, value);
        Ok(Flow::Next)
    }

    fn print_mem(&mut self, imm: u8, console: &mut dyn Console) -> Result<Flow, VmError> {
        console.write_byte(self.memory.read(imm))?;
        Ok(Flow::Next)
    }

    fn xor(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac ^= self.memory.read(imm);
        Ok(Flow::Next)
    }

    fn add_ind(&mut self, imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        self.ac = self
            .ac
            .wrapping_add(self.memory.read(self.memory.read(imm)));
        Ok(Flow::Next)
    }

    fn done(&mut self, _imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        Ok(Flow::Halt)
    }

    fn illegal(&mut self, _imm: u8, _console: &mut dyn Console) -> Result<Flow, VmError> {
        Err(self.fault().into())
    }

    fn fault(&self) -> Fault {
        Fault {
            pc: self.pc,
            ac: self.ac,
            opcode: self.program.opcode_at(self.pc),
            operand: self.program.operand_at(self.pc),
        }
    }

    fn execute(&mut self, op: Op, imm: u8, console: &mut dyn Console) -> Result<Flow, VmError> {
        match op {
            Op::LOAD => self.load(imm, console),
            Op::STORE => self.store(imm, console),
            Op::READ => self.read(imm, console),
            Op::BRZ => self.brz(imm, console),
            Op::ADD_IMM => self.add_imm(imm, console),
            Op::PRINT => self.print(imm, console),
            Op::SET => self.set(imm, console),
            Op::ADD => self.add(imm, console),

            Op::LOAD_IND => self.load_ind(imm, console),
            Op::STORE_IND => self.store_ind(imm, console),
            Op::READ_MEM => self.read_mem(imm, console),
            Op::BRZ_IND => self.brz_ind(imm, console),
            Op::ACC_TO_MEM => self.acc_to_mem(imm, console),
            Op::PRINT_MEM => self.print_mem(imm, console),
            Op::XOR => self.xor(imm, console),
            Op::ADD_IND => self.add_ind(imm, console),

            Op::DONE => self.done(imm, console),
        }
    }

    // Dispatch
    // --------------------------------------

    fn fetch_execute(&mut self, console: &mut dyn Console) -> Result<Flow, VmError> {
        let opcode = self.program.opcode_at(self.pc);
        let imm = self.program.operand_at(self.pc);

        match self.dispatch {
            Dispatch::Switch => match Op::try_from(opcode) {
                Ok(op) => self.execute(op, imm, console),
                Err(_) => Err(self.fault().into()),
            },
            Dispatch::Table => HANDLERS[opcode as usize](self, imm, console),
        }
    }

    /// Move to the next slot. A branch lands one slot before its target so the
    /// shared increment reaches it; slot 255 is never executed.
    fn advance(&mut self, flow: Flow) {
        match flow {
            Flow::Halt => {
                self.state = State::Halted;
                return;
            }
            Flow::Branch(target) => self.pc = target.wrapping_sub(1),
            Flow::Next => {}
        }

        self.pc = self.pc.wrapping_add(1);
        self.state = if self.pc >= LAST_SLOT {
            State::Halted
        } else {
            State::Running {
                pc: self.pc,
                ac: self.ac,
            }
        };
    }

    /// Execute one instruction. A machine that has stopped stays stopped.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<State, VmError> {
        if !self.is_running() {
            return Ok(self.state);
        }

        let flow = match self.fetch_execute(console) {
            Ok(flow) => flow,
            Err(VmError::Fault(fault)) => {
                debug!(pc = fault.pc, ac = fault.ac, opcode = fault.opcode, "machine faulted");
                self.state = State::Faulted(fault);
                return Err(fault.into());
            }
            Err(e) => return Err(e),
        };

        self.steps += 1;
        self.advance(flow);
        trace!(pc = self.pc, ac = self.ac, "step");

        Ok(self.state)
    }

    /// Like [`Machine::step`], then describe the executed instruction on `sink`
    pub fn step_traced(
        &mut self,
        console: &mut dyn Console,
        sink: &mut dyn Write,
    ) -> Result<State, VmError> {
        if !self.is_running() {
            return Ok(self.state);
        }

        let pc = self.pc;
        let state = self.step(console)?;

        if let Some(line) = disasm::trace_line(self, pc) {
            writeln!(sink, "{}", line)?;
        }

        Ok(state)
    }

    /// Run until the machine halts or faults
    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), VmError> {
        debug!(dispatch = ?self.dispatch, slots = self.program.len(), "run: starting");

        while let State::Running { .. } = self.step(console)? {}

        debug!(steps = self.steps, ac = self.ac, "run: halted");
        Ok(())
    }

    pub fn run_traced(
        &mut self,
        console: &mut dyn Console,
        sink: &mut dyn Write,
    ) -> Result<(), VmError> {
        debug!(dispatch = ?self.dispatch, slots = self.program.len(), "run: starting with trace");

        while let State::Running { .. } = self.step_traced(console, sink)? {}

        debug!(steps = self.steps, ac = self.ac, "run: halted");
        Ok(())
    }

    pub fn dump_ctx(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "------------------------------------------------------------")?;
        writeln!(
            w,
            "pc: {:03}\tac: {:02X}\tsteps: {}\tstate: {:?}",
            self.pc, self.ac, self.steps, self.state
        )?;
        writeln!(w, "------------------------------------------------------------")?;

        let start = (self.pc as usize).saturating_sub(8) & !7;
        disasm::dump_program(&self.program, start, start + 32, w)?;
        disasm::dump_memory(&self.memory, w)
    }
}
