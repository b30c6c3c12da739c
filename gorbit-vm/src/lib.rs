//! GORBITSA virtual machine
//!
//! A one-accumulator machine over 256 bytes of data memory, running programs
//! held in a separate 256-slot instruction table.

pub mod runtime;

pub use runtime::machine::{Console, Dispatch, Fault, Machine, Op, State, Terminal, VmError};
pub use runtime::memory::{Memory, Program};
