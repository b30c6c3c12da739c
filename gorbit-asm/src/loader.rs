//! Loader for GORBITSA source
//!
//! Turns the lexed token stream into the instruction table the VM runs. Unknown
//! opcodes are kept as they are and only fault once they are executed.

use std::io;
use std::path::{Path, PathBuf};

use gorbit_vm::Program;
use gorbit_vm::runtime::memory::{HALT, MEM};
use thiserror::Error;
use tracing::debug;

use crate::lexer::Lexer;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open input file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error, program too big")]
    TooBig,
}

impl LoadError {
    /// Process exit status reported for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::Open { .. } => 3,
            LoadError::TooBig => 4,
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Load a program from source text.
///
/// The last slot is reserved, so a source with 256 or more instructions is
/// rejected. Otherwise a `D` follows the last instruction.
pub fn load(src: &[u8]) -> LoadResult<Program> {
    let mut program = Program::new();
    let mut slot = 0usize;

    for token in Lexer::new(src) {
        program.set(slot as u8, token.opcode, token.operand);

        slot += 1;
        if slot == MEM {
            debug!(pos = token.pos, "loader: program fills every slot");
            return Err(LoadError::TooBig);
        }
    }

    program.set(slot as u8, HALT, 0);
    debug!("loader: loaded {} instructions", slot);

    Ok(program)
}

pub fn load_file(path: &Path) -> LoadResult<Program> {
    let src = std::fs::read(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    load(&src)
}
