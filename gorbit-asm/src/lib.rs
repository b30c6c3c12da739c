//! Source loading and the command line front end for the GORBITSA VM

pub mod lexer;
pub mod loader;

pub use loader::{LoadError, load, load_file};
