//! Crate that contains EOF container types, validation and opcode constants.
//!
//! An EOF container wraps EVM bytecode in a structured envelope: a section
//! header table, one function type per code section, the code bodies, a data
//! body and optionally embedded sub-containers. [`eof::validate_eof`] decides
//! whether raw bytes form a well-formed container under a given protocol
//! revision.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc as std;

pub mod eof;
pub mod opcode;
pub mod utils;

pub use eof::{
    append_data_section, eof_version, is_eof_container, validate_eof, EofHeader,
    EofValidationError, FunctionType,
};
pub use opcode::OpCode;
