//! Protocol revision identifiers.
//!
//! A revision selects the active opcode set and the validation rules applied
//! to bytecode containers. Revisions are totally ordered by activation.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod hardfork;

pub use hardfork::SpecId;
