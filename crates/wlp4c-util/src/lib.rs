//! Shared vocabulary for the WLP4 toolchain crates.
//!
//! Holds the pieces every phase needs: the two-value WLP4 type lattice
//! (`DataType`) and the string interner used by the DFA and grammar loaders
//! to map symbol names to small integers once, at load time.

pub mod symbol;
pub mod types;

pub use symbol::{Interner, Symbol};
pub use types::DataType;
