//! Dynamic SQL built only from allow-listed identifiers and bound values.

pub mod filter;
pub mod tables;
pub mod update;
pub mod value;
