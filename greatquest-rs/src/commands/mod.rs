//! Command implementations

pub mod track;
