// src/commands/mod.rs
pub mod common;
pub mod reference;
pub mod sweep;
