//! Process-level helpers for the binary

pub mod logging;
