//! Command implementations for the Authority CLI

pub mod serve;
pub mod servers;
