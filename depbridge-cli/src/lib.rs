//! Library half of the `depbridge` binary: config file handling and the
//! text behind `explain` / `list-features`.

pub mod config;
pub mod explain;
