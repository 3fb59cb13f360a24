//! Process-level services shared by the binary and the web layer:
//! command line / environment configuration and logger setup.

pub mod config;
pub mod logging;
