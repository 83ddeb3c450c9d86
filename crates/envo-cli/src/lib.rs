//! Support code for the `biosample-envo` command-line tool.

pub mod io;
pub mod logging;
pub mod progress;
pub mod summary;
