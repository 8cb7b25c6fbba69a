//! Shared helpers: logging setup, file IO and scratch directories

pub mod io;
pub mod logger;
pub mod scratch;

pub use io::{ensure_parent_dir, is_readable_file, move_file, read_file, write_file};
pub use logger::Logger;
pub use scratch::ScratchSpace;
