//! Types and methods for reading track tables and writing output.

pub mod file;
pub mod table;

pub use file::{InputFile, OutputFile};
pub use table::{read_track_table, write_template, DEFAULT_FILE_COLUMN};
