//! Clipboard text, delimited files and worksheet exchange.

pub mod clipboard;
pub mod csv;
pub mod import;

pub use clipboard::{
    CellBlock, ClipCell, ClipboardChain, ClipboardSource, MemoryClipboard, parse_paste_buffer,
    split_csv_line, strip_enclosing_quotes,
};
#[cfg(feature = "system-clipboard")]
pub use clipboard::SystemClipboard;
pub use csv::{
    detect_delimiter, escape_csv_field, parse_delimited, parse_delimited_bytes, read_delimited,
    read_delimited_bytes, read_delimited_file, write_csv_file, write_delimited,
};
pub use import::{ExportedSheet, ImportedSheet, RawValue, Worksheet};
