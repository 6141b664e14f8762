//! Zip archive reading and extraction.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 records, central
//!   directory entries)
//! - [`parser`]: locates and parses the central directory through
//!   [`ReadAt`](crate::io::ReadAt)
//! - [`extractor`]: decodes entry data and writes it to disk
//!
//! STORED and DEFLATE entries are supported, including ZIP64 archives.
//! Encryption, multi-disk archives and other compression methods are not.

mod extractor;
mod parser;
mod structures;

pub use extractor::{ExtractSummary, ZipExtractor};
pub use parser::ZipParser;
pub use structures::*;
