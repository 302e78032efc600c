//! On-disk database header snapshot.
//!
//! The first 100 bytes of a SQLite database file carry a fixed-layout,
//! big-endian header. GET_INFO reads it straight off disk, so the snapshot
//! works without an open handle and never touches the page cache.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use sqlbook_error::{Result, SqlbookError};

/// Length of the fixed database file header.
pub const HEADER_LEN: usize = 100;

/// The canonical magic string opening every unencrypted database file.
pub const FILE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Read-only snapshot of the database file header.
///
/// Field names and order follow the file-format documentation; produced on
/// demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseHeader {
    pub magic: String,
    pub page_size_bytes: u16,
    pub file_format_write_version: u8,
    pub file_format_read_version: u8,
    pub reserved_space_bytes: u8,
    pub max_embedded_payload_frac: u8,
    pub min_embedded_payload_frac: u8,
    pub leaf_payload_frac: u8,
    pub file_change_counter: u32,
    pub database_size_pages: u32,
    pub first_freelist_trunk_page: u32,
    pub total_freelist_pages: u32,
    pub schema_cookie: u32,
    pub schema_format_number: u32,
    pub default_page_cache_size_bytes: u32,
    pub largest_b_tree_page_number: u32,
    pub database_text_encoding: u32,
    pub user_version: u32,
    pub incremental_vacuum_mode: u32,
    pub application_id: u32,
    pub version_valid_for: u32,
    pub sqlite_version: u32,
}

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

impl DatabaseHeader {
    /// Decode a header from the first [`HEADER_LEN`] bytes of a file.
    #[must_use]
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Self {
        // The magic string is 15 printable characters plus a NUL.
        let magic = String::from_utf8_lossy(&bytes[0..15]).into_owned();
        Self {
            magic,
            page_size_bytes: u16::from_be_bytes([bytes[16], bytes[17]]),
            file_format_write_version: bytes[18],
            file_format_read_version: bytes[19],
            reserved_space_bytes: bytes[20],
            max_embedded_payload_frac: bytes[21],
            min_embedded_payload_frac: bytes[22],
            leaf_payload_frac: bytes[23],
            file_change_counter: be_u32(bytes, 24),
            database_size_pages: be_u32(bytes, 28),
            first_freelist_trunk_page: be_u32(bytes, 32),
            total_freelist_pages: be_u32(bytes, 36),
            schema_cookie: be_u32(bytes, 40),
            schema_format_number: be_u32(bytes, 44),
            default_page_cache_size_bytes: be_u32(bytes, 48),
            largest_b_tree_page_number: be_u32(bytes, 52),
            database_text_encoding: be_u32(bytes, 56),
            user_version: be_u32(bytes, 60),
            incremental_vacuum_mode: be_u32(bytes, 64),
            application_id: be_u32(bytes, 68),
            // Bytes 72..92 are reserved for expansion and must be zero.
            version_valid_for: be_u32(bytes, 92),
            sqlite_version: be_u32(bytes, 96),
        }
    }

    /// Read and decode the header of the database file at `path`.
    pub fn read_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let mut bytes = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = file.read(&mut bytes[filled..])?;
            if n == 0 {
                return Err(SqlbookError::ShortHeader {
                    expected: HEADER_LEN,
                    actual: filled,
                });
            }
            filled += n;
        }
        Ok(Self::parse(&bytes))
    }
}

impl std::fmt::Display for DatabaseHeader {
    /// The human-readable 22-line block served by GET_INFO.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Magic header string: {}", self.magic)?;
        writeln!(f, "Page size bytes: {}", self.page_size_bytes)?;
        writeln!(
            f,
            "File format write version: {}",
            self.file_format_write_version
        )?;
        writeln!(
            f,
            "File format read version: {}",
            self.file_format_read_version
        )?;
        writeln!(f, "Reserved space bytes: {}", self.reserved_space_bytes)?;
        writeln!(
            f,
            "Max embedded payload fraction {}",
            self.max_embedded_payload_frac
        )?;
        writeln!(
            f,
            "Min embedded payload fraction: {}",
            self.min_embedded_payload_frac
        )?;
        writeln!(f, "Leaf payload fraction: {}", self.leaf_payload_frac)?;
        writeln!(f, "File change counter: {}", self.file_change_counter)?;
        writeln!(f, "Database size pages: {}", self.database_size_pages)?;
        writeln!(
            f,
            "First freelist trunk page: {}",
            self.first_freelist_trunk_page
        )?;
        writeln!(
            f,
            "Total freelist trunk pages: {}",
            self.total_freelist_pages
        )?;
        writeln!(f, "Schema cookie: {}", self.schema_cookie)?;
        writeln!(f, "Schema format number: {}", self.schema_format_number)?;
        writeln!(
            f,
            "Default page cache size bytes: {}",
            self.default_page_cache_size_bytes
        )?;
        writeln!(
            f,
            "Largest B tree page number: {}",
            self.largest_b_tree_page_number
        )?;
        writeln!(
            f,
            "Database text encoding: {}",
            self.database_text_encoding
        )?;
        writeln!(f, "User version: {}", self.user_version)?;
        writeln!(
            f,
            "Incremental vaccum mode: {}",
            self.incremental_vacuum_mode
        )?;
        writeln!(f, "Application ID: {}", self.application_id)?;
        writeln!(f, "Version valid for: {}", self.version_valid_for)?;
        writeln!(f, "SQLite version: {}", self.sqlite_version)
    }
}
