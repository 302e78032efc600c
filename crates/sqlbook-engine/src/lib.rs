//! Embedded relational engine surface for sqlbook.
//!
//! Thin ergonomic wrapper over `rusqlite` exposing exactly what the kernel
//! dispatch core consumes: handle-open with mode flags, statement
//! preparation and forward-only stepping with textual column access, table
//! existence checks, extension loading, key management, online backup, and
//! the static header/encryption inspectors that work from a path alone.
//!
//! Engine-reported failures are propagated with their original messages;
//! the kernel does not reinterpret them.

mod header;

use std::path::Path;
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{LoadExtensionGuard, OpenFlags};
use sqlbook_error::{Result, SqlbookError};
use tracing::debug;

pub use header::{DatabaseHeader, FILE_MAGIC, HEADER_LEN};

/// How a database handle is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, reads only. Write statements fail at the engine.
    ReadOnly,
    /// Existing file, reads and writes.
    ReadWrite,
    /// Create the file if missing, then read-write.
    Create,
}

impl OpenMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            Self::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            Self::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            Self::Create => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }
}

/// An open database handle.
///
/// Dropping the handle closes the underlying connection; there is no
/// separate close step on any exit path.
pub struct Database {
    conn: rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open the database at `path` with the given mode.
    pub fn open(path: &str, mode: OpenMode) -> Result<Self> {
        debug!(path, ?mode, "opening database");
        let conn =
            rusqlite::Connection::open_with_flags(path, mode.flags()).map_err(engine_error)?;
        Ok(Self {
            conn,
            path: path.to_owned(),
        })
    }

    /// The path this handle was opened with.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Compile `sql` into a statement ready for execution or stepping.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        let inner = self.conn.prepare(sql).map_err(engine_error)?;
        Ok(Statement { inner })
    }

    /// Whether a table with this exact name exists in the main schema.
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .map_err(engine_error)?;
        stmt.exists([name]).map_err(engine_error)
    }

    /// Load a run-time loadable extension.
    pub fn load_extension(&self, path: &str, entry_point: Option<&str>) -> Result<()> {
        debug!(path, ?entry_point, "loading extension");
        // SAFETY: extension loading executes the library's init routine; the
        // guard re-disables loading on every exit path.
        unsafe {
            let _guard = LoadExtensionGuard::new(&self.conn).map_err(engine_error)?;
            self.conn
                .load_extension(path, entry_point)
                .map_err(engine_error)
        }
    }

    /// Apply an encryption key to the handle (delegated to the engine; a
    /// no-op on builds without a codec).
    pub fn set_key(&self, key: &str) -> Result<()> {
        self.conn
            .pragma_update(None, "key", key)
            .map_err(engine_error)
    }

    /// Change the encryption key on the handle.
    pub fn rekey(&self, key: &str) -> Result<()> {
        self.conn
            .pragma_update(None, "rekey", key)
            .map_err(engine_error)
    }

    /// Run an online backup of this database into a fresh database file at
    /// `dest_path`, returning the destination handle.
    pub fn backup_to(&self, dest_path: &str) -> Result<Self> {
        debug!(dest_path, "running online backup");
        let mut dest = Self::open(dest_path, OpenMode::Create)?;
        {
            let backup =
                rusqlite::backup::Backup::new(&self.conn, &mut dest.conn).map_err(engine_error)?;
            backup
                .run_to_completion(64, Duration::ZERO, None)
                .map_err(engine_error)?;
        }
        Ok(dest)
    }
}

/// A compiled statement borrowed from its [`Database`].
#[derive(Debug)]
pub struct Statement<'conn> {
    inner: rusqlite::Statement<'conn>,
}

impl Statement<'_> {
    /// Number of columns the statement declares. Zero for statements that
    /// produce no result set (DDL/DML without RETURNING).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.inner.column_count()
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.inner
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Execute a side-effecting statement to completion.
    pub fn execute(&mut self) -> Result<usize> {
        self.inner.execute([]).map_err(engine_error)
    }

    /// Begin stepping the result set.
    pub fn query(&mut self) -> Result<Rows<'_>> {
        let inner = self.inner.query([]).map_err(engine_error)?;
        Ok(Rows { inner })
    }
}

/// Forward-only cursor over a statement's result rows.
pub struct Rows<'stmt> {
    inner: rusqlite::Rows<'stmt>,
}

impl Rows<'_> {
    /// Advance to the next row, or `None` once the set is exhausted.
    pub fn next_row(&mut self) -> Result<Option<RowView<'_>>> {
        match self.inner.next() {
            Ok(Some(row)) => Ok(Some(RowView { inner: row })),
            Ok(None) => Ok(None),
            Err(error) => Err(engine_error(error)),
        }
    }
}

/// Borrowed view of the current row.
pub struct RowView<'rows> {
    inner: &'rows rusqlite::Row<'rows>,
}

impl RowView<'_> {
    /// The cell at `idx` rendered as text.
    pub fn cell_text(&self, idx: usize) -> Result<String> {
        let value = self.inner.get_ref(idx).map_err(engine_error)?;
        Ok(value_to_text(value))
    }
}

/// Textual representation used by every output sink. NULL renders as the
/// empty string, matching the engine binding the kernel grew up against.
fn value_to_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(blob) => String::from_utf8_lossy(blob).into_owned(),
    }
}

/// Whether the file at `path` starts with the cleartext database magic.
///
/// A zero-length file counts as unencrypted: that is what a freshly created
/// backing file looks like before the first page is written.
pub fn is_unencrypted(path: impl AsRef<Path>) -> Result<bool> {
    use std::io::Read;

    let mut file = std::fs::File::open(path.as_ref())?;
    let mut magic = [0u8; 16];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == FILE_MAGIC),
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(file.metadata()?.len() == 0)
        }
        Err(error) => Err(error.into()),
    }
}

/// Version string of the linked engine.
#[must_use]
pub fn version() -> &'static str {
    rusqlite::version()
}

fn engine_error(error: rusqlite::Error) -> SqlbookError {
    SqlbookError::query(error.to_string())
}
