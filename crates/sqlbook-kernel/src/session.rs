//! Session state and the magic-command dispatcher.
//!
//! One [`Session`] lives for the whole interpreter lifetime and owns the
//! single database handle. The lifecycle is an explicit closed/open state
//! machine: LOAD and CREATE replace the handle wholesale, DELETE closes it
//! and removes the backing file, and every other command is guarded on the
//! open state. Handles are released by scope on every path, including
//! failed transitions.

use std::fs;
use std::path::{Path, PathBuf};

use sqlbook_engine::{is_unencrypted, Database, DatabaseHeader, OpenMode};
use sqlbook_error::{Result, SqlbookError};
use tracing::{debug, info};

use crate::envelope::{text_bundle, MimeBundle};
use crate::hooks::SandboxHooks;
use crate::magic::MagicCommand;

/// Reserved path literal denoting a non-persistent database.
pub const MEMORY_PATH: &str = ":memory:";

/// Suffix appended to the database path to name the backup target.
const BACKUP_SUFFIX: &str = ".backup";

enum DatabaseState {
    Closed,
    Open(Database),
}

/// Per-interpreter session: the one open handle, its path, and the last
/// backup handle.
pub struct Session {
    state: DatabaseState,
    db_path: Option<String>,
    backup: Option<Database>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DatabaseState::Closed,
            db_path: None,
            backup: None,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, DatabaseState::Open(_))
    }

    /// The backing path established by the last LOAD/CREATE, if any.
    #[must_use]
    pub fn db_path(&self) -> Option<&str> {
        self.db_path.as_deref()
    }

    /// The open handle, or the precondition error every guarded command
    /// reports.
    pub fn database(&self) -> Result<&Database> {
        match &self.state {
            DatabaseState::Open(db) => Ok(db),
            DatabaseState::Closed => Err(SqlbookError::DatabaseNotLoaded),
        }
    }

    #[must_use]
    pub fn backup_handle(&self) -> Option<&Database> {
        self.backup.as_ref()
    }

    /// Execute one parsed magic command, returning its display bundle when
    /// the command produces one.
    pub fn dispatch(
        &mut self,
        command: &MagicCommand,
        hooks: &mut dyn SandboxHooks,
    ) -> Result<Option<MimeBundle>> {
        match command {
            MagicCommand::Load { path, mode } => {
                self.load(path, *mode)?;
                Ok(None)
            }
            MagicCommand::Create { path } => {
                self.create(path)?;
                Ok(None)
            }
            MagicCommand::Sync => hooks.sync().map(|message| Some(text_bundle(message))),
            MagicCommand::Fetch { url, path } => hooks
                .fetch(url, path)
                .map(|message| Some(text_bundle(message))),
            MagicCommand::Test => hooks.self_test().map(|message| Some(text_bundle(message))),
            MagicCommand::Delete => {
                self.delete()?;
                Ok(None)
            }
            MagicCommand::TableExists { name } => {
                let exists = self.database()?.table_exists(name)?;
                let message = if exists {
                    format!("The table {name} exists.")
                } else {
                    format!("The table {name} doesn't exist.")
                };
                Ok(Some(text_bundle(message)))
            }
            MagicCommand::LoadExtension { path, entry_point } => {
                self.database()?.load_extension(path, Some(entry_point))?;
                Ok(None)
            }
            MagicCommand::SetKey { key } => {
                self.database()?.set_key(key)?;
                Ok(None)
            }
            MagicCommand::Rekey { key } => {
                self.database()?.rekey(key)?;
                Ok(None)
            }
            MagicCommand::IsUnencrypted => {
                self.database()?;
                let path = self.known_path()?;
                let message = if is_unencrypted(path)? {
                    "The database is unencrypted."
                } else {
                    "The database is encrypted."
                };
                Ok(Some(text_bundle(message)))
            }
            MagicCommand::GetInfo => {
                // Guarded like the other introspection commands, but the
                // snapshot is read straight off disk, not via the handle.
                self.database()?;
                let header = DatabaseHeader::read_from_path(self.known_path()?)?;
                Ok(Some(text_bundle(header.to_string())))
            }
            MagicCommand::Backup { type_code } => {
                self.backup(type_code)?;
                Ok(None)
            }
            MagicCommand::Unknown { name } => {
                if self.is_open() {
                    // Documented quirk: unknown names fall through silently
                    // once a database is open.
                    debug!(command = %name, "unknown magic command ignored");
                    Ok(None)
                } else {
                    Err(SqlbookError::DatabaseNotLoaded)
                }
            }
        }
    }

    fn known_path(&self) -> Result<&str> {
        self.db_path.as_deref().ok_or(SqlbookError::PathNotKnown)
    }

    /// LOAD: validate the path, then open with the requested mode and
    /// replace any previously open handle.
    fn load(&mut self, path: &str, mode: OpenMode) -> Result<()> {
        if path != MEMORY_PATH && !Path::new(path).exists() {
            return Err(SqlbookError::PathNotFound {
                path: PathBuf::from(path),
            });
        }
        let db = Database::open(path, mode)?;
        info!(path, ?mode, "database loaded");
        self.db_path = Some(path.to_owned());
        self.state = DatabaseState::Open(db);
        Ok(())
    }

    /// CREATE: truncate/create the backing file, then open create+read-write.
    fn create(&mut self, path: &str) -> Result<()> {
        if path != MEMORY_PATH {
            fs::File::create(path)?;
        }
        let db = Database::open(path, OpenMode::Create)?;
        info!(path, "database created");
        self.db_path = Some(path.to_owned());
        self.state = DatabaseState::Open(db);
        Ok(())
    }

    /// DELETE: close the handle, then remove the backing file.
    fn delete(&mut self) -> Result<()> {
        self.database()?;
        // Close before removal so the file is not held open while unlinked.
        self.state = DatabaseState::Closed;
        if let Some(path) = self.db_path.as_deref() {
            if path != MEMORY_PATH {
                fs::remove_file(path).map_err(|_| SqlbookError::DeleteFailed {
                    path: PathBuf::from(path),
                })?;
            }
            info!(path, "database deleted");
        }
        Ok(())
    }

    /// BACKUP: validate the single-character type code, then run an online
    /// backup next to the backing file and retain the destination handle.
    fn backup(&mut self, type_code: &str) -> Result<()> {
        let db = self.database()?;
        if type_code.len() > 1 && type_code.as_bytes()[0] <= 1 {
            return Err(SqlbookError::InvalidBackupType {
                value: type_code.to_owned(),
            });
        }
        let dest = format!("{}{BACKUP_SUFFIX}", self.known_path()?);
        let handle = db.backup_to(&dest)?;
        info!(%dest, "backup written");
        self.backup = Some(handle);
        Ok(())
    }
}
