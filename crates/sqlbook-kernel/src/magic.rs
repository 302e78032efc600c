//! Magic-command classification and parsing.
//!
//! A cell is "magic" when its first token carries the `%` sigil. The token
//! sequence is parsed once into the closed [`MagicCommand`] set; dispatch is
//! a single exhaustive match in the session module, so there is no open
//! string-comparison chain to fall through by accident. Command names match
//! case-insensitively; arguments are taken positionally and verbatim.

use sqlbook_engine::OpenMode;
use sqlbook_error::{Result, SqlbookError};

/// Leading sigil distinguishing meta-commands from SQL.
pub const MAGIC_SIGIL: char = '%';

/// Command name that additionally requests chart rendering.
pub const CHART_TRIGGER: &str = "XVEGA_PLOT";

/// Tokens that start the embedded SQL statement on the chart path.
const SQL_STATEMENT_HEADS: [&str; 3] = ["SELECT", "WITH", "VALUES"];

/// True iff the input classifies as a meta-command.
#[must_use]
pub fn is_magic(tokens: &[String]) -> bool {
    tokens
        .first()
        .is_some_and(|token| token.starts_with(MAGIC_SIGIL))
}

/// Remove the sigil from the first token. Call only after [`is_magic`].
pub fn strip_sigil(tokens: &mut [String]) {
    if let Some(first) = tokens.first_mut() {
        if first.starts_with(MAGIC_SIGIL) {
            first.remove(0);
        }
    }
}

/// True iff the (sigil-stripped) input additionally requests a chart.
#[must_use]
pub fn is_chart_request(tokens: &[String]) -> bool {
    tokens
        .first()
        .is_some_and(|token| token.eq_ignore_ascii_case(CHART_TRIGGER))
}

/// Partition the tokens after the chart trigger into (chart-config, SQL).
///
/// The SQL portion starts at the first token that case-insensitively equals
/// a SQL statement head (SELECT, WITH, VALUES); everything before it is
/// chart configuration. Total over any token sequence: with no statement
/// head present, the SQL portion is empty.
#[must_use]
pub fn split_chart_sql(tokens: &[String]) -> (Vec<String>, Vec<String>) {
    let boundary = tokens
        .iter()
        .position(|token| {
            SQL_STATEMENT_HEADS
                .iter()
                .any(|head| token.eq_ignore_ascii_case(head))
        })
        .unwrap_or(tokens.len());
    (tokens[..boundary].to_vec(), tokens[boundary..].to_vec())
}

/// The closed set of administrative commands.
///
/// `Unknown` carries anything else so the dispatcher can apply the
/// documented fallthrough rule instead of erroring at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MagicCommand {
    Load { path: String, mode: OpenMode },
    Create { path: String },
    Delete,
    Sync,
    Fetch { url: String, path: String },
    Test,
    TableExists { name: String },
    LoadExtension { path: String, entry_point: String },
    SetKey { key: String },
    Rekey { key: String },
    IsUnencrypted,
    GetInfo,
    Backup { type_code: String },
    Unknown { name: String },
}

fn required<'t>(
    tokens: &'t [String],
    index: usize,
    command: &'static str,
    what: &'static str,
) -> Result<&'t str> {
    tokens
        .get(index)
        .map(String::as_str)
        .ok_or(SqlbookError::MissingArgument { command, what })
}

/// Resolve the LOAD open mode from the full token sequence.
///
/// An explicit `rw`/`r` mode token wins; otherwise anything shorter than
/// four tokens defaults to read-write, and longer input with no recognized
/// mode is rejected.
fn load_mode(tokens: &[String]) -> Result<OpenMode> {
    match tokens.get(2).map(String::as_str) {
        Some("rw") => Ok(OpenMode::ReadWrite),
        Some("r") => Ok(OpenMode::ReadOnly),
        _ if tokens.len() < 4 => Ok(OpenMode::ReadWrite),
        _ => Err(SqlbookError::InvalidOpenMode),
    }
}

impl MagicCommand {
    /// Parse a sigil-stripped token sequence into a command.
    ///
    /// Matching is case-insensitive on the command name only; arguments are
    /// taken verbatim from the following tokens.
    pub fn parse(tokens: &[String]) -> Result<Self> {
        let Some(name) = tokens.first() else {
            return Ok(Self::Unknown {
                name: String::new(),
            });
        };

        let command = match name.to_ascii_uppercase().as_str() {
            "LOAD" => Self::Load {
                path: required(tokens, 1, "LOAD", "a database path")?.to_owned(),
                mode: load_mode(tokens)?,
            },
            "CREATE" => Self::Create {
                path: required(tokens, 1, "CREATE", "a database path")?.to_owned(),
            },
            "DELETE" => Self::Delete,
            "SYNC" => Self::Sync,
            "FETCH" => Self::Fetch {
                url: required(tokens, 1, "FETCH", "a source URL")?.to_owned(),
                path: required(tokens, 2, "FETCH", "a destination path")?.to_owned(),
            },
            "TEST" => Self::Test,
            "TABLE_EXISTS" => Self::TableExists {
                name: required(tokens, 1, "TABLE_EXISTS", "a table name")?.to_owned(),
            },
            "LOAD_EXTENSION" => Self::LoadExtension {
                path: required(tokens, 1, "LOAD_EXTENSION", "an extension path")?.to_owned(),
                entry_point: required(tokens, 2, "LOAD_EXTENSION", "an entry point")?.to_owned(),
            },
            "SET_KEY" => Self::SetKey {
                key: required(tokens, 1, "SET_KEY", "a key")?.to_owned(),
            },
            "REKEY" => Self::Rekey {
                key: required(tokens, 1, "REKEY", "a key")?.to_owned(),
            },
            "IS_UNENCRYPTED" => Self::IsUnencrypted,
            "GET_INFO" => Self::GetInfo,
            "BACKUP" => Self::Backup {
                type_code: required(tokens, 1, "BACKUP", "a type code")?.to_owned(),
            },
            _ => Self::Unknown {
                name: name.clone(),
            },
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        is_chart_request, is_magic, split_chart_sql, strip_sigil, MagicCommand, MAGIC_SIGIL,
    };
    use sqlbook_engine::OpenMode;
    use sqlbook_error::SqlbookError;

    fn toks(input: &[&str]) -> Vec<String> {
        input.iter().map(|t| (*t).to_owned()).collect()
    }

    #[test]
    fn test_is_magic_requires_leading_sigil() {
        assert!(is_magic(&toks(&["%LOAD", "x.db"])));
        assert!(!is_magic(&toks(&["SELECT", "1"])));
        assert!(!is_magic(&[]));
        assert_eq!(MAGIC_SIGIL, '%');
    }

    #[test]
    fn test_strip_sigil_removes_one_leading_character() {
        let mut tokens = toks(&["%load", "x.db"]);
        strip_sigil(&mut tokens);
        assert_eq!(tokens, toks(&["load", "x.db"]));
    }

    #[test]
    fn test_parse_is_case_insensitive_on_name_only() {
        let command = MagicCommand::parse(&toks(&["load", "Mixed.DB"])).unwrap();
        assert_eq!(
            command,
            MagicCommand::Load {
                path: "Mixed.DB".to_owned(),
                mode: OpenMode::ReadWrite,
            }
        );
    }

    #[test]
    fn test_parse_load_modes() {
        let rw = MagicCommand::parse(&toks(&["LOAD", "a.db", "rw"])).unwrap();
        let ro = MagicCommand::parse(&toks(&["LOAD", "a.db", "r"])).unwrap();
        assert!(matches!(
            rw,
            MagicCommand::Load {
                mode: OpenMode::ReadWrite,
                ..
            }
        ));
        assert!(matches!(
            ro,
            MagicCommand::Load {
                mode: OpenMode::ReadOnly,
                ..
            }
        ));

        let error = MagicCommand::parse(&toks(&["LOAD", "a.db", "bogus", "extra"]))
            .expect_err("four tokens without a recognized mode should fail");
        assert!(matches!(error, SqlbookError::InvalidOpenMode));
    }

    #[test]
    fn test_parse_missing_argument() {
        let error = MagicCommand::parse(&toks(&["TABLE_EXISTS"]))
            .expect_err("TABLE_EXISTS needs a name");
        assert!(matches!(error, SqlbookError::MissingArgument { .. }));
    }

    #[test]
    fn test_parse_unknown_is_not_an_error() {
        let command = MagicCommand::parse(&toks(&["FROBNICATE", "hard"])).unwrap();
        assert_eq!(
            command,
            MagicCommand::Unknown {
                name: "FROBNICATE".to_owned(),
            }
        );
    }

    #[test]
    fn test_chart_request_after_sigil_strip() {
        let mut tokens = toks(&["%xvega_plot", "X_FIELD", "a", "SELECT", "*", "FROM", "t"]);
        strip_sigil(&mut tokens);
        assert!(is_chart_request(&tokens));

        let (config, sql) = split_chart_sql(&tokens[1..]);
        assert_eq!(config, toks(&["X_FIELD", "a"]));
        assert_eq!(sql, toks(&["SELECT", "*", "FROM", "t"]));
    }

    #[test]
    fn test_split_without_statement_head_is_all_config() {
        let tokens = toks(&["WIDTH", "300", "HEIGHT", "200"]);
        let (config, sql) = split_chart_sql(&tokens);
        assert_eq!(config.len(), 4);
        assert!(sql.is_empty());
    }
}
