//! SQL keyword completion.
//!
//! Given a partial cell and a cursor position, scan backward over
//! identifier characters to find the fragment under the cursor and propose
//! every keyword it prefixes. The keyword list is fixed, case-sensitive,
//! and reported in list order (not alphabetical, not ranked).

use serde::Serialize;

use crate::envelope::Status;

/// The completion vocabulary.
pub const SQL_KEYWORDS: [&str; 147] = [
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE",
    "AND", "AS", "ASC", "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN",
    "BETWEEN", "BY", "CASCADE", "CASE", "CAST", "CHECK", "COLLATE",
    "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
    "DATABASE", "DEFAULT", "DEFERRABLE", "DEFERRED", "DELETE", "DESC",
    "DETACH", "DISTINCT", "DO", "DROP", "EACH", "ELSE", "END", "ESCAPE",
    "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL",
    "GENERATED", "GLOB", "GROUP", "GROUPS", "HAVING", "IF", "IGNORE",
    "IMMEDIATE", "IN", "INDEX", "INDEXED", "INITIALLY", "INNER", "INSERT",
    "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY", "LAST",
    "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO",
    "NOT", "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON",
    "OR", "ORDER", "OTHERS", "OUTER", "OVER", "PARTITION", "PLAN",
    "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE",
    "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME",
    "REPLACE", "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS",
    "SAVEPOINT", "SELECT", "SET", "TABLE", "TEMP", "TEMPORARY", "THEN",
    "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED", "UNION", "UNIQUE",
    "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// Reply for one completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReply {
    pub status: Status,
    pub cursor_start: usize,
    pub cursor_end: usize,
    pub matches: Vec<&'static str>,
}

const fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Propose keyword completions for the identifier fragment ending at
/// `cursor_pos` (a byte offset; anything right of it is ignored).
#[must_use]
pub fn complete(raw_code: &str, cursor_pos: usize) -> CompletionReply {
    let cursor = cursor_pos.min(raw_code.len());
    let code = &raw_code.as_bytes()[..cursor];

    // cursor_start lands just after the last non-identifier byte.
    let cursor_start = code
        .iter()
        .rposition(|&byte| !is_identifier_byte(byte))
        .map_or(0, |pos| pos + 1);
    let fragment = String::from_utf8_lossy(&code[cursor_start..]);

    let matches = SQL_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| keyword.starts_with(fragment.as_ref()))
        .collect();

    CompletionReply {
        status: Status::Ok,
        cursor_start,
        cursor_end: cursor_pos,
        matches,
    }
}
