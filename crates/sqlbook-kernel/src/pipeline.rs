//! SQL execution and result materialization.
//!
//! One statement, one forward-only pass. Each cell is fetched exactly once
//! as text and distributed to every active sink in the same iteration, so
//! the plain-text table, the HTML table, and the columnar frame can never
//! drift relative to each other. The frame sink is optional and only wired
//! up on the chart path.

use comfy_table::Table;
use sqlbook_engine::Database;
use sqlbook_error::Result;
use tracing::debug;

use crate::envelope::{MimeBundle, TEXT_HTML, TEXT_PLAIN};
use crate::frame::ColumnarFrame;

/// Finished tabular renderings of one result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResult {
    pub text_plain: String,
    pub text_html: String,
}

impl RenderedResult {
    /// Package both renderings as a display bundle.
    #[must_use]
    pub fn into_bundle(self) -> MimeBundle {
        let mut bundle = MimeBundle::new();
        bundle.insert(TEXT_PLAIN.to_owned(), self.text_plain.into());
        bundle.insert(TEXT_HTML.to_owned(), self.text_html.into());
        bundle
    }
}

/// Run `sql` against the open database.
///
/// Statements declaring zero result columns are executed to completion for
/// their side effects and produce no tabular output. Otherwise the result
/// set is walked exactly once, building all renderings simultaneously; on a
/// mid-iteration engine error nothing is returned and the caller discards
/// any partially populated frame.
pub fn execute(
    db: &Database,
    sql: &str,
    mut frame: Option<&mut ColumnarFrame>,
) -> Result<Option<RenderedResult>> {
    if sql.trim().is_empty() {
        return Ok(None);
    }

    let mut stmt = db.prepare(sql)?;
    let column_count = stmt.column_count();
    if column_count == 0 {
        let changed = stmt.execute()?;
        debug!(changed, "statement executed for effect");
        return Ok(None);
    }

    let names = stmt.column_names();

    let mut plain_table = Table::new();
    plain_table.set_header(names.clone());

    let mut html = String::from("<table>\n<tr>\n");
    for name in &names {
        html.push_str("<th>");
        html.push_str(name);
        html.push_str("</th>\n");
    }
    html.push_str("</tr>\n");

    if let Some(frame) = frame.as_deref_mut() {
        for name in &names {
            frame.add_column(name);
        }
    }

    let mut row_count = 0usize;
    let mut rows = stmt.query()?;
    while let Some(row) = rows.next_row()? {
        html.push_str("<tr>\n");
        let mut text_row = Vec::with_capacity(column_count);
        for col in 0..column_count {
            let cell = row.cell_text(col)?;

            html.push_str("<td>");
            html.push_str(&cell);
            html.push_str("</td>\n");

            if let Some(frame) = frame.as_deref_mut() {
                frame.push_cell(col, cell.clone());
            }

            text_row.push(cell);
        }
        html.push_str("</tr>\n");
        plain_table.add_row(text_row);
        row_count += 1;
    }
    html.push_str("</table>");

    debug!(rows = row_count, columns = column_count, "result set rendered");
    Ok(Some(RenderedResult {
        text_plain: plain_table.to_string(),
        text_html: html,
    }))
}
