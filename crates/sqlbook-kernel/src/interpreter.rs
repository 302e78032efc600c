//! Top-level request orchestration.
//!
//! One request is fully processed before the next is accepted: sanitize,
//! tokenize, classify, dispatch magic and/or run SQL, assemble the result
//! envelope. Display data and error notifications also go out through the
//! [`OutputSink`] side channel before the envelope is returned, mirroring
//! how a kernel protocol layer consumes the core.

use tracing::debug;

use sqlbook_error::Result;

use crate::chart::{ChartRenderer, FrameDataRenderer};
use crate::complete::{self, CompletionReply};
use crate::envelope::{ErrorInfo, MimeBundle, ResultEnvelope, CHART_SPEC};
use crate::frame::ColumnarFrame;
use crate::hooks::{HostHooks, SandboxHooks};
use crate::magic::{self, MagicCommand};
use crate::pipeline;
use crate::session::Session;
use crate::token;

/// Receives display data and error notifications as they are produced.
pub trait OutputSink {
    fn publish_execution_result(&mut self, execution_id: u32, bundle: &MimeBundle);
    fn publish_execution_error(&mut self, info: &ErrorInfo);
}

/// Sink for callers that only want the returned envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn publish_execution_result(&mut self, _execution_id: u32, _bundle: &MimeBundle) {}
    fn publish_execution_error(&mut self, _info: &ErrorInfo) {}
}

/// Kernel identity block returned by [`Interpreter::kernel_info`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KernelInfo {
    pub implementation: &'static str,
    pub implementation_version: &'static str,
    pub banner: String,
    pub language_info: LanguageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LanguageInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub mimetype: &'static str,
    pub file_extension: &'static str,
    pub codemirror_mode: &'static str,
}

/// The interpreter: one session, its collaborators, and the request entry
/// points.
pub struct Interpreter {
    session: Session,
    hooks: Box<dyn SandboxHooks>,
    chart: Box<dyn ChartRenderer>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter with the host defaults: no sandbox hooks, passthrough
    /// chart rendering.
    #[must_use]
    pub fn new() -> Self {
        Self::with_collaborators(Box::new(HostHooks), Box::new(FrameDataRenderer))
    }

    #[must_use]
    pub fn with_collaborators(
        hooks: Box<dyn SandboxHooks>,
        chart: Box<dyn ChartRenderer>,
    ) -> Self {
        Self {
            session: Session::new(),
            hooks,
            chart,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Process one cell of input and build its envelope.
    ///
    /// Any failure in the magic or SQL steps aborts the remaining steps,
    /// is published through the sink, and collapses into the uniform
    /// error envelope.
    pub fn execute_request(
        &mut self,
        execution_id: u32,
        code: &str,
        sink: &mut dyn OutputSink,
    ) -> ResultEnvelope {
        let mut outputs = Vec::new();
        match self.run_request(execution_id, code, sink, &mut outputs) {
            Ok(()) => ResultEnvelope::ok(outputs),
            Err(error) => {
                let info = ErrorInfo::uniform(error.to_string());
                sink.publish_execution_error(&info);
                ResultEnvelope::error(outputs, info)
            }
        }
    }

    fn run_request(
        &mut self,
        execution_id: u32,
        code: &str,
        sink: &mut dyn OutputSink,
        outputs: &mut Vec<MimeBundle>,
    ) -> Result<()> {
        let sanitized = token::sanitize(code);
        let mut tokens = token::tokenize(&sanitized);

        if magic::is_magic(&tokens) {
            magic::strip_sigil(&mut tokens);

            let command = MagicCommand::parse(&tokens)?;
            debug!(?command, "dispatching magic command");
            if let Some(bundle) = self.session.dispatch(&command, self.hooks.as_mut())? {
                sink.publish_execution_result(execution_id, &bundle);
                outputs.push(bundle);
            }

            if magic::is_chart_request(&tokens) {
                let (config, sql_tokens) = magic::split_chart_sql(&tokens[1..]);
                // Token boundaries beyond whitespace are not preserved;
                // the embedded SQL is re-joined with single spaces.
                let sql = sql_tokens.join(" ");

                let mut frame = ColumnarFrame::new();
                let rendered =
                    pipeline::execute(self.session.database()?, &sql, Some(&mut frame))?;
                if let Some(rendered) = rendered {
                    let bundle = rendered.into_bundle();
                    sink.publish_execution_result(execution_id, &bundle);
                    outputs.push(bundle);
                }

                let spec = self.chart.render_chart(&config, &frame)?;
                let mut bundle = MimeBundle::new();
                bundle.insert(CHART_SPEC.to_owned(), spec);
                sink.publish_execution_result(execution_id, &bundle);
                outputs.push(bundle);
            }
        } else {
            // Plain SQL runs against the untouched raw string so literal
            // whitespace survives.
            let rendered = pipeline::execute(self.session.database()?, code, None)?;
            if let Some(rendered) = rendered {
                let bundle = rendered.into_bundle();
                sink.publish_execution_result(execution_id, &bundle);
                outputs.push(bundle);
            }
        }
        Ok(())
    }

    /// Keyword completion for a partial cell.
    #[must_use]
    pub fn complete(&self, raw_code: &str, cursor_pos: usize) -> CompletionReply {
        complete::complete(raw_code, cursor_pos)
    }

    #[must_use]
    pub fn kernel_info(&self) -> KernelInfo {
        KernelInfo {
            implementation: "sqlbook",
            implementation_version: env!("CARGO_PKG_VERSION"),
            banner: format!(
                "sqlbook: a notebook kernel for SQLite\nSQLite version: {}",
                sqlbook_engine::version()
            ),
            language_info: LanguageInfo {
                name: "sqlite3",
                version: sqlbook_engine::version(),
                mimetype: "text/x-sqlite3-console",
                file_extension: ".sqlite3-console",
                codemirror_mode: "sql",
            },
        }
    }

    /// Inspection is not implemented; the reply is always ok-and-empty.
    #[must_use]
    pub fn inspect(&self, _code: &str, _cursor_pos: usize, _detail_level: u8) -> serde_json::Value {
        serde_json::json!({ "status": "ok" })
    }

    /// Every cell is treated as complete; continuation is a client concern.
    #[must_use]
    pub fn is_complete(&self, _code: &str) -> serde_json::Value {
        serde_json::json!({ "status": "complete" })
    }
}
