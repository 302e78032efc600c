//! Request dispatch core for the sqlbook notebook kernel.
//!
//! One line of input is either a `%`-prefixed magic command (database
//! lifecycle and introspection) or raw SQL against the session's open
//! database. Query results are walked exactly once and rendered
//! simultaneously into plain text, HTML, and — on the chart path — a
//! column-oriented frame for the charting collaborator.
//!
//! The embedded engine, the chart-spec builder, and the client transport
//! are collaborators behind seams (`sqlbook-engine`, [`chart::ChartRenderer`],
//! [`interpreter::OutputSink`]); this crate owns classification, dispatch,
//! session lifecycle, and materialization.

pub mod chart;
pub mod complete;
pub mod envelope;
pub mod frame;
pub mod hooks;
pub mod interpreter;
pub mod magic;
pub mod pipeline;
pub mod session;
pub mod token;

pub use chart::{ChartRenderer, FrameDataRenderer};
pub use complete::{CompletionReply, SQL_KEYWORDS};
pub use envelope::{
    text_bundle, ErrorInfo, MimeBundle, ResultEnvelope, Status, CHART_SPEC, TEXT_HTML, TEXT_PLAIN,
};
pub use frame::ColumnarFrame;
pub use hooks::{HostHooks, SandboxHooks};
pub use interpreter::{Interpreter, KernelInfo, LanguageInfo, NullSink, OutputSink};
pub use magic::{MagicCommand, CHART_TRIGGER, MAGIC_SIGIL};
pub use session::{Session, MEMORY_PATH};
