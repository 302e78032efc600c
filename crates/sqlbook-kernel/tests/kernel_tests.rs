//! Behavior tests for the sqlbook dispatch core, driven through the public
//! interpreter entry points against live databases.

use std::cell::RefCell;
use std::rc::Rc;

use sqlbook_kernel::{
    ChartRenderer, ColumnarFrame, Interpreter, NullSink, ResultEnvelope, TEXT_HTML, TEXT_PLAIN,
};

// ===========================================================================
// 1. HELPERS
// ===========================================================================

fn run(interpreter: &mut Interpreter, code: &str) -> ResultEnvelope {
    interpreter.execute_request(0, code, &mut NullSink)
}

fn run_ok(interpreter: &mut Interpreter, code: &str) -> ResultEnvelope {
    let envelope = run(interpreter, code);
    assert!(
        envelope.is_ok(),
        "expected success for {code:?}, got {:?}",
        envelope.error
    );
    envelope
}

/// Chart collaborator that records what the kernel feeds it.
#[derive(Default, Clone)]
struct CapturingRenderer {
    calls: Rc<RefCell<Vec<(Vec<String>, ColumnarFrame)>>>,
}

impl ChartRenderer for CapturingRenderer {
    fn render_chart(
        &self,
        config_tokens: &[String],
        frame: &ColumnarFrame,
    ) -> sqlbook_error::Result<serde_json::Value> {
        self.calls
            .borrow_mut()
            .push((config_tokens.to_vec(), frame.clone()));
        Ok(serde_json::json!({ "captured": true }))
    }
}

fn interpreter_with_capture() -> (Interpreter, CapturingRenderer) {
    let renderer = CapturingRenderer::default();
    let interpreter = Interpreter::with_collaborators(
        Box::new(sqlbook_kernel::HostHooks),
        Box::new(renderer.clone()),
    );
    (interpreter, renderer)
}

// ===========================================================================
// 2. REPRESENTATION AGREEMENT
// ===========================================================================

#[test]
fn all_three_representations_report_identical_cells() {
    let (mut interpreter, renderer) = interpreter_with_capture();
    run_ok(&mut interpreter, "%CREATE :memory:");
    run_ok(&mut interpreter, "CREATE TABLE m (a TEXT, b TEXT)");
    run_ok(
        &mut interpreter,
        "INSERT INTO m VALUES ('r1a', 'r1b'), ('r2a', 'r2b'), ('r3a', 'r3b')",
    );

    let envelope = run_ok(
        &mut interpreter,
        "%XVEGA_PLOT SELECT a, b FROM m ORDER BY a",
    );

    // The chart path publishes the tabular bundle and then the chart spec.
    assert_eq!(envelope.outputs.len(), 2);
    let tabular = &envelope.outputs[0];
    let plain = tabular[TEXT_PLAIN].as_str().expect("plain text expected");
    let html = tabular[TEXT_HTML].as_str().expect("html expected");

    let calls = renderer.calls.borrow();
    let (_, frame) = &calls[0];
    assert_eq!(frame.column_names(), vec!["a", "b"]);
    assert_eq!(frame.row_count(), 3);

    // Same dimensions in every rendering.
    assert_eq!(html.matches("<th>").count(), 2);
    assert_eq!(html.matches("<td>").count(), 6);
    assert_eq!(html.matches("<tr>").count(), 4);

    // Same cell values at every position.
    for (row, (cell_a, cell_b)) in [("r1a", "r1b"), ("r2a", "r2b"), ("r3a", "r3b")]
        .iter()
        .enumerate()
    {
        assert_eq!(frame.column("a").unwrap()[row], *cell_a);
        assert_eq!(frame.column("b").unwrap()[row], *cell_b);
        assert!(plain.contains(cell_a) && plain.contains(cell_b));
        assert!(html.contains(&format!("<td>{cell_a}</td>")));
        assert!(html.contains(&format!("<td>{cell_b}</td>")));
    }
}

#[test]
fn frame_column_order_follows_select_not_chart_config() {
    let (mut interpreter, renderer) = interpreter_with_capture();
    run_ok(&mut interpreter, "%CREATE :memory:");
    run_ok(&mut interpreter, "CREATE TABLE t (x INTEGER, y INTEGER)");
    run_ok(&mut interpreter, "INSERT INTO t VALUES (1, 2)");

    run_ok(
        &mut interpreter,
        "%XVEGA_PLOT Y_FIELD x X_FIELD y SELECT y, x FROM t",
    );

    let calls = renderer.calls.borrow();
    let (config, frame) = &calls[0];
    assert_eq!(config, &["Y_FIELD", "x", "X_FIELD", "y"]);
    assert_eq!(frame.column_names(), vec!["y", "x"]);
}

// ===========================================================================
// 3. LIFECYCLE & OPEN MODES
// ===========================================================================

#[test]
fn load_with_and_without_rw_mode_are_equivalent() {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("modes.db");
    let path = path.to_str().unwrap();

    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, &format!("%CREATE {path}"));
    run_ok(&mut interpreter, "CREATE TABLE t (x)");

    run_ok(&mut interpreter, &format!("%LOAD {path}"));
    run_ok(&mut interpreter, "INSERT INTO t VALUES (1)");

    run_ok(&mut interpreter, &format!("%LOAD {path} rw"));
    run_ok(&mut interpreter, "INSERT INTO t VALUES (2)");
}

#[test]
fn load_read_only_rejects_writes() {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("ro.db");
    let path = path.to_str().unwrap();

    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, &format!("%CREATE {path}"));
    run_ok(&mut interpreter, "CREATE TABLE t (x)");

    run_ok(&mut interpreter, &format!("%LOAD {path} r"));
    let envelope = run(&mut interpreter, "INSERT INTO t VALUES (1)");
    assert!(!envelope.is_ok(), "write through read-only load must fail");

    // Reads still work.
    let envelope = run_ok(&mut interpreter, "SELECT count(*) FROM t");
    assert!(envelope.first_text().unwrap().contains('0'));
}

#[test]
fn load_missing_path_reports_io_error() {
    let mut interpreter = Interpreter::new();
    let envelope = run(&mut interpreter, "%LOAD nowhere/missing.db");
    let error = envelope.error.expect("error expected");
    assert_eq!(error.evalue, "The path doesn't exist.");
}

#[test]
fn delete_before_any_load_is_a_precondition_failure() {
    let mut interpreter = Interpreter::new();
    let envelope = run(&mut interpreter, "%DELETE");
    let error = envelope.error.expect("error expected");
    assert_eq!(error.evalue, "Load a database to run this command.");
    assert_eq!(
        error.traceback,
        vec!["Error: Load a database to run this command."]
    );
}

#[test]
fn create_memory_then_delete_skips_the_filesystem() {
    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, "%CREATE :memory:");
    assert!(interpreter.session().is_open());
    assert!(!std::path::Path::new(":memory:").exists());

    run_ok(&mut interpreter, "%DELETE");
    assert!(!interpreter.session().is_open());
}

// ===========================================================================
// 4. MAGIC INTROSPECTION & QUIRKS
// ===========================================================================

#[test]
fn table_exists_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("test.db");
    let path = path.to_str().unwrap();

    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, &format!("%CREATE {path}"));

    let envelope = run_ok(&mut interpreter, "%TABLE_EXISTS foo");
    assert_eq!(
        envelope.first_text().unwrap(),
        "The table foo doesn't exist."
    );

    run_ok(&mut interpreter, "CREATE TABLE foo (x)");
    let envelope = run_ok(&mut interpreter, "%TABLE_EXISTS foo");
    assert_eq!(envelope.first_text().unwrap(), "The table foo exists.");
}

#[test]
fn backup_with_low_ordinal_multichar_code_is_invalid() {
    // Dispatched below the tokenizer: a code whose first byte is ordinal 1
    // cannot survive sanitizing, but the dispatcher must still reject it.
    use sqlbook_kernel::{HostHooks, MagicCommand, Session};

    let mut session = Session::new();
    session
        .dispatch(
            &MagicCommand::Create {
                path: ":memory:".to_owned(),
            },
            &mut HostHooks,
        )
        .expect("CREATE :memory: should succeed");

    let error = session
        .dispatch(
            &MagicCommand::Backup {
                type_code: "\u{1}zz".to_owned(),
            },
            &mut HostHooks,
        )
        .expect_err("low ordinal with extra characters is invalid");
    assert_eq!(error.to_string(), "This is not a valid backup type.");
}

#[test]
fn backup_with_single_character_code_writes_a_sibling_file() {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("tobackup.db");
    let path_str = path.to_str().unwrap();

    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, &format!("%CREATE {path_str}"));
    run_ok(&mut interpreter, "CREATE TABLE t (x)");
    run_ok(&mut interpreter, "%BACKUP s");

    assert!(dir.path().join("tobackup.db.backup").exists());
}

#[test]
fn magic_name_matching_is_case_insensitive() {
    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, "%create :memory:");
    run_ok(&mut interpreter, "CREATE TABLE c (x)");
    let envelope = run_ok(&mut interpreter, "%table_exists c");
    assert_eq!(envelope.first_text().unwrap(), "The table c exists.");
}

#[test]
fn unknown_magic_is_silent_once_open_and_an_error_before() {
    let mut interpreter = Interpreter::new();

    let envelope = run(&mut interpreter, "%WAT");
    assert!(!envelope.is_ok());

    run_ok(&mut interpreter, "%CREATE :memory:");
    let envelope = run_ok(&mut interpreter, "%WAT");
    assert!(envelope.outputs.is_empty());
}

#[test]
fn get_info_renders_the_header_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("info.db");
    let path = path.to_str().unwrap();

    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, &format!("%CREATE {path}"));
    run_ok(&mut interpreter, "CREATE TABLE t (x)");

    let envelope = run_ok(&mut interpreter, "%GET_INFO");
    let text = envelope.first_text().unwrap();
    assert!(text.starts_with("Magic header string: SQLite format 3"));
    assert!(text.contains("Page size bytes: "));
    assert!(text.contains("SQLite version: "));
}

#[test]
fn is_unencrypted_reports_cleartext_databases() {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("clear.db");
    let path = path.to_str().unwrap();

    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, &format!("%CREATE {path}"));
    run_ok(&mut interpreter, "CREATE TABLE t (x)");

    let envelope = run_ok(&mut interpreter, "%IS_UNENCRYPTED");
    assert_eq!(
        envelope.first_text().unwrap(),
        "The database is unencrypted."
    );
}

// ===========================================================================
// 5. SQL PATH & ERROR ENVELOPES
// ===========================================================================

#[test]
fn plain_sql_uses_the_raw_cell_text() {
    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, "%CREATE :memory:");
    run_ok(&mut interpreter, "CREATE TABLE s (v TEXT)");
    // Two spaces inside the literal must survive to the engine.
    run_ok(&mut interpreter, "INSERT INTO s VALUES ('a  b')");

    let envelope = run_ok(&mut interpreter, "SELECT v FROM s");
    assert!(envelope.first_text().unwrap().contains("a  b"));
}

#[test]
fn engine_errors_keep_their_message_in_the_envelope() {
    let mut interpreter = Interpreter::new();
    run_ok(&mut interpreter, "%CREATE :memory:");
    let envelope = run(&mut interpreter, "SELECT * FROM missing_table");
    let error = envelope.error.expect("error expected");
    assert_eq!(error.ename, "Error");
    assert!(error.evalue.contains("missing_table"));
}

#[test]
fn failed_magic_step_suppresses_the_chart_step() {
    let (mut interpreter, renderer) = interpreter_with_capture();
    // No database loaded: the XVEGA_PLOT token hits the dispatcher first
    // and fails the open-database guard, so the chart never renders.
    let envelope = run(&mut interpreter, "%XVEGA_PLOT X_FIELD a SELECT 1");
    assert!(!envelope.is_ok());
    assert!(envelope.outputs.is_empty());
    assert!(renderer.calls.borrow().is_empty());
}

#[test]
fn completion_proposes_prefixed_keywords() {
    let interpreter = Interpreter::new();

    let reply = interpreter.complete("SEL", 3);
    assert_eq!(reply.cursor_start, 0);
    assert_eq!(reply.cursor_end, 3);
    assert!(reply.matches.contains(&"SELECT"));
    assert!(!reply.matches.contains(&"WHERE"));

    let code = "SELECT * FROM t WHE";
    let reply = interpreter.complete(code, code.len());
    assert_eq!(reply.cursor_start, code.rfind('W').unwrap());
    assert_eq!(reply.matches, vec!["WHEN", "WHERE"]);
}
