//! Interactive shell over the sqlbook kernel.
//!
//! Each input line is one request: `%`-prefixed magic commands manage the
//! database lifecycle, everything else runs as SQL. Streams are injected so
//! the whole binary is exercised in tests.

use std::ffi::OsString;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::Path;

use sqlbook_kernel::{Interpreter, NullSink, ResultEnvelope, CHART_SPEC, TEXT_PLAIN};

const PROMPT: &str = "sqlbook> ";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    db_path: Option<String>,
    read_only: bool,
    command: Option<String>,
    log_filter: Option<String>,
    show_help: bool,
}

fn main() {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    let exit_code = run(std::env::args_os(), &mut input, &mut stdout, &mut stderr);
    drop(input);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, R, W, E>(args: I, input: &mut R, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    R: BufRead,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(options) => options,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    if options.show_help {
        if write_usage(out).is_err() {
            return 1;
        }
        return 0;
    }

    init_tracing(options.log_filter.as_deref());

    let mut interpreter = Interpreter::new();
    let mut execution_id = 0u32;

    let envelope = interpreter.execute_request(
        execution_id,
        &startup_line(options.db_path.as_deref(), options.read_only),
        &mut NullSink,
    );
    if !print_envelope(&envelope, out, err) {
        return 1;
    }

    if let Some(command) = options.command {
        execution_id += 1;
        let envelope = interpreter.execute_request(execution_id, &command, &mut NullSink);
        return i32::from(!print_envelope(&envelope, out, err));
    }

    run_repl(&mut interpreter, execution_id, input, out, err)
}

/// The implicit first request: load the requested file if it exists, create
/// it otherwise, and fall back to a fresh in-memory database.
fn startup_line(db_path: Option<&str>, read_only: bool) -> String {
    match db_path {
        None => format!("%CREATE {}", sqlbook_kernel::MEMORY_PATH),
        Some(path) if Path::new(path).exists() => {
            if read_only {
                format!("%LOAD {path} r")
            } else {
                format!("%LOAD {path}")
            }
        }
        Some(path) => format!("%CREATE {path}"),
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut db_path: Option<String> = None;
    let mut read_only = false;
    let mut command: Option<String> = None;
    let mut log_filter: Option<String> = None;
    let mut show_help = false;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        let arg_str = arg.as_ref();

        match arg_str {
            "-h" | "--help" => {
                show_help = true;
            }
            "-r" | "--read-only" => {
                read_only = true;
            }
            "-c" | "--command" => {
                if command.is_some() {
                    return Err(String::from("`-c/--command` may only be provided once"));
                }
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing SQL argument for `-c/--command`"))?;
                command = Some(next.to_string_lossy().into_owned());
            }
            "--log" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing filter argument for `--log`"))?;
                log_filter = Some(next.to_string_lossy().into_owned());
            }
            _ => {
                if let Some(value) = arg_str.strip_prefix("--command=") {
                    if command.is_some() {
                        return Err(String::from("`-c/--command` may only be provided once"));
                    }
                    command = Some(value.to_owned());
                    continue;
                }

                if let Some(value) = arg_str.strip_prefix("--log=") {
                    log_filter = Some(value.to_owned());
                    continue;
                }

                if arg_str.starts_with('-') {
                    return Err(format!("unknown option `{arg_str}`"));
                }

                if db_path.is_some() {
                    return Err(String::from(
                        "too many positional arguments; expected at most one DB path",
                    ));
                }
                db_path = Some(arg_str.to_owned());
            }
        }
    }

    Ok(CliOptions {
        db_path,
        read_only,
        command,
        log_filter,
        show_help,
    })
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => tracing_subscriber::EnvFilter::new(directives),
        None => tracing_subscriber::EnvFilter::from_default_env(),
    };
    // Repeated init in tests is fine; the first subscriber wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_repl<R, W, E>(
    interpreter: &mut Interpreter,
    mut execution_id: u32,
    input: &mut R,
    out: &mut W,
    err: &mut E,
) -> i32
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut line_buffer = String::new();

    loop {
        if write!(out, "{PROMPT}").and_then(|()| out.flush()).is_err() {
            return 1;
        }

        line_buffer.clear();
        let bytes_read = match input.read_line(&mut line_buffer) {
            Ok(bytes_read) => bytes_read,
            Err(error) if error.kind() == ErrorKind::Interrupted => {
                // Keep the shell alive on Ctrl-C style interrupts.
                let _ = writeln!(out);
                continue;
            }
            Err(error) => {
                let _ = writeln!(err, "error: {error}");
                return 1;
            }
        };

        if bytes_read == 0 {
            return 0;
        }

        let line = line_buffer.trim();
        match line {
            "" => continue,
            ".exit" | ".quit" => return 0,
            ".help" => {
                if write_repl_help(out).is_err() {
                    return 1;
                }
            }
            _ => {
                execution_id += 1;
                let envelope = interpreter.execute_request(execution_id, line, &mut NullSink);
                let _ = print_envelope(&envelope, out, err);
            }
        }
    }
}

/// Print every published payload; returns whether the request succeeded.
fn print_envelope<W, E>(envelope: &ResultEnvelope, out: &mut W, err: &mut E) -> bool
where
    W: Write,
    E: Write,
{
    for bundle in &envelope.outputs {
        if let Some(text) = bundle.get(TEXT_PLAIN).and_then(serde_json::Value::as_str) {
            let _ = writeln!(out, "{text}");
        }
        if let Some(spec) = bundle.get(CHART_SPEC) {
            let rendered =
                serde_json::to_string_pretty(spec).unwrap_or_else(|_| spec.to_string());
            let _ = writeln!(out, "{rendered}");
        }
    }
    if let Some(error) = &envelope.error {
        for line in &error.traceback {
            let _ = writeln!(err, "{line}");
        }
    }
    envelope.is_ok()
}

fn write_usage<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Usage: sqlbook [DB_PATH] [-r|--read-only] [-c|--command SQL] [--log FILTER]\n\
         \n\
         Examples:\n\
         \n\
         sqlbook\n\
         sqlbook app.db\n\
         sqlbook app.db -r\n\
         sqlbook -c \"SELECT 1 + 2\"\n\
         sqlbook app.db --command \"SELECT * FROM users\"\n",
    )
}

fn write_repl_help<W>(out: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        out,
        "Shell commands:\n\
         \n\
         .help      Show this help\n\
         .quit      Exit the shell\n\
         .exit      Exit the shell\n\
         \n\
         %LOAD <path> [r|rw]       Open a database\n\
         %CREATE <path>            Create and open a database\n\
         %DELETE                   Close and remove the database\n\
         %TABLE_EXISTS <name>      Check whether a table exists\n\
         %LOAD_EXTENSION <p> <e>   Load a run-time extension\n\
         %SET_KEY <key>            Apply an encryption key\n\
         %REKEY <key>              Change the encryption key\n\
         %IS_UNENCRYPTED           Report encryption status\n\
         %GET_INFO                 Show the file header snapshot\n\
         %BACKUP <type>            Back up the open database\n\
         %XVEGA_PLOT <cfg> SELECT ...  Render a chart from a query\n\
         \n\
         Anything else runs as SQL against the open database.\n",
    )
}
