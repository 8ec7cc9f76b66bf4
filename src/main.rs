mod io;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use io::{EnginePump, PumpError, ServerProcess};
use lsp_sansio_client::logging::{LogConfig, init_logging};
use lsp_sansio_client::lsp::{Event, TraceValue};
use lsp_sansio_client::{Client, ClientConfig};
use tracing::{Level, error, info};

/// `trace` setting sent with `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Trace {
    Off,
    Messages,
    Verbose,
}

impl From<Trace> for TraceValue {
    fn from(trace: Trace) -> Self {
        match trace {
            Trace::Off => TraceValue::Off,
            Trace::Messages => TraceValue::Messages,
            Trace::Verbose => TraceValue::Verbose,
        }
    }
}

/// Run the LSP lifecycle handshake against a language server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workspace root sent as rootUri (omitted when not given)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Trace level requested from the server
    #[arg(long, value_enum, default_value_t = Trace::Off)]
    trace: Trace,

    /// Upper bound for each wait on the server, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Log level (overrides RUST_LOG env var)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log file path (overrides LSP_LOG_FILE env var)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Language server command followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    server: Vec<String>,
}

/// Resolve the workspace root into a `file://` URI
fn root_uri(root: &Path) -> Result<String, std::io::Error> {
    let absolute = std::fs::canonicalize(root)?;
    Ok(format!("file://{}", absolute.display()))
}

/// Await `future`, failing once `limit` elapses
async fn bounded<T>(
    operation: &str,
    limit: Duration,
    future: impl Future<Output = Result<T, PumpError>>,
) -> Result<T, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let result = tokio::time::timeout(limit, future)
        .await
        .map_err(|_| format!("Timed out after {limit:?} waiting for {operation}"))??;
    lsp_sansio_client::log_timing!(Level::INFO, operation, start.elapsed());
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging with configuration from env vars and CLI args
    let log_config = LogConfig::from_env().with_overrides(args.log_level, args.log_file);

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let root_uri = args.root.as_deref().map(root_uri).transpose()?;
    let limit = Duration::from_secs(args.timeout_secs);

    let Some((command, command_args)) = args.server.split_first() else {
        return Err("No language server command given".into());
    };

    let (process, stdout, stdin) = ServerProcess::spawn(command, command_args, args.root.as_deref())?;
    let client = Client::with_config(ClientConfig::default())?;
    let mut pump = EnginePump::new(client, stdout, stdin);

    pump.client_mut().initialize(
        Some(std::process::id()),
        root_uri.as_deref(),
        args.trace.into(),
    )?;

    let reply = bounded(
        "initialize",
        limit,
        pump.wait_for(|event| {
            matches!(
                event,
                Event::Initialized { .. } | Event::InitializeFailed { .. }
            )
        }),
    )
    .await?;

    match reply {
        Event::Initialized { capabilities } => {
            info!("Server initialized with capabilities: {}", capabilities);
        }
        Event::InitializeFailed { error } => {
            error!("Server rejected initialize: {}", error);
            return Err(format!("initialize failed: {error}").into());
        }
        _ => {}
    }

    pump.client_mut().shutdown()?;
    let reply = bounded(
        "shutdown",
        limit,
        pump.wait_for(|event| matches!(event, Event::ShutdownAcked | Event::ShutdownFailed { .. })),
    )
    .await?;

    if let Event::ShutdownFailed { error } = reply {
        error!("Server rejected shutdown: {}", error);
        return Err(format!("shutdown failed: {error}").into());
    }

    pump.client_mut().exit()?;
    bounded("exit", limit, pump.flush()).await?;
    info!(
        "Session {} for server PID {:?}",
        pump.client().state(),
        process.pid()
    );

    // Closing stdin lets servers that wait for EOF terminate
    let (client, _, stdin) = pump.into_parts();
    drop(stdin);

    let status = process.wait(limit).await?;
    info!(
        "Handshake complete (pending {}, server {})",
        client.pending_count(),
        status
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_command() {
        let args = Args::try_parse_from([
            "lsp-handshake",
            "--trace",
            "verbose",
            "--timeout-secs",
            "5",
            "clangd",
            "--log=verbose",
        ])
        .unwrap();

        assert_eq!(args.trace, Trace::Verbose);
        assert_eq!(args.timeout_secs, 5);
        assert_eq!(args.server, vec!["clangd", "--log=verbose"]);
        assert_eq!(TraceValue::from(args.trace), TraceValue::Verbose);
    }

    #[test]
    fn test_server_command_required() {
        assert!(Args::try_parse_from(["lsp-handshake"]).is_err());
    }

    #[test]
    fn test_root_uri_is_absolute() {
        let uri = root_uri(Path::new(".")).unwrap();
        assert!(uri.starts_with("file:///"));
    }
}
