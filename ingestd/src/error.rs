use ingest::error::IngestError;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for daemon operations.
pub type IngestdResult<T> = Result<T, IngestdError>;

/// Captured backtrace wrapper to avoid thiserror's unstable feature detection.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for the ingestion daemon.
///
/// Wraps [`IngestError`] for pipeline errors and provides variants for startup infrastructure.
#[derive(Debug)]
pub enum IngestdError {
    /// Pipeline error, including the aggregated failures of a shutdown.
    Ingest(IngestError),
    /// Configuration loading or validation error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// Document store migration error.
    Migration(sqlx::Error, CapturedBacktrace),
    /// I/O error, for example the gateway failing to bind.
    Io(std::io::Error, CapturedBacktrace),
}

impl IngestdError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            IngestdError::Ingest(_) => "pipeline error",
            IngestdError::Config(_, _) => "configuration error",
            IngestdError::Migration(_, _) => "migration error",
            IngestdError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            IngestdError::Ingest(err) => err.backtrace(),
            IngestdError::Config(_, cb) => Some(&cb.0),
            IngestdError::Migration(_, cb) => Some(&cb.0),
            IngestdError::Io(_, cb) => Some(&cb.0),
        }
    }

    /// Creates a configuration error from any error source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        IngestdError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("ingestd failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {}\n", self));

        if !matches!(self, IngestdError::Ingest(err) if err.errors().is_some()) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        if should_render_backtrace()
            && let Some(backtrace) = self.backtrace()
        {
            out.push_str("backtrace:\n");
            out.push_str(&backtrace.to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for IngestdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestdError::Ingest(err) => write!(f, "{err}"),
            IngestdError::Config(source, _) => write!(f, "configuration error: {source}"),
            IngestdError::Migration(source, _) => write!(f, "migration error: {source}"),
            IngestdError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for IngestdError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IngestdError::Ingest(err) => err.source(),
            IngestdError::Config(source, _) => Some(source.as_ref()),
            IngestdError::Migration(source, _) => Some(source),
            IngestdError::Io(source, _) => Some(source),
        }
    }
}

impl From<sqlx::Error> for IngestdError {
    fn from(err: sqlx::Error) -> Self {
        IngestdError::Migration(err, CapturedBacktrace::capture())
    }
}

impl From<std::io::Error> for IngestdError {
    fn from(err: std::io::Error) -> Self {
        IngestdError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<IngestError> for IngestdError {
    fn from(err: IngestError) -> Self {
        IngestdError::Ingest(err)
    }
}
