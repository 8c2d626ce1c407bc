use std::sync::Arc;

fn render_backtrace(backtrace: &std::backtrace::Backtrace) -> String {
    if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
        backtrace.to_string().trim_end().to_string()
    } else {
        "Run with RUST_BACKTRACE=1 to get a backtrace".to_string()
    }
}

#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    #[error("I/O error ({inner})\n\n{}", render_backtrace(&.backtrace))]
    IoError {
        inner: Arc<std::io::Error>,
        backtrace: Arc<std::backtrace::Backtrace>,
    },

    #[error("Invalid JSON data ({0})")]
    InvalidJsonData(#[from] Arc<serde_json::Error>),

    #[error(transparent)]
    Hoist(#[from] hoist_core::HoistError),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError {
            inner: Arc::new(error),
            backtrace: Arc::new(std::backtrace::Backtrace::capture()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Arc::new(error).into()
    }
}
