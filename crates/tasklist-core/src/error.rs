use crate::model::BackendKind;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Input rejected before any backend was touched.
    #[error("task text must not be empty")]
    Validation,

    /// The backend call failed; nothing was committed to memory. The message
    /// carries the whole cause chain (context, HTTP status, transport error).
    #[error("{backend} backend unavailable: {}", chain(.source))]
    BackendUnavailable {
        backend: BackendKind,
        #[source]
        source: BoxError,
    },
}

impl TaskError {
    pub fn unavailable(backend: BackendKind, source: impl Into<BoxError>) -> Self {
        TaskError::BackendUnavailable {
            backend,
            source: source.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TaskError::Validation)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, TaskError::BackendUnavailable { .. })
    }
}

pub type TaskResult<T> = Result<T, TaskError>;

/// `outer: inner: root`, skipping a level that repeats its parent verbatim.
fn chain(err: &BoxError) -> String {
    let mut out = err.to_string();
    let mut last = out.clone();
    let mut cur = err.source();
    while let Some(next) = cur {
        let msg = next.to_string();
        if msg != last {
            out.push_str(": ");
            out.push_str(&msg);
        }
        last = msg;
        cur = next.source();
    }
    out
}
