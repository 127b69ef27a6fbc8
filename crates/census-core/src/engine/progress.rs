/// Events emitted while a workflow runs, for front ends to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// Alignment jobs are about to run; `pending` excludes jobs already in the store.
    JobsStart { pending: u64 },
    /// One job ended, successfully or not.
    JobFinished { id: String, succeeded: bool },
    JobsFinish,

    /// The store was written; `records` is its size after the write.
    Checkpoint { records: usize },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional callback. Without a callback, reporting is a
/// no-op, so library code can report unconditionally.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
