use mipmap_progress::{ProgressEstimator, ProgressObserver, ProgressUpdate};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Writes one progress line per update.
///
/// Consecutive operations can share one observer: an update that follows a
/// finished operation restarts the elapsed time and ETA.
pub struct ConsoleObserver<W> {
    inner: Mutex<(ProgressEstimator, W)>,
}

impl ConsoleObserver<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: Mutex::new((ProgressEstimator::new(), writer)) }
    }

    #[cfg(test)]
    fn into_writer(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner).1
    }
}

impl<W: Write + Send> ProgressObserver for ConsoleObserver<W> {
    fn on_progress(&self, update: &ProgressUpdate<'_>) {
        self.on_progress_at(Instant::now(), update);
    }
}

impl<W: Write + Send> ConsoleObserver<W> {
    fn on_progress_at(&self, now: Instant, update: &ProgressUpdate<'_>) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let (progress, writer) = &mut *guard;
        progress.observe_at(now, update.current, update.total);
        let report = progress.report(update.label);
        if let Err(e) = writeln!(writer, "{report}") {
            tracing::debug!(error = %e, "Could not write progress");
        }
    }
}
