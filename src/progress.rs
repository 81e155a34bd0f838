// src/progress.rs

//! Progress reporting and cooperative cancellation.
//!
//! Index building hashes whole payload trees, which can take a while on
//! large mods, so long operations report through the `ProgressTracker`
//! trait. Implementations here cover logging and silent modes plus a
//! callback adapter; the CLI layers its indicatif bars on top of the same
//! trait.
//!
//! `CancelToken` is the cooperative cancellation handle: workers check it
//! between batches and the engine checks it between steps, so cancellation
//! is prompt but never tears a partial result into the output.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

/// Core trait for progress tracking.
///
/// Implementations must be thread-safe; updates arrive from rayon workers.
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Set progress to a specific position
    fn set_position(&self, position: u64);

    /// Set the total (length) of the progress
    fn set_length(&self, length: u64);

    /// Get current position
    fn position(&self) -> u64;

    /// Get total length
    fn length(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error/abandonment message
    fn finish_with_error(&self, message: &str);

    /// Check if progress is finished
    fn is_finished(&self) -> bool;
}

/// Silent progress tracker (no-op)
///
/// Use this for quiet mode, scripted usage, or when progress output
/// is not desired.
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    /// Create a new silent progress tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a known length
    pub fn with_length(length: u64) -> Self {
        Self {
            length: AtomicU64::new(length),
            ..Default::default()
        }
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Logs progress updates to tracing at info level. Useful for
/// non-interactive environments or when you want progress in logs.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
    /// Log interval - only log every N increments to avoid spam
    log_interval: u64,
}

impl LogProgress {
    /// Create a new logging progress tracker
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(length),
            finished: AtomicBool::new(false),
            log_interval: std::cmp::max(1, length / 10), // Log ~10 times
        }
    }

    /// Set the logging interval
    pub fn with_log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval;
        self
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        let new_pos = old_pos + amount;
        let length = self.length.load(Ordering::Relaxed);

        // Log at intervals
        if length > 0 && self.log_interval > 0 {
            let old_interval = old_pos / self.log_interval;
            let new_interval = new_pos / self.log_interval;
            if new_interval > old_interval {
                let percent = (new_pos * 100) / length;
                info!("{}: {}% ({}/{})", self.name, percent, new_pos, length);
            }
        }
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: ERROR - {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Callback-based progress tracker
///
/// Calls a user-provided function on progress updates. Useful for custom
/// progress handling or embedding the engine behind another frontend.
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

/// Events emitted by callback progress tracker
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Message updated
    Message(String),
    /// Position changed
    Position { current: u64, total: u64 },
    /// Progress finished successfully
    Finished(String),
    /// Progress finished with error
    Error(String),
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    /// Create a new callback progress tracker
    pub fn new(length: u64, callback: F) -> Self {
        Self {
            callback,
            position: AtomicU64::new(0),
            length: AtomicU64::new(length),
            finished: AtomicBool::new(false),
        }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn set_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Message(message.to_string()));
    }

    fn increment(&self, amount: u64) {
        let new_pos = self.position.fetch_add(amount, Ordering::Relaxed) + amount;
        let length = self.length.load(Ordering::Relaxed);
        (self.callback)(ProgressEvent::Position {
            current: new_pos,
            total: length,
        });
    }

    fn set_position(&self, position: u64) {
        self.position.store(position, Ordering::Relaxed);
        let length = self.length.load(Ordering::Relaxed);
        (self.callback)(ProgressEvent::Position {
            current: position,
            total: length,
        });
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Finished(message.to_string()));
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        (self.callback)(ProgressEvent::Error(message.to_string()));
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Cooperative cancellation handle.
///
/// Cloning shares the flag, so one token can be handed to a signal handler
/// while the engine polls it. Checked between hash batches and between
/// wizard steps; a canceled run returns [`crate::Error::Canceled`] and
/// discards partial results.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_silent_progress_accumulates() {
        let progress = SilentProgress::with_length(10);
        progress.increment(3);
        progress.increment(4);
        assert_eq!(progress.position(), 7);
        assert_eq!(progress.length(), 10);
        assert!(!progress.is_finished());

        progress.finish_with_message("done");
        assert!(progress.is_finished());
    }

    #[test]
    fn test_log_progress_positions() {
        let progress = LogProgress::new("hash", 100).with_log_interval(25);
        progress.increment(30);
        progress.set_position(60);
        assert_eq!(progress.position(), 60);
        progress.finish_with_error("canceled");
        assert!(progress.is_finished());
    }

    #[test]
    fn test_callback_progress_emits_events() {
        let events = Mutex::new(Vec::new());
        let progress = CallbackProgress::new(2, |event| {
            events.lock().unwrap().push(event);
        });
        progress.increment(1);
        progress.increment(1);
        progress.finish_with_message("done");

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[1],
            ProgressEvent::Position { current: 2, total: 2 }
        ));
        assert!(matches!(events[2], ProgressEvent::Finished(_)));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_canceled());
        token.cancel();
        assert!(clone.is_canceled());
        // Idempotent.
        token.cancel();
        assert!(token.is_canceled());
    }
}
