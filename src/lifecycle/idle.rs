//! Idle-shutdown timer.
//!
//! # Responsibilities
//! - Count down a quiet window, re-armed by request activity
//! - Cancel the shared shutdown token when the window elapses
//!
//! # Design Decisions
//! - Activity events are fire-and-forget; last reset wins
//! - The timer has two states: armed, then expired (terminal)
//! - Expiry fires the shutdown token at most once

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Clonable handle request handlers use to push the idle deadline forward.
#[derive(Clone)]
pub struct ActivitySignal {
    tx: mpsc::UnboundedSender<()>,
}

impl ActivitySignal {
    /// Record one unit of activity. Never blocks.
    pub fn touch(&self) {
        let _ = self.tx.send(());
    }
}

/// Debounced countdown that cancels the shared token after a quiet window.
pub struct IdleTimer {
    window: Duration,
    rx: mpsc::UnboundedReceiver<()>,
    shutdown: CancellationToken,
}

impl IdleTimer {
    /// Create a timer and the handle used to re-arm it.
    pub fn new(window: Duration, shutdown: CancellationToken) -> (Self, ActivitySignal) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                window,
                rx,
                shutdown,
            },
            ActivitySignal { tx },
        )
    }

    /// Run the countdown until it expires or shutdown is triggered elsewhere.
    pub async fn run(mut self) {
        let mut deadline = Instant::now() + self.window;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    tracing::info!(
                        window_secs = self.window.as_secs_f64(),
                        "no requests within idle window, shutting down"
                    );
                    self.shutdown.cancel();
                    return;
                }
                event = self.rx.recv() => match event {
                    Some(()) => deadline = Instant::now() + self.window,
                    // Every handle dropped: nothing can re-arm the timer, but
                    // the countdown itself still stands.
                    None => {
                        tokio::select! {
                            _ = sleep_until(deadline) => {
                                tracing::info!(
                                    window_secs = self.window.as_secs_f64(),
                                    "no requests within idle window, shutting down"
                                );
                                self.shutdown.cancel();
                            }
                            _ = self.shutdown.cancelled() => {}
                        }
                        return;
                    }
                },
                _ = self.shutdown.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_once_after_quiet_window() {
        let token = CancellationToken::new();
        let (timer, _activity) = IdleTimer::new(Duration::from_millis(50), token.clone());
        tokio::spawn(timer.run());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn activity_keeps_timer_armed() {
        let token = CancellationToken::new();
        let (timer, activity) = IdleTimer::new(Duration::from_millis(100), token.clone());
        tokio::spawn(timer.run());

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            activity.touch();
        }
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn external_shutdown_stops_the_loop() {
        let token = CancellationToken::new();
        let (timer, activity) = IdleTimer::new(Duration::from_secs(60), token.clone());
        let handle = tokio::spawn(timer.run());

        token.cancel();
        handle.await.unwrap();
        // The handle is still usable; sends just go nowhere.
        activity.touch();
    }
}
