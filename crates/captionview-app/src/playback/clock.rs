//! Active time sampling for backends that never report time on their own.
//!
//! A [`TimePoller`] owns one sampling thread bound to one embedded handle.
//! Cancelling it joins the thread, so once `cancel` returns the handle is
//! never touched again. The controller cancels before it stops or drops the
//! handle and before it attaches anything new.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, TryRecvError};

use super::backend::{EmbeddedPlayer, EventSender};
use super::types::BackendEvent;

/// Reference sampling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Running time poll. Dropping it cancels.
pub struct TimePoller {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<u64>>,
}

/// Proof that a poll has fully stopped.
#[derive(Debug)]
pub struct PollStopped {
    pub samples: u64,
}

impl TimePoller {
    /// Start sampling `player` every `interval`, sending each sample as a
    /// `TimeUpdate` on `events`.
    pub fn spawn(
        player: Arc<dyn EmbeddedPlayer>,
        interval: Duration,
        events: EventSender,
    ) -> anyhow::Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let interval = interval.max(Duration::from_millis(1));

        let thread = std::thread::Builder::new()
            .name("captionview-time-poll".into())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                let mut samples: u64 = 0;
                loop {
                    let stop = crossbeam_channel::select! {
                        recv(stop_rx) -> _ => true,
                        recv(ticker) -> _ => false,
                    };
                    // Stop may have raced the tick; never read a released handle.
                    if stop || !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty)) {
                        break;
                    }
                    let secs = player.current_time();
                    samples += 1;
                    if events.send(BackendEvent::TimeUpdate(secs)).is_err() {
                        log::debug!("Time poll receiver gone, exiting");
                        break;
                    }
                }
                log::debug!("Time poll stopped after {samples} samples");
                samples
            })?;

        log::debug!("Time poll started ({}ms)", interval.as_millis());

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        match &self.thread {
            Some(h) => !h.is_finished(),
            None => false,
        }
    }

    /// Stop sampling and wait for the thread to exit.
    pub fn cancel(mut self) -> PollStopped {
        PollStopped {
            samples: self.shutdown(),
        }
    }

    fn shutdown(&mut self) -> u64 {
        // Disconnecting the stop channel wakes the select immediately.
        self.stop_tx = None;
        let Some(handle) = self.thread.take() else {
            return 0;
        };
        match handle.join() {
            Ok(samples) => samples,
            Err(_) => {
                log::error!("Time poll thread panicked");
                0
            }
        }
    }
}

impl Drop for TimePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
