//! One-shot and repeating scheduled callbacks.
//! A scheduled task sleeps on the tokio timer and then posts a message to the
//! owning actor's inbox; it never touches state itself.

use std::time::Duration;

use log::trace;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Handle to a scheduled message. Cancelled on drop.
#[derive(Debug)]
pub struct ScheduledTask {
    cancel_token: CancellationToken,
}

impl ScheduledTask {
    /// Posts `message` once after `delay`.
    pub fn once<T: Send + 'static>(tx: UnboundedSender<T>, delay: Duration, message: T) -> Self {
        let cancel_token = CancellationToken::new();
        let token_for_task = cancel_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if tx.send(message).is_err() {
                        trace!("Scheduled message dropped, inbox closed");
                    }
                }
                _ = token_for_task.cancelled() => {}
            }
        });

        Self { cancel_token }
    }

    /// Posts a clone of `message` every `period`, first firing one period from now.
    pub fn every<T: Clone + Send + 'static>(
        tx: UnboundedSender<T>,
        period: Duration,
        message: T,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token_for_task = cancel_token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if tx.send(message.clone()).is_err() {
                            break;
                        }
                    }
                    _ = token_for_task.cancelled() => break,
                }
            }
        });

        Self { cancel_token }
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
