use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::SensorSource;
use crate::error::Result;

/// A running sensor stream.
///
/// A worker thread pulls readings from the source and hands each one to the
/// handler, pausing `interval` between readings. Dropping the subscription
/// stops the worker and waits for it, so the source is released on every
/// exit path.
pub struct Subscription {
    sensor: &'static str,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn spawn<S, F>(mut source: S, interval: Duration, mut handler: F) -> Result<Self>
    where
        S: SensorSource + 'static,
        F: FnMut(S::Reading) + Send + 'static,
    {
        let sensor = source.name();
        // Never sent on; dropping the sender is the stop signal
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let worker = thread::Builder::new()
            .name(format!("{}-stream", sensor))
            .spawn(move || {
                tracing::debug!(sensor, "subscription started");
                loop {
                    match source.next_reading() {
                        Ok(Some(reading)) => handler(reading),
                        Ok(None) => {
                            tracing::debug!(sensor, "stream ended");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(sensor, error = %e, "stream failed");
                            break;
                        }
                    }

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                tracing::debug!(sensor, "subscription released");
            })?;

        Ok(Self {
            sensor,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    pub fn sensor(&self) -> &'static str {
        self.sensor
    }

    /// True once the worker has exited (source exhausted, failed or stopped)
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(|w| w.is_finished())
    }

    /// Let the stream run until the source is exhausted
    pub fn wait(mut self) {
        self.join();
    }

    /// Stop the stream now and wait for the worker to exit
    pub fn cancel(mut self) {
        self.stop.take();
        self.join();
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!(sensor = self.sensor, "stream handler panicked");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.take();
        self.join();
    }
}
