use anyhow::Result;
use std::time::{Duration, Instant};

use crate::config::NetworkCredentials;
use crate::outcome::ConnectivityOutcome;
use crate::signal::{self, WaitError};

/// Station lifecycle events forwarded by the radio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    StationStarted,
    GotAddress,
    Disconnected,
}

/// Handle that asks the radio to associate. Called from the event context.
pub trait StationLink: Send + 'static {
    fn connect(&self) -> Result<()>;
}

/// Wireless station driver.
pub trait Radio {
    type Link: StationLink;
    /// Keeps event subscriptions alive for the duration of one wait.
    type Session;

    fn link(&self) -> Self::Link;

    /// Apply credentials, route station events to `handler` and start the
    /// station. Must return without waiting for the association.
    fn begin<H>(&mut self, credentials: &NetworkCredentials, handler: H) -> Result<Self::Session>
    where
        H: FnMut(RadioEvent) + Send + 'static;
}

pub struct ConnectivityController {
    timeout: Duration,
}

impl ConnectivityController {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// One association attempt with a single bounded wait.
    pub fn establish<R: Radio>(
        &self,
        radio: &mut R,
        credentials: &NetworkCredentials,
    ) -> ConnectivityOutcome {
        log::info!("Connecting to WiFi '{}'...", credentials.ssid);

        let (notifier, waiter) = signal::signal();
        let link = radio.link();
        let handler = move |event: RadioEvent| match event {
            RadioEvent::StationStarted => {
                log::debug!("Station started, requesting association");
                if let Err(e) = link.connect() {
                    log::error!("Connect request rejected: {:?}", e);
                    notifier.notify(ConnectivityOutcome::Failed);
                }
            }
            RadioEvent::GotAddress => {
                notifier.notify(ConnectivityOutcome::Connected);
            }
            RadioEvent::Disconnected => {
                notifier.notify(ConnectivityOutcome::Failed);
            }
        };

        let started = Instant::now();
        let session = match radio.begin(credentials, handler) {
            Ok(session) => session,
            Err(e) => {
                log::error!("WiFi start failed: {:?}", e);
                return ConnectivityOutcome::Failed;
            }
        };

        let outcome = match waiter.wait_timeout(self.timeout) {
            Ok(outcome) => outcome,
            // Neither terminal event arrived, whether the bound expired or
            // the driver released the handler first.
            Err(WaitError::TimedOut) | Err(WaitError::Abandoned) => ConnectivityOutcome::TimedOut,
        };
        drop(session);

        match outcome {
            ConnectivityOutcome::Connected => {
                log::info!("WiFi connected successfully ({} ms)", started.elapsed().as_millis())
            }
            ConnectivityOutcome::Failed => log::error!("WiFi connection failed"),
            ConnectivityOutcome::TimedOut => log::error!(
                "WiFi connection timeout ({} ms elapsed, bound {} ms)",
                started.elapsed().as_millis(),
                self.timeout.as_millis()
            ),
        }
        outcome
    }
}
