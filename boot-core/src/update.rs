use anyhow::Result;
use std::thread;

use crate::config::UpdateSource;
use crate::outcome::UpdateOutcome;
use crate::signal;

/// Downloads, verifies and commits a firmware image.
///
/// `Ok` means the new image is written and selected for the next boot. On
/// `Err` the running image must still be the boot image.
pub trait FirmwareTransfer: Send {
    fn fetch_and_apply(&mut self, source: &UpdateSource) -> Result<()>;
}

pub struct UpdateController {
    stack_size: usize,
}

impl UpdateController {
    pub const TASK_NAME: &'static str = "ota_task";

    pub fn new(stack_size: usize) -> Self {
        Self { stack_size }
    }

    /// Run exactly one transfer on a dedicated thread and wait for its result.
    ///
    /// No timeout is applied here; the transfer's own transport timeout
    /// bounds the wait.
    pub fn attempt<T: FirmwareTransfer>(&self, transfer: &mut T, source: &UpdateSource) -> UpdateOutcome {
        log::info!("Starting OTA from: {}", source.url);

        let (notifier, waiter) = signal::signal();
        thread::scope(|scope| {
            let spawned = thread::Builder::new()
                .name(Self::TASK_NAME.to_string())
                .stack_size(self.stack_size)
                .spawn_scoped(scope, move || {
                    let outcome = match transfer.fetch_and_apply(source) {
                        Ok(()) => {
                            log::info!("OTA successful!");
                            UpdateOutcome::Succeeded
                        }
                        Err(e) => {
                            log::error!("OTA failed: {:#}", e);
                            UpdateOutcome::Failed
                        }
                    };
                    notifier.notify(outcome);
                });

            let task = match spawned {
                Ok(task) => task,
                Err(e) => {
                    log::error!("Failed to spawn {}: {}", Self::TASK_NAME, e);
                    return UpdateOutcome::Failed;
                }
            };

            // A panicking transfer drops its notifier without posting.
            let outcome = waiter.wait().unwrap_or(UpdateOutcome::Failed);
            if task.join().is_err() {
                log::error!("{} panicked", Self::TASK_NAME);
            }
            outcome
        })
    }
}
