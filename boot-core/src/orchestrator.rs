use anyhow::Result;
use std::time::Duration;

use crate::config::BootConfig;
use crate::connectivity::{ConnectivityController, Radio};
use crate::mode::{select_boot_mode, BootSignal};
use crate::outcome::{BootAction, BootMode, ConnectivityOutcome, UpdateOutcome};
use crate::update::{FirmwareTransfer, UpdateController};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStage {
    Init,
    ModeSelected,
    ConnectivityPending,
    /// Covers both a refused association and an expired wait.
    ConnectivityFailed,
    ConnectivityOk,
    UpdatePending,
    UpdateFailed,
    UpdateSucceeded,
    WorkloadStarted,
    RebootScheduled,
}

impl BootStage {
    pub fn description(&self) -> &'static str {
        match self {
            BootStage::Init => "Init",
            BootStage::ModeSelected => "Boot mode selected",
            BootStage::ConnectivityPending => "Waiting for network",
            BootStage::ConnectivityFailed => "Network unavailable",
            BootStage::ConnectivityOk => "Network connected",
            BootStage::UpdatePending => "Transferring firmware",
            BootStage::UpdateFailed => "Update failed",
            BootStage::UpdateSucceeded => "Update applied",
            BootStage::WorkloadStarted => "Application started",
            BootStage::RebootScheduled => "Restart scheduled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BootStage::WorkloadStarted | BootStage::RebootScheduled)
    }
}

/// Chip-level actions.
pub trait DeviceControl {
    fn delay(&mut self, duration: Duration);
    /// Reboot the device. Hardware implementations never return.
    fn restart(&mut self);
}

/// The long-running application started at the end of a boot.
pub trait Workload {
    fn start(&mut self) -> Result<()>;
}

pub struct BootOrchestrator<S, R, T, D> {
    config: BootConfig,
    boot_pin: S,
    radio: R,
    transfer: T,
    device: D,
    stage: BootStage,
}

impl<S, R, T, D> BootOrchestrator<S, R, T, D>
where
    S: BootSignal,
    R: Radio,
    T: FirmwareTransfer,
    D: DeviceControl,
{
    pub fn new(config: BootConfig, boot_pin: S, radio: R, transfer: T, device: D) -> Self {
        Self {
            config,
            boot_pin,
            radio,
            transfer,
            device,
            stage: BootStage::Init,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Run one boot cycle and act on its outcome.
    ///
    /// `RebootNow` waits out the grace delay and restarts; every other action
    /// hands over to `workload`. `Err` means the boot was aborted.
    pub fn run<W: Workload>(&mut self, workload: &mut W) -> Result<BootAction> {
        let action = self.decide()?;

        match action {
            BootAction::RebootNow => {
                self.enter(BootStage::RebootScheduled);
                let grace = self.config.policy.grace_delay();
                log::info!("OTA successful, restarting in {} ms...", grace.as_millis());
                self.device.delay(grace);
                self.device.restart();
            }
            BootAction::ContinueCurrentFirmware | BootAction::ProceedNormally => {
                self.enter(BootStage::WorkloadStarted);
                log::info!("Running main application ({})", action);
                workload.start()?;
            }
        }
        Ok(action)
    }

    /// Mode selection plus the optional update attempt, without acting on
    /// the result.
    pub fn decide(&mut self) -> Result<BootAction> {
        let mode = select_boot_mode(&mut self.boot_pin)?;
        self.enter(BootStage::ModeSelected);

        if mode == BootMode::Normal {
            log::info!("Normal boot mode - running application");
            return Ok(BootAction::decide(mode, None, None));
        }

        log::info!("Entering boot mode - checking for updates");
        if let Err(e) = self.config.validate() {
            log::error!("Update configuration rejected: {:#}", e);
            self.enter(BootStage::ConnectivityFailed);
            return Ok(BootAction::decide(mode, Some(ConnectivityOutcome::Failed), None));
        }

        self.enter(BootStage::ConnectivityPending);
        let connectivity = ConnectivityController::new(self.config.policy.connect_timeout())
            .establish(&mut self.radio, &self.config.network);

        if !connectivity.is_connected() {
            self.enter(BootStage::ConnectivityFailed);
            log::error!("WiFi not connected ({}), skipping OTA update", connectivity);
            return Ok(BootAction::decide(mode, Some(connectivity), None));
        }
        self.enter(BootStage::ConnectivityOk);

        self.enter(BootStage::UpdatePending);
        let update = UpdateController::new(self.config.policy.transfer_stack_size)
            .attempt(&mut self.transfer, &self.config.update);

        match update {
            UpdateOutcome::Succeeded => self.enter(BootStage::UpdateSucceeded),
            UpdateOutcome::Failed => {
                self.enter(BootStage::UpdateFailed);
                log::error!("OTA failed, continuing with current firmware");
            }
        }
        Ok(BootAction::decide(mode, Some(connectivity), Some(update)))
    }

    fn enter(&mut self, stage: BootStage) {
        log::info!("Boot stage: {} -> {}", self.stage.description(), stage.description());
        self.stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkCredentials, UpdateSource};
    use crate::connectivity::{RadioEvent, StationLink};
    use crate::outcome::PinLevel;
    use anyhow::bail;
    use std::time::Instant;

    struct Pin(PinLevel);

    impl BootSignal for Pin {
        fn configure(&mut self) -> Result<()> {
            Ok(())
        }
        fn sample(&mut self) -> Result<PinLevel> {
            Ok(self.0)
        }
    }

    struct NoopLink;

    impl StationLink for NoopLink {
        fn connect(&self) -> Result<()> {
            Ok(())
        }
    }

    type HeldHandler = Box<dyn FnMut(RadioEvent) + Send>;

    /// Fires its events synchronously from `begin`, then keeps the handler
    /// registered like a live driver would.
    #[derive(Default)]
    struct InstantRadio {
        events: Vec<RadioEvent>,
        begins: u32,
        handler: Option<HeldHandler>,
    }

    impl InstantRadio {
        fn new(events: Vec<RadioEvent>) -> Self {
            Self {
                events,
                ..Default::default()
            }
        }
    }

    impl Radio for InstantRadio {
        type Link = NoopLink;
        type Session = ();

        fn link(&self) -> NoopLink {
            NoopLink
        }

        fn begin<H>(&mut self, _credentials: &NetworkCredentials, mut handler: H) -> Result<()>
        where
            H: FnMut(RadioEvent) + Send + 'static,
        {
            self.begins += 1;
            for event in &self.events {
                handler(*event);
            }
            self.handler = Some(Box::new(handler));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Transfer {
        succeed: bool,
        attempts: u32,
    }

    impl FirmwareTransfer for Transfer {
        fn fetch_and_apply(&mut self, _source: &UpdateSource) -> Result<()> {
            self.attempts += 1;
            if self.succeed {
                Ok(())
            } else {
                bail!("image rejected")
            }
        }
    }

    #[derive(Default)]
    struct Device {
        delays: Vec<Duration>,
        restarts: u32,
    }

    impl DeviceControl for Device {
        fn delay(&mut self, duration: Duration) {
            self.delays.push(duration);
        }
        fn restart(&mut self) {
            self.restarts += 1;
        }
    }

    #[derive(Default)]
    struct App {
        starts: u32,
    }

    impl Workload for App {
        fn start(&mut self) -> Result<()> {
            self.starts += 1;
            Ok(())
        }
    }

    fn config() -> BootConfig {
        let mut config = BootConfig::new(
            NetworkCredentials::new("lab", "secret"),
            UpdateSource::new("https://example.com/firmware.bin"),
        );
        config.policy.connect_timeout_ms = 200;
        config.policy.transfer_stack_size = 256 * 1024;
        config
    }

    fn boot(
        level: PinLevel,
        events: Vec<RadioEvent>,
        succeed: bool,
    ) -> (BootOrchestrator<Pin, InstantRadio, Transfer, Device>, App, BootAction) {
        let radio = InstantRadio::new(events);
        let transfer = Transfer { succeed, attempts: 0 };
        let mut orchestrator =
            BootOrchestrator::new(config(), Pin(level), radio, transfer, Device::default());
        let mut app = App::default();
        let action = orchestrator.run(&mut app).unwrap();
        (orchestrator, app, action)
    }

    const CONNECTS: [RadioEvent; 2] = [RadioEvent::StationStarted, RadioEvent::GotAddress];

    #[test]
    fn test_normal_boot_skips_network() {
        let (orchestrator, app, action) = boot(PinLevel::High, CONNECTS.to_vec(), true);
        assert_eq!(action, BootAction::ProceedNormally);
        assert_eq!(orchestrator.radio().begins, 0);
        assert_eq!(orchestrator.transfer().attempts, 0);
        assert_eq!(orchestrator.stage(), BootStage::WorkloadStarted);
        assert_eq!(app.starts, 1);
    }

    #[test]
    fn test_unreachable_network_waits_full_bound_then_skips_update() {
        let start = Instant::now();
        let (orchestrator, app, action) = boot(PinLevel::Low, vec![RadioEvent::StationStarted], true);
        let elapsed = start.elapsed();

        assert_eq!(action, BootAction::ContinueCurrentFirmware);
        assert!(elapsed >= config().policy.connect_timeout());
        assert!(orchestrator.radio().handler.is_some());
        assert_eq!(orchestrator.radio().begins, 1);
        assert_eq!(orchestrator.transfer().attempts, 0);
        assert_eq!(orchestrator.device().restarts, 0);
        assert_eq!(app.starts, 1);
    }

    #[test]
    fn test_timed_out_connection_decides_without_transfer() {
        let mut orchestrator = BootOrchestrator::new(
            config(),
            Pin(PinLevel::Low),
            InstantRadio::new(Vec::new()),
            Transfer { succeed: true, attempts: 0 },
            Device::default(),
        );
        assert_eq!(orchestrator.decide().unwrap(), BootAction::ContinueCurrentFirmware);
        assert_eq!(orchestrator.stage(), BootStage::ConnectivityFailed);
        assert_eq!(orchestrator.transfer().attempts, 0);
    }

    #[test]
    fn test_failed_update_keeps_firmware() {
        let (orchestrator, app, action) = boot(PinLevel::Low, CONNECTS.to_vec(), false);
        assert_eq!(action, BootAction::ContinueCurrentFirmware);
        assert_eq!(orchestrator.transfer().attempts, 1);
        assert_eq!(orchestrator.device().restarts, 0);
        assert_eq!(app.starts, 1);
    }

    #[test]
    fn test_successful_update_restarts_once_after_grace() {
        let (orchestrator, app, action) = boot(PinLevel::Low, CONNECTS.to_vec(), true);
        assert_eq!(action, BootAction::RebootNow);
        assert_eq!(orchestrator.device().delays, vec![Duration::from_secs(3)]);
        assert_eq!(orchestrator.device().restarts, 1);
        assert_eq!(orchestrator.stage(), BootStage::RebootScheduled);
        assert_eq!(app.starts, 0);
    }

    #[test]
    fn test_decide_has_no_terminal_side_effects() {
        let mut orchestrator = BootOrchestrator::new(
            config(),
            Pin(PinLevel::Low),
            InstantRadio::new(CONNECTS.to_vec()),
            Transfer { succeed: true, attempts: 0 },
            Device::default(),
        );
        assert_eq!(orchestrator.decide().unwrap(), BootAction::RebootNow);
        assert_eq!(orchestrator.device().restarts, 0);
        assert_eq!(orchestrator.stage(), BootStage::UpdateSucceeded);
        assert!(!orchestrator.stage().is_terminal());
    }

    #[test]
    fn test_rejected_image_stops_at_update_failed() {
        let mut orchestrator = BootOrchestrator::new(
            config(),
            Pin(PinLevel::Low),
            InstantRadio::new(CONNECTS.to_vec()),
            Transfer { succeed: false, attempts: 0 },
            Device::default(),
        );
        assert_eq!(orchestrator.decide().unwrap(), BootAction::ContinueCurrentFirmware);
        assert_eq!(orchestrator.stage(), BootStage::UpdateFailed);
        assert_eq!(orchestrator.transfer().attempts, 1);
    }

    #[test]
    fn test_invalid_update_config_skips_network() {
        let mut config = config();
        config.update.url = "http://insecure.example.com/fw.bin".into();
        let mut orchestrator = BootOrchestrator::new(
            config,
            Pin(PinLevel::Low),
            InstantRadio::new(CONNECTS.to_vec()),
            Transfer { succeed: true, attempts: 0 },
            Device::default(),
        );
        let mut app = App::default();
        assert_eq!(
            orchestrator.run(&mut app).unwrap(),
            BootAction::ContinueCurrentFirmware
        );
        assert_eq!(orchestrator.radio().begins, 0);
        assert_eq!(app.starts, 1);
    }

    #[test]
    fn test_workload_failure_aborts_boot() {
        struct BrokenApp;
        impl Workload for BrokenApp {
            fn start(&mut self) -> Result<()> {
                bail!("no memory for task")
            }
        }

        let mut orchestrator = BootOrchestrator::new(
            config(),
            Pin(PinLevel::High),
            InstantRadio::default(),
            Transfer::default(),
            Device::default(),
        );
        assert!(orchestrator.run(&mut BrokenApp).is_err());
    }
}
