//! Boot Core - Hardware-independent boot sequencing for the ESP32 OTA boot controller
//!
//! This crate holds the boot-mode decision and the update state machine. The
//! radio, the HTTPS transfer, the boot pin and the chip itself are reached
//! through traits, so everything here runs and is tested on the host.

pub mod config;
pub mod connectivity;
pub mod mode;
pub mod orchestrator;
pub mod outcome;
pub mod signal;
pub mod storage;
pub mod update;

pub use config::{BootConfig, BootPolicy, NetworkCredentials, TransportConfig, UpdateSource};
pub use connectivity::{ConnectivityController, Radio, RadioEvent, StationLink};
pub use mode::{select_boot_mode, BootSignal};
pub use orchestrator::{BootOrchestrator, BootStage, DeviceControl, Workload};
pub use outcome::{BootAction, BootMode, ConnectivityOutcome, PinLevel, UpdateOutcome};
pub use storage::{init_with_recovery, StorageBackend, StorageInitError};
pub use update::{FirmwareTransfer, UpdateController};
