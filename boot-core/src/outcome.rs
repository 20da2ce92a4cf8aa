/// Per-boot signals passed between the controllers and the orchestrator.
/// None of these survive a restart.
use std::fmt;

/// Level read from the boot-mode pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn from_raw(level: u8) -> Self {
        if level == 0 {
            PinLevel::Low
        } else {
            PinLevel::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    Normal,
    UpdateCheck,
}

impl From<PinLevel> for BootMode {
    // Pin is pulled up; an operator jumper or button pulls it low.
    fn from(level: PinLevel) -> Self {
        match level {
            PinLevel::Low => BootMode::UpdateCheck,
            PinLevel::High => BootMode::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityOutcome {
    Connected,
    Failed,
    TimedOut,
}

impl ConnectivityOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectivityOutcome::Connected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    RebootNow,
    ContinueCurrentFirmware,
    ProceedNormally,
}

impl BootAction {
    /// Map the outcomes observed during one boot onto the terminal action.
    ///
    /// An update outcome is only meaningful after a successful connection;
    /// any other combination keeps the running firmware.
    pub fn decide(
        mode: BootMode,
        connectivity: Option<ConnectivityOutcome>,
        update: Option<UpdateOutcome>,
    ) -> Self {
        match (mode, connectivity, update) {
            (BootMode::Normal, _, _) => BootAction::ProceedNormally,
            (
                BootMode::UpdateCheck,
                Some(ConnectivityOutcome::Connected),
                Some(UpdateOutcome::Succeeded),
            ) => BootAction::RebootNow,
            (BootMode::UpdateCheck, _, _) => BootAction::ContinueCurrentFirmware,
        }
    }

    pub fn starts_workload(&self) -> bool {
        !matches!(self, BootAction::RebootNow)
    }
}

impl fmt::Display for BootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootMode::Normal => write!(f, "normal"),
            BootMode::UpdateCheck => write!(f, "update check"),
        }
    }
}

impl fmt::Display for ConnectivityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityOutcome::Connected => write!(f, "connected"),
            ConnectivityOutcome::Failed => write!(f, "connection failed"),
            ConnectivityOutcome::TimedOut => write!(f, "connection timed out"),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Succeeded => write!(f, "update succeeded"),
            UpdateOutcome::Failed => write!(f, "update failed"),
        }
    }
}

impl fmt::Display for BootAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootAction::RebootNow => write!(f, "reboot"),
            BootAction::ContinueCurrentFirmware => write!(f, "continue current firmware"),
            BootAction::ProceedNormally => write!(f, "proceed normally"),
        }
    }
}
