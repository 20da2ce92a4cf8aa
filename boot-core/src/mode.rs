use anyhow::Result;

use crate::outcome::{BootMode, PinLevel};

/// The digital input that gates update mode.
pub trait BootSignal {
    /// Switch the pin to input with its pull-up enabled.
    fn configure(&mut self) -> Result<()>;
    fn sample(&mut self) -> Result<PinLevel>;
}

/// Configure the boot pin, read it once and derive the boot mode.
pub fn select_boot_mode<S: BootSignal>(signal: &mut S) -> Result<BootMode> {
    signal.configure()?;
    let level = signal.sample()?;
    log::info!("Boot pin state: {:?}", level);

    let mode = BootMode::from(level);
    log::info!("Boot mode selected: {}", mode);
    Ok(mode)
}
