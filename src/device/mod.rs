//! Device state for the LED output and the light sensor input.
//!
//! The hardware itself sits behind the [`Hardware`] trait:
//! - [`RpiHardware`]: LED on a GPIO pin, LDR on an MCP3008 over SPI
//! - [`SimulatedHardware`]: in-memory backend for development hosts and tests

pub mod adc;
pub mod gpio;
pub mod sim;

pub use adc::Mcp3008;
pub use gpio::LedPin;
pub use sim::SimulatedHardware;

use crate::config::Config;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Device errors
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("GPIO error: {0}")]
    Gpio(#[from] gpio::GpioError),

    #[error("ADC error: {0}")]
    Adc(#[from] adc::AdcError),
}

/// Hardware capability the device state drives
pub trait Hardware: Send + 'static {
    /// Drive the digital output
    fn set_output(&mut self, on: bool);

    /// Current level of the digital output
    fn get_output(&self) -> bool;

    /// Take one raw sample of the analog input
    fn sample_input(&mut self) -> Result<u16, DeviceError>;

    /// Largest value `sample_input` can return
    fn max_sample(&self) -> u16;
}

/// Raspberry Pi backend: GPIO LED and MCP3008 light sensor
pub struct RpiHardware {
    led: LedPin,
    adc: Mcp3008,
    channel: u8,
}

impl RpiHardware {
    /// Open the LED pin and the ADC described by the configuration
    pub fn new(config: &Config) -> Result<Self, DeviceError> {
        let led = LedPin::new(config.led_pin, config.led_active_low)?;
        let adc = Mcp3008::new(config.spi_clock_hz)?;

        tracing::debug!(
            "Hardware initialized: LED=GPIO{}, LDR=MCP3008 CH{}",
            config.led_pin,
            config.adc_channel
        );

        Ok(Self {
            led,
            adc,
            channel: config.adc_channel,
        })
    }
}

impl Hardware for RpiHardware {
    fn set_output(&mut self, on: bool) {
        self.led.set(on);
    }

    fn get_output(&self) -> bool {
        self.led.is_on()
    }

    fn sample_input(&mut self) -> Result<u16, DeviceError> {
        Ok(self.adc.read_u16(self.channel)?)
    }

    fn max_sample(&self) -> u16 {
        u16::MAX
    }
}

/// Map a raw sample onto 0-100 %, rounded to two decimals
pub fn light_percent(raw: u16, max: u16) -> f64 {
    if max == 0 {
        return 0.0;
    }
    let percent = (f64::from(raw) / f64::from(max) * 100.0).clamp(0.0, 100.0);
    (percent * 100.0).round() / 100.0
}

/// LED output and light sensor input of the node
pub struct DeviceState {
    hardware: Box<dyn Hardware>,
}

impl DeviceState {
    /// Take ownership of the hardware; the LED starts off
    pub fn new(mut hardware: Box<dyn Hardware>) -> Self {
        hardware.set_output(false);
        Self { hardware }
    }

    /// Flip the LED and return its new state
    pub fn toggle_led(&mut self) -> bool {
        let next = !self.hardware.get_output();
        self.hardware.set_output(next);
        next
    }

    /// Current LED state
    pub fn read_led(&self) -> bool {
        self.hardware.get_output()
    }

    /// Force the LED to a given state
    pub fn set_led(&mut self, on: bool) {
        self.hardware.set_output(on);
    }

    /// Sample the light sensor and scale it to 0-100 %
    pub fn read_light_percent(&mut self) -> Result<f64, DeviceError> {
        let raw = self.hardware.sample_input()?;
        Ok(light_percent(raw, self.hardware.max_sample()))
    }
}

/// Shared handle to the single [`DeviceState`] of the process
///
/// Every method takes the lock and releases it before returning, so no
/// access can be held across an `.await`.
#[derive(Clone)]
pub struct DeviceHandle {
    state: Arc<Mutex<DeviceState>>,
}

impl DeviceHandle {
    /// Wrap the device state
    pub fn new(state: DeviceState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        // A panic while holding the guard cannot leave the LED half-toggled
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Flip the LED and return its new state
    pub fn toggle_led(&self) -> bool {
        self.lock().toggle_led()
    }

    /// Current LED state
    pub fn read_led(&self) -> bool {
        self.lock().read_led()
    }

    /// Force the LED to a given state
    pub fn set_led(&self, on: bool) {
        self.lock().set_led(on);
    }

    /// Sample the light sensor and scale it to 0-100 %
    pub fn read_light_percent(&self) -> Result<f64, DeviceError> {
        self.lock().read_light_percent()
    }
}
