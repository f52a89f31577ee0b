//! GPIO output driving the indicator LED.
//!
//! The LED is wired to a single BCM pin. Boards with the LED between the
//! pin and 3V3 light it on a low level; `active_low` covers that wiring.

use rppal::gpio::{Gpio, OutputPin};
use thiserror::Error;

/// GPIO-related errors
#[derive(Error, Debug)]
pub enum GpioError {
    #[error("GPIO initialization failed: {0}")]
    InitError(#[from] rppal::gpio::Error),
}

/// LED on a GPIO output pin
pub struct LedPin {
    pin: OutputPin,
    active_low: bool,
    on: bool,
}

impl LedPin {
    /// Claim the pin as an output and switch the LED off
    pub fn new(bcm_pin: u8, active_low: bool) -> Result<Self, GpioError> {
        let gpio = Gpio::new()?;
        let pin = gpio.get(bcm_pin)?.into_output();

        let mut led = Self {
            pin,
            active_low,
            on: false,
        };
        led.set(false);

        tracing::debug!("GPIO initialized: LED={}, active_low={}", bcm_pin, active_low);

        Ok(led)
    }

    /// Switch the LED on or off
    pub fn set(&mut self, on: bool) {
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        self.on = on;
    }

    /// Whether the LED is lit
    #[inline]
    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Drop for LedPin {
    fn drop(&mut self) {
        // Leave the LED dark when the process exits
        self.set(false);
        tracing::debug!("LED pin released");
    }
}
