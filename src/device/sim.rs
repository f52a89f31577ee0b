//! Simulated hardware for running off the Pi and for tests.

use super::{DeviceError, Hardware};

/// How the simulated light sensor produces samples
enum Sensor {
    Fixed(u16),
    /// Triangle wave walking 0..=max in `step` increments
    Sweep { value: u16, step: u16, rising: bool },
    Unavailable,
}

/// In-memory LED and light sensor
pub struct SimulatedHardware {
    led: bool,
    sensor: Sensor,
}

impl SimulatedHardware {
    /// Sensor always reads `sample`
    #[allow(dead_code)]
    pub fn with_sample(sample: u16) -> Self {
        Self {
            led: false,
            sensor: Sensor::Fixed(sample),
        }
    }

    /// Sensor sweeps up and down the full range
    pub fn sweeping(step: u16) -> Self {
        Self {
            led: false,
            sensor: Sensor::Sweep {
                value: 0,
                step: step.max(1),
                rising: true,
            },
        }
    }

    /// Sensor that fails every read
    #[allow(dead_code)]
    pub fn unavailable() -> Self {
        Self {
            led: false,
            sensor: Sensor::Unavailable,
        }
    }
}

impl Hardware for SimulatedHardware {
    fn set_output(&mut self, on: bool) {
        self.led = on;
    }

    fn get_output(&self) -> bool {
        self.led
    }

    fn sample_input(&mut self) -> Result<u16, DeviceError> {
        match &mut self.sensor {
            Sensor::Fixed(sample) => Ok(*sample),
            Sensor::Sweep {
                value,
                step,
                rising,
            } => {
                let current = *value;
                if *rising {
                    *value = value.saturating_add(*step);
                    *rising = *value < u16::MAX;
                } else {
                    *value = value.saturating_sub(*step);
                    *rising = *value == 0;
                }
                Ok(current)
            }
            Sensor::Unavailable => Err(DeviceError::Unavailable(
                "simulated sensor offline".to_string(),
            )),
        }
    }

    fn max_sample(&self) -> u16 {
        u16::MAX
    }
}
