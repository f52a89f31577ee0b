//! MCP3008 10-bit ADC over SPI, used to sample the LDR divider.
//!
//! Uses SPI0 with CE0 (Chip Enable 0), Mode 0.

use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use thiserror::Error;

/// Highest channel number on the MCP3008
pub const MAX_CHANNEL: u8 = 7;

/// ADC-related errors
#[derive(Error, Debug)]
pub enum AdcError {
    #[error("SPI initialization failed: {0}")]
    InitError(#[from] rppal::spi::Error),

    #[error("SPI transfer failed: {0}")]
    TransferError(String),

    #[error("Invalid ADC channel {0} (0-7)")]
    InvalidChannel(u8),
}

/// MCP3008 ADC on SPI0
pub struct Mcp3008 {
    spi: Spi,
}

impl Mcp3008 {
    /// Initialize SPI for the ADC
    pub fn new(clock_hz: u32) -> Result<Self, AdcError> {
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, clock_hz, Mode::Mode0)?;

        tracing::debug!(
            "SPI initialized: Bus=SPI0, SS=CE0, Speed={}Hz, Mode=0",
            clock_hz
        );

        Ok(Self { spi })
    }

    /// Single-ended 10-bit conversion on `channel`
    pub fn read_raw(&mut self, channel: u8) -> Result<u16, AdcError> {
        if channel > MAX_CHANNEL {
            return Err(AdcError::InvalidChannel(channel));
        }

        let tx = request_frame(channel);
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| AdcError::TransferError(e.to_string()))?;

        Ok(decode_frame(&rx))
    }

    /// Conversion widened to the full `u16` range
    pub fn read_u16(&mut self, channel: u8) -> Result<u16, AdcError> {
        self.read_raw(channel).map(widen)
    }
}

/// Start bit, single-ended mode, channel select, then a padding byte
fn request_frame(channel: u8) -> [u8; 3] {
    [0x01, (0x08 | channel) << 4, 0x00]
}

/// Result sits in the low 2 bits of byte 1 and all of byte 2
fn decode_frame(rx: &[u8; 3]) -> u16 {
    (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2])
}

/// Stretch a 10-bit reading over 0..=65535 so full scale maps to `u16::MAX`
fn widen(raw: u16) -> u16 {
    (raw << 6) | (raw >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_frame_selects_channel() {
        assert_eq!(request_frame(0), [0x01, 0x80, 0x00]);
        assert_eq!(request_frame(7), [0x01, 0xF0, 0x00]);
    }

    #[test]
    fn decode_ignores_undefined_bits() {
        assert_eq!(decode_frame(&[0xFF, 0xFF, 0xFF]), 1023);
        assert_eq!(decode_frame(&[0x00, 0x02, 0x01]), 513);
    }

    #[test]
    fn widen_covers_full_scale() {
        assert_eq!(widen(0), 0);
        assert_eq!(widen(1023), u16::MAX);
        assert!(widen(512) > 32767 && widen(512) < 33000);
    }
}
