//! Status LED
//!
//! Shows the broadcaster state on the single on-board WS2812. The colour
//! pattern is computed here independently of the hardware; the RMT driver is
//! only available on the ESP32-C3.

pub use smart_leds::RGB8;

/// LED status states for visual feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedStatus {
    /// Hardware and radio initialisation
    Starting,
    /// Radio up, not broadcasting
    Idle,
    /// Beacon frames are being transmitted
    Broadcasting,
    /// Radio bring-up failed
    RadioError,
}

const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// Computes the LED colour for each display refresh
pub struct StatusIndicator {
    status: LedStatus,
    status_counter: u32,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self {
            status: LedStatus::Starting,
            status_counter: 0,
        }
    }

    /// Update the LED status
    pub fn set_status(&mut self, status: LedStatus) {
        if self.status != status {
            self.status = status;
            self.status_counter = 0; // Reset counter for new status
        }
    }

    /// Get current status
    pub fn status(&self) -> LedStatus {
        self.status
    }

    /// Colour for the next refresh
    pub fn next_color(&mut self) -> RGB8 {
        let counter = self.status_counter;
        self.status_counter = self.status_counter.wrapping_add(1);

        match self.status {
            // fast white blink
            LedStatus::Starting => {
                if (counter / 2) % 2 == 0 {
                    RGB8 { r: 32, g: 32, b: 32 }
                } else {
                    OFF
                }
            }
            LedStatus::Idle => {
                let level = breathing(counter);
                RGB8 { r: 0, g: 0, b: level }
            }
            // flicker between bright and dim green, one step per refresh
            LedStatus::Broadcasting => {
                if counter % 2 == 0 {
                    RGB8 { r: 0, g: 64, b: 0 }
                } else {
                    RGB8 { r: 0, g: 12, b: 0 }
                }
            }
            LedStatus::RadioError => {
                if (counter / 5) % 2 == 0 {
                    RGB8 { r: 64, g: 0, b: 0 }
                } else {
                    OFF
                }
            }
        }
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Triangle wave between BREATHING_MIN and BREATHING_MAX
fn breathing(counter: u32) -> u8 {
    const BREATHING_MIN: u32 = 2;
    const BREATHING_MAX: u32 = 40;
    const BREATHING_STEP: u32 = 2;
    const HALF_PERIOD: u32 = (BREATHING_MAX - BREATHING_MIN) / BREATHING_STEP;

    let phase = counter % (HALF_PERIOD * 2);
    let level = if phase < HALF_PERIOD {
        BREATHING_MIN + phase * BREATHING_STEP
    } else {
        BREATHING_MAX - (phase - HALF_PERIOD) * BREATHING_STEP
    };
    level as u8
}

#[cfg(target_arch = "riscv32")]
pub use driver::StatusLed;

#[cfg(target_arch = "riscv32")]
mod driver {
    use super::RGB8;
    use crate::BeaconError;
    use esp_hal::gpio::Level;
    use esp_hal::rmt::{PulseCode, TxChannel};

    /// 24 data bits plus the reset pulse
    const PULSES_PER_LED: usize = 24 + 1;

    /// Single WS2812 driven by one RMT channel clocked at 10MHz
    pub struct StatusLed<TX>
    where
        TX: TxChannel,
    {
        channel: Option<TX>,
    }

    impl<TX> StatusLed<TX>
    where
        TX: TxChannel,
    {
        pub fn new(channel: TX) -> Self {
            Self {
                channel: Some(channel),
            }
        }

        /// Send one colour to the LED
        pub fn write(&mut self, color: RGB8) -> Result<(), BeaconError> {
            let mut pulses = [0u32; PULSES_PER_LED];
            // WS2812 wire order is G, R, B
            for (i, byte) in [color.g, color.r, color.b].into_iter().enumerate() {
                pulses[i * 8..i * 8 + 8].copy_from_slice(&byte_to_pulses(byte));
            }
            // Reset pulse (low 50us = 500 cycles at 10MHz)
            pulses[PULSES_PER_LED - 1] = PulseCode::new(Level::Low, 500, Level::Low, 0);

            let channel = self.channel.take().ok_or(BeaconError::LedError)?;
            match channel.transmit(&pulses) {
                Ok(transaction) => match transaction.wait() {
                    Ok(channel) => {
                        self.channel = Some(channel);
                        Ok(())
                    }
                    Err((_, channel)) => {
                        self.channel = Some(channel);
                        Err(BeaconError::LedError)
                    }
                },
                Err(_) => Err(BeaconError::LedError),
            }
        }
    }

    /// WS2812 timing at 10MHz: 1-bit = 8 high + 4 low cycles, 0-bit = 4 high + 8 low
    fn byte_to_pulses(byte: u8) -> [u32; 8] {
        let mut pulses = [0u32; 8];
        for (i, pulse) in pulses.iter_mut().enumerate() {
            let bit = (byte >> (7 - i)) & 1;
            *pulse = if bit == 1 {
                PulseCode::new(Level::High, 8, Level::Low, 4)
            } else {
                PulseCode::new(Level::High, 4, Level::Low, 8)
            };
        }
        pulses
    }
}
