#![cfg_attr(not(test), no_std)]

//! ESP32-C3 Beacon Board Library
//!
//! This library provides modules for a serial-controlled beacon broadcaster:
//! it keeps a table of network names and, while active, transmits one raw
//! 802.11 beacon frame per name from a freshly randomised source address.
//!
//! Frame building, the label table, command parsing and the broadcaster itself
//! are hardware independent. The radio, UART and LED drivers only build for the
//! ESP32-C3 (`riscv32`) target.

pub mod broadcaster;
pub mod command;
pub mod frame;
pub mod labels;
pub mod status_led;

#[cfg(target_arch = "riscv32")]
pub mod serial;
#[cfg(target_arch = "riscv32")]
pub mod wifi;

use core::fmt;

/// Project version information
pub const VERSION: &str = "0.1.0-dev";

/// Default configuration constants
pub mod config {
    /// Serial console baud rate
    pub const SERIAL_BAUDRATE: u32 = 115_200;

    /// Number of entries in the label table
    pub const LABEL_COUNT: usize = 10;

    /// Storage capacity of one label in bytes.
    /// Accepted labels are strictly shorter than this.
    pub const LABEL_CAPACITY: usize = 31;

    /// Longest command line kept by the serial reader; longer lines are rejected
    pub const MAX_LINE_LEN: usize = 64;

    /// Pause between two frame transmissions within a cycle
    pub const EMIT_INTERVAL_US: u32 = 1_000;

    /// Pending command lines between the serial task and the beacon task
    pub const COMMAND_QUEUE_DEPTH: usize = 4;

    /// On-board WS2812 data GPIO pin (ESP32-C3-DevKitM-1)
    pub const STATUS_LED_PIN: u8 = 8;

    /// Labels loaded at boot
    pub const DEFAULT_LABELS: [&str; LABEL_COUNT] = [
        "Network_1",
        "Free_WiFi_2",
        "OpenNet_3",
        "Public_4",
        "WiFi_5",
        "Internet_6",
        "Access_7",
        "Hotspot_8",
        "Web_9",
        "Connect_10",
    ];

    /// Radio configuration
    /// Read from environment variables at compile time (validated by build.rs)
    pub const WIFI_CHANNEL: u8 = parse_channel(env!("BEACON_CHANNEL"));

    /// Start broadcasting right after boot instead of waiting for `start`
    pub const AUTOSTART: bool = is_true(env!("BEACON_AUTOSTART"));

    const fn parse_channel(value: &str) -> u8 {
        let bytes = value.as_bytes();
        let mut channel: u16 = 0;
        let mut i = 0;
        while i < bytes.len() {
            let digit = bytes[i];
            if digit < b'0' || digit > b'9' || channel > 13 {
                return 1;
            }
            channel = channel * 10 + (digit - b'0') as u16;
            i += 1;
        }
        if channel == 0 || channel > 13 { 1 } else { channel as u8 }
    }

    const fn is_true(value: &str) -> bool {
        let bytes = value.as_bytes();
        bytes.len() == 4
            && bytes[0] == b't'
            && bytes[1] == b'r'
            && bytes[2] == b'u'
            && bytes[3] == b'e'
    }
}

/// Error types for the beacon board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconError {
    /// Label index outside 0-9
    InvalidIndex,
    /// Label text empty or too long
    InvalidLabelLength,
    /// Command line matches no known verb
    UnknownCommand,
    /// Radio refused a frame
    TransmitError,
    /// WiFi driver error
    WiFiError,
    /// UART read failed, the partial line was dropped
    SerialError,
    /// LED control error
    LedError,
}

impl fmt::Display for BeaconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeaconError::InvalidIndex => write!(
                f,
                "Invalid position: must be a single digit 0-{}",
                config::LABEL_COUNT - 1
            ),
            BeaconError::InvalidLabelLength => write!(
                f,
                "Invalid SSID length: must be 1-{} bytes",
                config::LABEL_CAPACITY - 1
            ),
            BeaconError::UnknownCommand => f.write_str("Unknown command (type 'help')"),
            BeaconError::TransmitError => f.write_str("Frame transmission failed"),
            BeaconError::WiFiError => f.write_str("WiFi error"),
            BeaconError::SerialError => f.write_str("Serial input error, line discarded"),
            BeaconError::LedError => f.write_str("LED error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_time_config_is_in_range() {
        assert!((1..=13).contains(&config::WIFI_CHANNEL));
    }

    #[test]
    fn default_labels_fit_capacity() {
        for label in config::DEFAULT_LABELS {
            assert!(!label.is_empty());
            assert!(label.len() < config::LABEL_CAPACITY);
        }
    }

    #[test]
    fn rejection_notices_mention_limits() {
        assert_eq!(
            BeaconError::InvalidIndex.to_string(),
            "Invalid position: must be a single digit 0-9"
        );
        assert_eq!(
            BeaconError::InvalidLabelLength.to_string(),
            "Invalid SSID length: must be 1-30 bytes"
        );
    }
}
