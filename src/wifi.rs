//! WiFi module for ESP32-C3 board
//!
//! Brings the radio up as a hidden access point and injects raw beacon frames
//! through the esp-wifi 0.14 sniffer interface.

use crate::broadcaster::{AddressGenerator, FrameSink, Interface};
use crate::frame::{FRAME_LEN, MAC_LEN, MacAddress};
use crate::{BeaconError, config};
use esp_hal::rng::Rng;
use esp_println::println;
use esp_wifi::wifi::{
    AccessPointConfiguration, AuthMethod, Configuration, Sniffer, WifiController,
};

/// SSID of the board's own access point; hidden, so it is never advertised
const AP_SSID: &str = "beacon-board";

/// WiFi manager owning the radio controller
pub struct RadioManager<'a> {
    controller: WifiController<'a>,
    is_started: bool,
}

impl<'a> RadioManager<'a> {
    /// Create a new radio manager instance
    pub fn new(controller: WifiController<'a>) -> Self {
        Self {
            controller,
            is_started: false,
        }
    }

    /// Start the radio as a hidden access point on the configured channel
    pub fn start(&mut self) -> Result<(), BeaconError> {
        println!(
            "[WIFI] Starting hidden access point on channel {}",
            config::WIFI_CHANNEL
        );

        let ap_config = AccessPointConfiguration {
            ssid: AP_SSID.try_into().map_err(|_| BeaconError::WiFiError)?,
            ssid_hidden: true,
            channel: config::WIFI_CHANNEL,
            auth_method: AuthMethod::None,
            ..Default::default()
        };

        self.controller
            .set_configuration(&Configuration::AccessPoint(ap_config))
            .map_err(|_| BeaconError::WiFiError)?;
        self.controller.start().map_err(|_| BeaconError::WiFiError)?;

        self.is_started = self.controller.is_started().unwrap_or(false);
        if self.is_started {
            println!("[WIFI] Radio started, ready for raw frame injection");
            Ok(())
        } else {
            println!("[WIFI] Radio did not report started state");
            Err(BeaconError::WiFiError)
        }
    }

    /// Check if the radio is running
    pub fn is_started(&self) -> bool {
        self.is_started
    }

    /// Stop the radio
    pub fn stop(&mut self) -> Result<(), BeaconError> {
        self.controller.stop().map_err(|_| BeaconError::WiFiError)?;
        self.is_started = false;
        println!("[WIFI] Radio stopped");
        Ok(())
    }
}

/// Frame sink writing straight to the 802.11 TX path
pub struct RawFrameSink {
    sniffer: Sniffer,
    sent: u32,
    failed: u32,
    failing: bool,
}

impl RawFrameSink {
    pub fn new(sniffer: Sniffer) -> Self {
        Self {
            sniffer,
            sent: 0,
            failed: 0,
            failing: false,
        }
    }

    /// Frames accepted and refused by the driver since boot
    pub fn totals(&self) -> (u32, u32) {
        (self.sent, self.failed)
    }
}

impl FrameSink for RawFrameSink {
    fn send(&mut self, interface: Interface, frame: &[u8; FRAME_LEN]) -> Result<(), BeaconError> {
        let use_sta_interface = matches!(interface, Interface::Station);
        match self.sniffer.send_raw_frame(use_sta_interface, frame, false) {
            Ok(()) => {
                if self.failing {
                    log::info!("[WIFI] Raw frame transmission recovered");
                    self.failing = false;
                }
                self.sent = self.sent.wrapping_add(1);
                Ok(())
            }
            Err(e) => {
                // Report once per failure streak, the cycle keeps going
                if !self.failing {
                    log::warn!("[WIFI] Raw frame transmission failed: {:?}", e);
                    self.failing = true;
                }
                self.failed = self.failed.wrapping_add(1);
                Err(BeaconError::TransmitError)
            }
        }
    }
}

/// Origin addresses from the ESP32-C3 hardware random number generator
pub struct HardwareRng {
    rng: Rng,
}

impl HardwareRng {
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }
}

impl AddressGenerator for HardwareRng {
    fn generate(&mut self) -> MacAddress {
        let mut address = [0u8; MAC_LEN];
        self.rng.read(&mut address);
        address
    }
}
