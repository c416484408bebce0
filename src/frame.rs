//! 802.11 beacon frame template
//!
//! A single 128-byte buffer holding a beacon management frame. The fixed
//! header never changes; the source address, BSSID, SSID length and SSID bytes
//! are rewritten in place before each transmission.

/// Total length of every transmitted frame
pub const FRAME_LEN: usize = 128;

/// Length of a hardware address
pub const MAC_LEN: usize = 6;

/// Destination address (always broadcast)
pub const DESTINATION_OFFSET: usize = 4;
/// Source address, the first copy of the origin address
pub const SOURCE_ADDRESS_OFFSET: usize = 10;
/// BSSID, the second copy of the origin address
pub const BSSID_OFFSET: usize = 16;
/// SSID information element id
pub const SSID_ELEMENT_OFFSET: usize = 36;
/// SSID length byte
pub const SSID_LENGTH_OFFSET: usize = 37;
/// First SSID byte
pub const SSID_OFFSET: usize = 38;
/// Longest SSID the information element may carry
pub const MAX_SSID_LEN: usize = 32;

/// A 6-byte hardware address
pub type MacAddress = [u8; MAC_LEN];

/// Broadcast destination address
pub const BROADCAST: MacAddress = [0xff; MAC_LEN];

/// Fixed beacon header up to and including the SSID element id
const TEMPLATE: [u8; SSID_LENGTH_OFFSET] = [
    0x80, 0x00, // Frame Control: management / beacon
    0x00, 0x00, // Duration
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // Destination address
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // Source address
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // BSSID
    0x00, 0x00, // Sequence Control
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Timestamp
    0x64, 0x00, // Beacon Interval: 100 TU
    0x31, 0x04, // Capability info
    0x00, // SSID element id
];

/// Beacon frame buffer reused for every transmission
#[derive(Clone)]
pub struct BeaconFrame {
    buffer: [u8; FRAME_LEN],
}

impl BeaconFrame {
    /// Create a frame holding the template header and an empty SSID
    pub fn new() -> Self {
        let mut buffer = [0u8; FRAME_LEN];
        buffer[..TEMPLATE.len()].copy_from_slice(&TEMPLATE);
        Self { buffer }
    }

    /// Write the origin address into both the source address and BSSID fields
    pub fn set_origin(&mut self, address: &MacAddress) {
        self.buffer[SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + MAC_LEN]
            .copy_from_slice(address);
        self.buffer[BSSID_OFFSET..BSSID_OFFSET + MAC_LEN].copy_from_slice(address);
    }

    /// Write the SSID length byte and SSID bytes.
    ///
    /// Input longer than [`MAX_SSID_LEN`] is cut. The SSID region past the new
    /// SSID is cleared.
    pub fn set_ssid(&mut self, ssid: &[u8]) {
        let len = ssid.len().min(MAX_SSID_LEN);
        self.buffer[SSID_LENGTH_OFFSET] = len as u8;

        let region = &mut self.buffer[SSID_OFFSET..SSID_OFFSET + MAX_SSID_LEN];
        region[..len].copy_from_slice(&ssid[..len]);
        region[len..].fill(0);
    }

    /// Origin address currently in the source address field
    pub fn origin(&self) -> MacAddress {
        let mut address = [0u8; MAC_LEN];
        address.copy_from_slice(
            &self.buffer[SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + MAC_LEN],
        );
        address
    }

    /// SSID bytes currently in the frame
    pub fn ssid(&self) -> &[u8] {
        let len = self.buffer[SSID_LENGTH_OFFSET] as usize;
        &self.buffer[SSID_OFFSET..SSID_OFFSET + len]
    }

    /// The full frame as it goes to the radio
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.buffer
    }
}

impl Default for BeaconFrame {
    fn default() -> Self {
        Self::new()
    }
}
