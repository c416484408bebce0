//! Serial console input
//!
//! Reads UART0, assembles bytes into command lines and hands complete lines to
//! the beacon task through a channel.

use crate::command::{Input, LineAssembler};
use crate::{BeaconError, config};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use esp_hal::Async;
use esp_hal::uart::UartRx;

/// Channel carrying command lines from the serial reader to the beacon task
pub type CommandChannel = Channel<CriticalSectionRawMutex, Input, { config::COMMAND_QUEUE_DEPTH }>;

/// Sending half of [`CommandChannel`]
pub type CommandSender = Sender<'static, CriticalSectionRawMutex, Input, { config::COMMAND_QUEUE_DEPTH }>;

/// Read the console forever, forwarding each complete line.
///
/// A read error drops the line being assembled and forwards
/// [`BeaconError::SerialError`] so the operator sees it was lost.
pub async fn read_commands(mut rx: UartRx<'static, Async>, commands: CommandSender) -> ! {
    let mut assembler = LineAssembler::new();
    let mut buffer = [0u8; 32];

    loop {
        match rx.read_async(&mut buffer).await {
            Ok(len) => {
                for &byte in &buffer[..len] {
                    if let Some(input) = assembler.push(byte) {
                        // Waits when the beacon task is behind
                        commands.send(input).await;
                    }
                }
            }
            Err(e) => {
                log::warn!("[SERIAL] Read error: {:?}", e);
                assembler.discard();
                commands.send(Err(BeaconError::SerialError)).await;
            }
        }
    }
}
