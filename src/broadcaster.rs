//! Beacon broadcaster
//!
//! Owns the label table, the frame buffer and the broadcast flag. Everything
//! it talks to (radio, randomness, console, pacing) is passed in per call so
//! the same code runs against the ESP32-C3 radio and against test doubles.

use crate::command::{Command, HELP, Input};
use crate::frame::{BeaconFrame, FRAME_LEN, MacAddress};
use crate::labels::LabelTable;
use crate::{BeaconError, config};
use core::fmt::Write;
use embedded_hal_async::delay::DelayNs;

/// Radio interface a frame is sent on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    Station,
    AccessPoint,
}

/// Destination for prepared frames. Fire-and-forget: an `Err` is counted,
/// never retried.
pub trait FrameSink {
    fn send(&mut self, interface: Interface, frame: &[u8; FRAME_LEN]) -> Result<(), BeaconError>;
}

/// Source of origin addresses, one per transmitted frame
pub trait AddressGenerator {
    fn generate(&mut self) -> MacAddress;
}

/// Non-blocking source of console lines
pub trait CommandSource {
    /// Next complete line or discarded-line rejection, `None` when nothing is waiting
    fn poll_line(&mut self) -> Option<Input>;
}

impl<M, const N: usize> CommandSource for embassy_sync::channel::Receiver<'_, M, Input, N>
where
    M: embassy_sync::blocking_mutex::raw::RawMutex,
{
    fn poll_line(&mut self) -> Option<Input> {
        self.try_receive().ok()
    }
}

/// Whether frames are being transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastStatus {
    Active,
    Inactive,
}

/// Outcome of one broadcast cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Frames the sink accepted
    pub sent: u32,
    /// Frames the sink refused
    pub failed: u32,
}

impl CycleReport {
    /// True when the cycle did nothing (broadcasting inactive)
    pub fn is_idle(&self) -> bool {
        self.sent == 0 && self.failed == 0
    }
}

/// Beacon broadcaster state
pub struct Broadcaster {
    labels: LabelTable,
    frame: BeaconFrame,
    interface: Interface,
    active: bool,
}

impl Broadcaster {
    /// Create an inactive broadcaster with the default labels, sending on the
    /// access point interface
    pub fn new() -> Self {
        Self::with_interface(Interface::AccessPoint)
    }

    /// Create an inactive broadcaster sending on `interface`
    pub fn with_interface(interface: Interface) -> Self {
        Self {
            labels: LabelTable::new(),
            frame: BeaconFrame::new(),
            interface,
            active: false,
        }
    }

    /// Interface frames are handed to the sink on
    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Replace the label at `index`, returning the stored text
    pub fn set_label(&mut self, index: usize, text: &str) -> Result<&str, BeaconError> {
        let label = self.labels.set(index, text)?;
        log::info!("[BEACON] SSID {} set to '{}'", index, label);
        Ok(label)
    }

    /// Current labels in index order
    pub fn labels(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter()
    }

    pub fn start(&mut self) {
        if !self.active {
            log::info!("[BEACON] Broadcasting started");
        }
        self.active = true;
    }

    pub fn stop(&mut self) {
        if self.active {
            log::info!("[BEACON] Broadcasting stopped");
        }
        self.active = false;
    }

    pub fn status(&self) -> BroadcastStatus {
        if self.active {
            BroadcastStatus::Active
        } else {
            BroadcastStatus::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Write the label at `index` and a fresh origin address into the frame
    pub fn prepare_frame<G: AddressGenerator>(
        &mut self,
        index: usize,
        addresses: &mut G,
    ) -> Result<&[u8; FRAME_LEN], BeaconError> {
        let label = self.labels.get(index).ok_or(BeaconError::InvalidIndex)?;
        let origin = addresses.generate();
        self.frame.set_origin(&origin);
        self.frame.set_ssid(label.as_bytes());
        Ok(self.frame.as_bytes())
    }

    /// Transmit one frame per label, in index order, on [`Self::interface`].
    ///
    /// Does nothing while inactive. Each frame gets its own random origin
    /// address and is followed by a [`config::EMIT_INTERVAL_US`] pause.
    pub async fn run_cycle<S, G, D>(
        &mut self,
        sink: &mut S,
        addresses: &mut G,
        delay: &mut D,
    ) -> CycleReport
    where
        S: FrameSink,
        G: AddressGenerator,
        D: DelayNs,
    {
        let mut report = CycleReport::default();
        if !self.active {
            return report;
        }

        let interface = self.interface;
        for index in 0..config::LABEL_COUNT {
            let frame = match self.prepare_frame(index, addresses) {
                Ok(frame) => frame,
                Err(_) => continue,
            };
            match sink.send(interface, frame) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    log::debug!("[BEACON] Frame {} not sent: {:?}", index, e);
                }
            }
            delay.delay_us(config::EMIT_INTERVAL_US).await;
        }

        report
    }

    /// Execute one console line, writing the reply or rejection notice to `out`
    pub fn handle_line<W: Write>(&mut self, line: &[u8], out: &mut W) -> Result<(), BeaconError> {
        let result = match Command::parse_bytes(line) {
            Ok(Some(command)) => self.execute(command, out),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            Self::reject(e, out);
        }
        result
    }

    /// Execute a line from the console, or report why it was discarded
    pub fn handle_input<W: Write>(&mut self, input: Input, out: &mut W) -> Result<(), BeaconError> {
        match input {
            Ok(line) => self.handle_line(&line, out),
            Err(e) => {
                Self::reject(e, out);
                Err(e)
            }
        }
    }

    fn reject<W: Write>(error: BeaconError, out: &mut W) {
        log::debug!("[BEACON] Rejected command: {:?}", error);
        writeln!(out, "{}", error).ok();
    }

    fn execute<W: Write>(&mut self, command: Command<'_>, out: &mut W) -> Result<(), BeaconError> {
        match command {
            Command::Start => {
                self.start();
                writeln!(out, "Broadcasting started").ok();
            }
            Command::Stop => {
                self.stop();
                writeln!(out, "Broadcasting stopped").ok();
            }
            Command::List => {
                writeln!(out, "Current SSIDs:").ok();
                for (index, label) in self.labels() {
                    writeln!(out, "{}: {}", index, label).ok();
                }
            }
            Command::Status => {
                let status = match self.status() {
                    BroadcastStatus::Active => "Active",
                    BroadcastStatus::Inactive => "Stopped",
                };
                writeln!(out, "Broadcasting: {}", status).ok();
            }
            Command::Help => {
                writeln!(out, "{}", HELP).ok();
            }
            Command::Set { index, text } => {
                let label = self.set_label(index, text)?;
                writeln!(out, "Updated SSID at position {} to: {}", index, label).ok();
            }
        }
        Ok(())
    }

    /// Apply every waiting command line, then run one cycle if active
    pub async fn tick<C, W, S, G, D>(
        &mut self,
        input: &mut C,
        out: &mut W,
        sink: &mut S,
        addresses: &mut G,
        delay: &mut D,
    ) -> CycleReport
    where
        C: CommandSource,
        W: Write,
        S: FrameSink,
        G: AddressGenerator,
        D: DelayNs,
    {
        while let Some(line) = input.poll_line() {
            // Rejections are already reported on `out`
            let _ = self.handle_input(line, out);
        }
        self.run_cycle(sink, addresses, delay).await
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Line, LineAssembler};
    use crate::frame::{BSSID_OFFSET, MAC_LEN, SOURCE_ADDRESS_OFFSET, SSID_LENGTH_OFFSET, SSID_OFFSET};
    use embassy_futures::block_on;
    use std::collections::{HashSet, VecDeque};
    use std::string::String;
    use std::vec::Vec;

    struct RecordingSink {
        frames: Vec<(Interface, [u8; FRAME_LEN])>,
        refuse: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { frames: Vec::new(), refuse: false }
        }
    }

    impl FrameSink for RecordingSink {
        fn send(&mut self, interface: Interface, frame: &[u8; FRAME_LEN]) -> Result<(), BeaconError> {
            if self.refuse {
                return Err(BeaconError::TransmitError);
            }
            self.frames.push((interface, *frame));
            Ok(())
        }
    }

    /// xorshift64*, good enough to look random to a frame
    struct XorShift(u64);

    impl AddressGenerator for XorShift {
        fn generate(&mut self) -> MacAddress {
            self.0 ^= self.0 >> 12;
            self.0 ^= self.0 << 25;
            self.0 ^= self.0 >> 27;
            let value = self.0.wrapping_mul(0x2545_f491_4f6c_dd1d).to_le_bytes();
            let mut address = [0u8; MAC_LEN];
            address.copy_from_slice(&value[..MAC_LEN]);
            address
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_us: u64,
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_us += u64::from(ns) / 1_000;
        }
    }

    struct Lines(VecDeque<Input>);

    impl Lines {
        fn new(lines: &[&str]) -> Self {
            Self(
                lines
                    .iter()
                    .map(|l| Ok(Line::from_slice(l.as_bytes()).unwrap()))
                    .collect(),
            )
        }

        /// Feed raw console bytes through a line assembler
        fn typed(bytes: &[u8]) -> Self {
            let mut lines = VecDeque::new();
            LineAssembler::new().extend(bytes, |line| lines.push_back(line));
            Self(lines)
        }
    }

    impl CommandSource for Lines {
        fn poll_line(&mut self) -> Option<Input> {
            self.0.pop_front()
        }
    }

    fn run(broadcaster: &mut Broadcaster, sink: &mut RecordingSink) -> CycleReport {
        block_on(broadcaster.run_cycle(sink, &mut XorShift(0x1234_5678), &mut CountingDelay::default()))
    }

    #[test]
    fn starts_inactive() {
        let broadcaster = Broadcaster::new();
        assert_eq!(broadcaster.status(), BroadcastStatus::Inactive);
    }

    #[test]
    fn start_stop_are_idempotent() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.start();
        broadcaster.start();
        assert_eq!(broadcaster.status(), BroadcastStatus::Active);
        broadcaster.stop();
        assert_eq!(broadcaster.status(), BroadcastStatus::Inactive);
        broadcaster.stop();
        assert_eq!(broadcaster.status(), BroadcastStatus::Inactive);
    }

    #[test]
    fn inactive_cycle_emits_nothing() {
        let mut broadcaster = Broadcaster::new();
        let mut sink = RecordingSink::new();

        let report = run(&mut broadcaster, &mut sink);

        assert!(report.is_idle());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn active_cycle_emits_one_frame_per_label() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.set_label(5, "Guest_Net").unwrap();
        broadcaster.start();
        let mut sink = RecordingSink::new();
        let mut delay = CountingDelay::default();

        let report = block_on(broadcaster.run_cycle(&mut sink, &mut XorShift(7), &mut delay));

        assert_eq!(report, CycleReport { sent: 10, failed: 0 });
        assert_eq!(sink.frames.len(), config::LABEL_COUNT);
        for ((interface, frame), (index, label)) in sink.frames.iter().zip(broadcaster.labels()) {
            assert_eq!(*interface, Interface::AccessPoint, "frame {}", index);
            assert_eq!(frame.len(), FRAME_LEN);
            assert_eq!(frame[SSID_LENGTH_OFFSET] as usize, label.len(), "frame {}", index);
            assert_eq!(&frame[SSID_OFFSET..SSID_OFFSET + label.len()], label.as_bytes());
            assert_eq!(
                &frame[SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + MAC_LEN],
                &frame[BSSID_OFFSET..BSSID_OFFSET + MAC_LEN]
            );
        }
        assert_eq!(&sink.frames[5].1[SSID_OFFSET..SSID_OFFSET + 9], b"Guest_Net");
        // One pause per frame
        assert_eq!(delay.total_us, 10 * u64::from(config::EMIT_INTERVAL_US));
    }

    #[test]
    fn origin_addresses_differ_across_cycles() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.start();
        let mut sink = RecordingSink::new();
        let mut addresses = XorShift(0xdead_beef);
        let mut delay = CountingDelay::default();

        for _ in 0..200 {
            block_on(broadcaster.run_cycle(&mut sink, &mut addresses, &mut delay));
        }

        let origins: HashSet<[u8; MAC_LEN]> = sink
            .frames
            .iter()
            .map(|(_, frame)| {
                let mut origin = [0u8; MAC_LEN];
                origin.copy_from_slice(&frame[SOURCE_ADDRESS_OFFSET..SOURCE_ADDRESS_OFFSET + MAC_LEN]);
                origin
            })
            .collect();
        assert_eq!(origins.len(), 200 * config::LABEL_COUNT);
    }

    #[test]
    fn refused_frames_are_counted_and_cycle_completes() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.start();
        let mut sink = RecordingSink::new();
        sink.refuse = true;

        let report = run(&mut broadcaster, &mut sink);

        assert_eq!(report, CycleReport { sent: 0, failed: 10 });
        assert!(broadcaster.is_active());
    }

    #[test]
    fn set_then_list_shows_new_label() {
        let mut broadcaster = Broadcaster::new();
        let mut out = String::new();

        broadcaster.handle_line(b"set 3 Guest_Net", &mut out).unwrap();
        broadcaster.handle_line(b"list", &mut out).unwrap();

        assert!(out.starts_with("Updated SSID at position 3 to: Guest_Net\n"));
        assert!(out.contains("Current SSIDs:\n"));
        assert!(out.contains("\n3: Guest_Net\n"));
        assert!(out.contains("\n0: Network_1\n"));
    }

    #[test]
    fn status_reports_active_and_stopped() {
        let mut broadcaster = Broadcaster::new();
        let mut out = String::new();

        broadcaster.handle_line(b"status", &mut out).unwrap();
        broadcaster.handle_line(b"start", &mut out).unwrap();
        broadcaster.handle_line(b"status", &mut out).unwrap();
        broadcaster.handle_line(b"stop", &mut out).unwrap();

        assert_eq!(
            out,
            "Broadcasting: Stopped\nBroadcasting started\nBroadcasting: Active\nBroadcasting stopped\n"
        );
    }

    #[test]
    fn rejections_print_notice_and_change_nothing() {
        let mut broadcaster = Broadcaster::new();
        let before: Vec<String> = broadcaster.labels().map(|(_, l)| l.into()).collect();
        let mut out = String::new();

        assert_eq!(
            broadcaster.handle_line(b"set x Nope", &mut out),
            Err(BeaconError::InvalidIndex)
        );
        assert_eq!(
            broadcaster.handle_line(b"set 2", &mut out),
            Err(BeaconError::InvalidLabelLength)
        );
        assert_eq!(
            broadcaster.handle_line(b"set 2 0123456789012345678901234567890", &mut out),
            Err(BeaconError::InvalidLabelLength)
        );
        assert_eq!(
            broadcaster.handle_line(b"launch", &mut out),
            Err(BeaconError::UnknownCommand)
        );

        let after: Vec<String> = broadcaster.labels().map(|(_, l)| l.into()).collect();
        assert_eq!(before, after);
        assert!(!broadcaster.is_active());
        assert_eq!(out.lines().count(), 4);
        assert!(out.lines().all(|l| l.starts_with("Invalid") || l.starts_with("Unknown")));
    }

    #[test]
    fn blank_line_is_silent() {
        let mut broadcaster = Broadcaster::new();
        let mut out = String::new();
        assert_eq!(broadcaster.handle_line(b"   ", &mut out), Ok(()));
        assert!(out.is_empty());
    }

    #[test]
    fn help_prints_command_summary() {
        let mut broadcaster = Broadcaster::new();
        let mut out = String::new();
        broadcaster.handle_line(b"help", &mut out).unwrap();
        assert!(out.contains("set <position> <name>"));
    }

    #[test]
    fn tick_applies_commands_before_cycle() {
        let mut broadcaster = Broadcaster::new();
        let mut input = Lines::new(&["set 0 First", "start"]);
        let mut out = String::new();
        let mut sink = RecordingSink::new();

        let report = block_on(broadcaster.tick(
            &mut input,
            &mut out,
            &mut sink,
            &mut XorShift(99),
            &mut CountingDelay::default(),
        ));

        assert_eq!(report.sent, 10);
        assert_eq!(&sink.frames[0].1[SSID_OFFSET..SSID_OFFSET + 5], b"First");
        assert!(input.poll_line().is_none());
    }

    #[test]
    fn tick_with_stop_skips_cycle() {
        let mut broadcaster = Broadcaster::new();
        broadcaster.start();
        let mut input = Lines::new(&["stop"]);
        let mut out = String::new();
        let mut sink = RecordingSink::new();

        let report = block_on(broadcaster.tick(
            &mut input,
            &mut out,
            &mut sink,
            &mut XorShift(1),
            &mut CountingDelay::default(),
        ));

        assert!(report.is_idle());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn channel_receiver_is_a_command_source() {
        use embassy_sync::blocking_mutex::raw::NoopRawMutex;
        use embassy_sync::channel::Channel;

        let channel: Channel<NoopRawMutex, Input, 4> = Channel::new();
        channel.try_send(Ok(Line::from_slice(b"start").unwrap())).unwrap();
        channel.try_send(Err(BeaconError::SerialError)).unwrap();
        let mut receiver = channel.receiver();

        let line = receiver.poll_line().unwrap();
        assert_eq!(line.as_deref(), Ok(&b"start"[..]));
        assert_eq!(receiver.poll_line(), Some(Err(BeaconError::SerialError)));
        assert_eq!(receiver.poll_line(), None);
    }

    fn tick(broadcaster: &mut Broadcaster, input: &mut Lines, out: &mut String) -> RecordingSink {
        let mut sink = RecordingSink::new();
        block_on(broadcaster.tick(
            input,
            out,
            &mut sink,
            &mut XorShift(7),
            &mut CountingDelay::default(),
        ));
        sink
    }

    #[test]
    fn overlong_start_line_does_not_start() {
        let mut broadcaster = Broadcaster::new();
        let mut line = std::vec::Vec::from(&b"start"[..]);
        line.extend(std::iter::repeat_n(b' ', 70));
        line.extend_from_slice(b"x\n");
        let mut out = String::new();

        let sink = tick(&mut broadcaster, &mut Lines::typed(&line), &mut out);

        assert_eq!(broadcaster.status(), BroadcastStatus::Inactive);
        assert!(sink.frames.is_empty());
        assert_eq!(out, format!("{}\n", BeaconError::UnknownCommand));
    }

    #[test]
    fn overlong_set_line_leaves_label_unchanged() {
        let mut broadcaster = Broadcaster::new();
        let mut line = std::vec::Vec::from(&b"set 1 Guest"[..]);
        line.extend(std::iter::repeat_n(b' ', 70));
        line.extend_from_slice(b"TAIL\n");
        let mut out = String::new();

        tick(&mut broadcaster, &mut Lines::typed(&line), &mut out);

        assert_eq!(broadcaster.labels().nth(1), Some((1, "Free_WiFi_2")));
        assert_eq!(out, format!("{}\n", BeaconError::InvalidLabelLength));
    }

    #[test]
    fn serial_error_is_reported_and_next_line_runs() {
        let mut broadcaster = Broadcaster::new();
        let mut input = Lines::new(&["start"]);
        input.0.push_front(Err(BeaconError::SerialError));
        let mut out = String::new();

        let sink = tick(&mut broadcaster, &mut input, &mut out);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, ["Serial input error, line discarded", "Broadcasting started"]);
        assert_eq!(sink.frames.len(), config::LABEL_COUNT);
    }

    #[test]
    fn frames_go_out_on_the_configured_interface() {
        let mut broadcaster = Broadcaster::with_interface(Interface::Station);
        assert_eq!(broadcaster.interface(), Interface::Station);
        broadcaster.start();
        let mut sink = RecordingSink::new();

        run(&mut broadcaster, &mut sink);

        assert_eq!(sink.frames.len(), config::LABEL_COUNT);
        assert!(sink.frames.iter().all(|(i, _)| *i == Interface::Station));
        assert_eq!(Broadcaster::new().interface(), Interface::AccessPoint);
    }
}
