#![cfg_attr(target_arch = "riscv32", no_std)]
#![cfg_attr(target_arch = "riscv32", no_main)]

//! On-device broadcaster self test
//!
//! Runs the command protocol and a few broadcast cycles against the real radio
//! and prints the results on the console.

#[cfg(not(target_arch = "riscv32"))]
fn main() {
    println!("beacon_selftest runs on the ESP32-C3 only");
}

#[cfg(target_arch = "riscv32")]
mod selftest {
    use beacon_board_rs::broadcaster::{BroadcastStatus, Broadcaster, CycleReport};
    use beacon_board_rs::config;
    use beacon_board_rs::frame::FRAME_LEN;
    use beacon_board_rs::wifi::{HardwareRng, RadioManager, RawFrameSink};
    use embassy_futures::block_on;
    use embassy_time::Delay;
    use esp_hal::clock::CpuClock;
    use esp_hal::rng::Rng;
    use esp_hal::timer::timg::TimerGroup;
    use esp_println::{Printer, println};
    use esp_wifi::wifi;
    use static_cell::StaticCell;

    // Add app descriptor for espflash compatibility
    esp_bootloader_esp_idf::esp_app_desc!();

    static WIFI_INIT_CELL: StaticCell<esp_wifi::EspWifiController<'static>> = StaticCell::new();

    /// Broadcast cycles run against the radio
    const RADIO_CYCLES: u32 = 20;

    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        println!("❌ Self test failed: {}", info);
        loop {}
    }

    #[esp_hal::main]
    fn main() -> ! {
        let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
        let peripherals = esp_hal::init(config);

        // Initialize heap allocator for WiFi
        esp_alloc::heap_allocator!(size: 72 * 1024);

        let timer_group0 = TimerGroup::new(peripherals.TIMG0);
        esp_hal_embassy::init(timer_group0.timer0);

        println!("=== Beacon broadcaster self test ===");

        let mut broadcaster = Broadcaster::new();
        let mut out = Printer;

        println!("\n1. Initial state");
        assert_eq!(broadcaster.status(), BroadcastStatus::Inactive);
        println!("✅ Broadcasting inactive after boot");

        println!("\n2. Command protocol");
        broadcaster.handle_line(b"set 3 Guest_Net", &mut out).ok();
        assert_eq!(broadcaster.labels().nth(3), Some((3, "Guest_Net")));
        broadcaster.handle_line(b"list", &mut out).ok();
        assert!(broadcaster.handle_line(b"set 3", &mut out).is_err());
        assert!(broadcaster.handle_line(b"launch", &mut out).is_err());
        assert_eq!(broadcaster.labels().nth(3), Some((3, "Guest_Net")));
        println!("✅ set/list/rejections behave");

        println!("\n3. Start/stop");
        broadcaster.handle_line(b"start", &mut out).ok();
        broadcaster.handle_line(b"start", &mut out).ok();
        broadcaster.handle_line(b"stop", &mut out).ok();
        broadcaster.handle_line(b"status", &mut out).ok();
        assert_eq!(broadcaster.status(), BroadcastStatus::Inactive);
        println!("✅ start/start/stop leaves broadcasting inactive");

        println!("\n4. Radio bring-up");
        let timer_group1 = TimerGroup::new(peripherals.TIMG1);
        let rng = Rng::new(peripherals.RNG);
        let mut addresses = HardwareRng::new(rng.clone());
        let wifi_init = match esp_wifi::init(timer_group1.timer0, rng, peripherals.RADIO_CLK) {
            Ok(wifi_init) => WIFI_INIT_CELL.init(wifi_init),
            Err(e) => panic!("WiFi driver init failed: {:?}", e),
        };
        let (controller, interfaces) = match wifi::new(wifi_init, peripherals.WIFI) {
            Ok(parts) => parts,
            Err(e) => panic!("WiFi controller creation failed: {:?}", e),
        };
        let mut radio = RadioManager::new(controller);
        assert!(radio.start().is_ok(), "radio did not start");
        assert!(radio.is_started());
        let mut sink = RawFrameSink::new(interfaces.sniffer);
        println!("✅ Radio started on channel {}", config::WIFI_CHANNEL);

        println!("\n5. Inactive cycle");
        let report = block_on(broadcaster.run_cycle(&mut sink, &mut addresses, &mut Delay));
        assert_eq!(report, CycleReport::default());
        println!("✅ No frames while inactive");

        println!("\n6. {} broadcast cycles", RADIO_CYCLES);
        broadcaster.start();
        let mut total = CycleReport::default();
        for _ in 0..RADIO_CYCLES {
            let report = block_on(broadcaster.run_cycle(&mut sink, &mut addresses, &mut Delay));
            total.sent += report.sent;
            total.failed += report.failed;
        }
        println!(
            "   {} frames of {} bytes sent, {} refused",
            total.sent, FRAME_LEN, total.failed
        );
        assert_eq!(
            total.sent + total.failed,
            RADIO_CYCLES * config::LABEL_COUNT as u32
        );
        assert!(total.sent > 0, "radio refused every frame");
        println!("✅ One frame per label per cycle");

        broadcaster.stop();
        radio.stop().ok();
        assert!(!radio.is_started());

        println!("\n=== All self tests passed! ===");

        loop {
            core::hint::spin_loop();
        }
    }
}
