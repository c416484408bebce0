#![cfg_attr(target_arch = "riscv32", no_std)]
#![cfg_attr(target_arch = "riscv32", no_main)]

//! Beacon board firmware
//!
//! Tasks:
//! - `serial_task` turns UART0 input into command lines
//! - `beacon_task` owns the broadcaster, applies commands and transmits frames
//! - `led_task` shows the broadcaster state on the on-board WS2812

#[cfg(not(target_arch = "riscv32"))]
fn main() {
    println!(
        "beacon-board-rs {} is ESP32-C3 firmware, build it with --target riscv32imc-unknown-none-elf",
        beacon_board_rs::VERSION
    );
}

#[cfg(target_arch = "riscv32")]
mod firmware {
    use beacon_board_rs::broadcaster::{BroadcastStatus, Broadcaster};
    use beacon_board_rs::command::HELP;
    use beacon_board_rs::serial::{self, CommandChannel};
    use beacon_board_rs::status_led::{LedStatus, StatusIndicator, StatusLed};
    use beacon_board_rs::wifi::{HardwareRng, RadioManager, RawFrameSink};
    use beacon_board_rs::{BeaconError, config};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::signal::Signal;
    use embassy_time::{Delay, Duration, Timer};
    use esp_hal::Async;
    use esp_hal::clock::CpuClock;
    use esp_hal::gpio::Level;
    use esp_hal::rmt::{Rmt, TxChannelConfig, TxChannelCreator};
    use esp_hal::rng::Rng;
    use esp_hal::time::Rate;
    use esp_hal::timer::timg::TimerGroup;
    use esp_hal::uart::{Config as UartConfig, Uart, UartRx};
    use esp_hal_embassy::Executor;
    use esp_println::{Printer, println};
    use esp_wifi::wifi;
    use static_cell::StaticCell;

    // Add app descriptor for espflash compatibility
    esp_bootloader_esp_idf::esp_app_desc!();

    // Static cells for embassy components
    static WIFI_INIT_CELL: StaticCell<esp_wifi::EspWifiController<'static>> = StaticCell::new();
    static RADIO_CELL: StaticCell<RadioManager<'static>> = StaticCell::new();
    static EXECUTOR: StaticCell<Executor> = StaticCell::new();

    // Command lines from the serial task to the beacon task
    static COMMANDS: CommandChannel = CommandChannel::new();

    // Latest state for the LED task
    static LED_STATUS: Signal<CriticalSectionRawMutex, LedStatus> = Signal::new();

    type StatusLedType = StatusLed<esp_hal::rmt::Channel<esp_hal::Blocking, 0>>;

    /// Broadcast cycles between two statistics lines
    const STATS_EVERY_CYCLES: u32 = 1000;

    /// LED refresh period
    const LED_REFRESH_MS: u64 = 50;

    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        println!("[PANIC] {}", info);
        loop {}
    }

    fn led_status_for(broadcaster: &Broadcaster) -> LedStatus {
        match broadcaster.status() {
            BroadcastStatus::Active => LedStatus::Broadcasting,
            BroadcastStatus::Inactive => LedStatus::Idle,
        }
    }

    /// Serial console reader
    #[embassy_executor::task]
    async fn serial_task(rx: UartRx<'static, Async>) -> ! {
        println!("[SERIAL] Listening for commands");
        serial::read_commands(rx, COMMANDS.sender()).await
    }

    /// Broadcaster loop: commands are only applied between cycles
    #[embassy_executor::task]
    async fn beacon_task(mut sink: RawFrameSink, mut addresses: HardwareRng) -> ! {
        let mut broadcaster = Broadcaster::new();
        let mut receiver = COMMANDS.receiver();
        let mut out = Printer;
        let mut delay = Delay;
        let mut cycles: u32 = 0;

        if config::AUTOSTART {
            println!("[BEACON] Autostart enabled");
            broadcaster.start();
        }

        let mut led_status = led_status_for(&broadcaster);
        LED_STATUS.signal(led_status);

        loop {
            if broadcaster.is_active() {
                let report = broadcaster
                    .tick(&mut receiver, &mut out, &mut sink, &mut addresses, &mut delay)
                    .await;

                if !report.is_idle() {
                    cycles = cycles.wrapping_add(1);
                    if cycles % STATS_EVERY_CYCLES == 0 {
                        let (sent, failed) = sink.totals();
                        println!(
                            "[BEACON] {} cycles, {} frames sent, {} failed",
                            cycles, sent, failed
                        );
                    }
                }
            } else {
                // Nothing to transmit, sleep until the next command
                let input = receiver.receive().await;
                // Rejections are already reported on the console
                let _ = broadcaster.handle_input(input, &mut out);
            }

            let status = led_status_for(&broadcaster);
            if status != led_status {
                led_status = status;
                LED_STATUS.signal(status);
            }
        }
    }

    /// Status LED refresh
    #[embassy_executor::task]
    async fn led_task(mut led: StatusLedType) -> ! {
        let mut indicator = StatusIndicator::new();
        let mut reported = false;

        loop {
            if let Some(status) = LED_STATUS.try_take() {
                indicator.set_status(status);
            }

            if let Err(e) = led.write(indicator.next_color()) {
                if !reported {
                    println!("[LED] ❌ Status LED write failed: {:?}", e);
                    reported = true;
                }
            }

            Timer::after(Duration::from_millis(LED_REFRESH_MS)).await;
        }
    }

    #[esp_hal::main]
    fn main() -> ! {
        let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
        let peripherals = esp_hal::init(config);

        esp_println::logger::init_logger(log::LevelFilter::Info);

        // Initialize heap allocator for WiFi (72KB)
        esp_alloc::heap_allocator!(size: 72 * 1024);

        println!("[MAIN] beacon-board-rs {}", beacon_board_rs::VERSION);

        // Initialize embassy time system
        let timer_group0 = TimerGroup::new(peripherals.TIMG0);
        esp_hal_embassy::init(timer_group0.timer0);

        // Status LED on the on-board WS2812
        println!(
            "[LED] Initializing status LED on GPIO{}...",
            config::STATUS_LED_PIN
        );
        let status_led: Option<StatusLedType> = match Rmt::new(peripherals.RMT, Rate::from_mhz(10))
        {
            Ok(rmt) => {
                let tx_config = TxChannelConfig::default()
                    .with_clk_divider(1)
                    .with_idle_output_level(Level::Low)
                    .with_idle_output(false)
                    .with_carrier_modulation(false);

                match rmt.channel0.configure(peripherals.GPIO8, tx_config) {
                    Ok(channel) => {
                        println!("[LED] ✅ Status LED ready");
                        Some(StatusLed::new(channel))
                    }
                    Err(e) => {
                        println!("[LED] ❌ Failed to configure RMT channel: {:?}", e);
                        None
                    }
                }
            }
            Err(e) => {
                println!("[LED] ❌ Failed to initialize RMT: {:?}", e);
                None
            }
        };

        // Serial console on UART0
        let uart_config = UartConfig::default().with_baudrate(config::SERIAL_BAUDRATE);
        let console_rx = match Uart::new(peripherals.UART0, uart_config) {
            Ok(uart) => {
                let uart = uart
                    .with_rx(peripherals.GPIO20)
                    .with_tx(peripherals.GPIO21)
                    .into_async();
                let (rx, _tx) = uart.split();
                println!("[SERIAL] UART0 ready at {} baud", config::SERIAL_BAUDRATE);
                Some(rx)
            }
            Err(e) => {
                println!("[SERIAL] ❌ Failed to configure UART0: {:?}", e);
                None
            }
        };

        // Radio bring-up
        let timer_group1 = TimerGroup::new(peripherals.TIMG1);
        let rng = Rng::new(peripherals.RNG);
        let addresses = HardwareRng::new(rng.clone());
        let wifi_peripheral = peripherals.WIFI;

        let radio = esp_wifi::init(timer_group1.timer0, rng, peripherals.RADIO_CLK)
            .map_err(|e| {
                println!("[WIFI] ❌ WiFi driver init failed: {:?}", e);
                BeaconError::WiFiError
            })
            .and_then(|wifi_init| {
                println!("[WIFI] WiFi driver initialized successfully");
                let wifi_init = WIFI_INIT_CELL.init(wifi_init);
                wifi::new(wifi_init, wifi_peripheral).map_err(|e| {
                    println!("[WIFI] ❌ WiFi controller creation failed: {:?}", e);
                    BeaconError::WiFiError
                })
            })
            .and_then(|(controller, interfaces)| {
                let radio = RADIO_CELL.init(RadioManager::new(controller));
                radio.start()?;
                Ok(RawFrameSink::new(interfaces.sniffer))
            });

        println!("{}", HELP);

        // Initialize embassy executor and run tasks
        let executor = EXECUTOR.init(Executor::new());
        executor.run(|spawner| {
            if let Some(led) = status_led {
                println!("[MAIN] Spawning LED task...");
                spawner.spawn(led_task(led)).ok();
            }

            let sink = match radio {
                Ok(sink) => sink,
                Err(_) => {
                    println!("[MAIN] ❌ Radio unavailable, beacon functions disabled");
                    LED_STATUS.signal(LedStatus::RadioError);
                    return;
                }
            };

            match console_rx {
                Some(rx) => {
                    println!("[MAIN] Spawning serial task...");
                    spawner.spawn(serial_task(rx)).ok();
                }
                None => println!("[MAIN] ❌ No console, commands unavailable"),
            }

            println!("[MAIN] Spawning beacon task...");
            match spawner.spawn(beacon_task(sink, addresses)) {
                Ok(_) => println!("[MAIN] ✅ Beacon task spawned successfully"),
                Err(e) => println!("[MAIN] ❌ Failed to spawn beacon task: {:?}", e),
            }
        });
    }
}
