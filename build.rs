fn main() {
    // Load .env file for beacon configuration
    load_env_config();

    // Host builds (unit tests) must not see the firmware linker scripts
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if target_arch == "riscv32" {
        linker_be_nice();
        // make sure linkall.x is the last linker script (otherwise might cause problems with flip-link)
        println!("cargo:rustc-link-arg=-Tlinkall.x");
    }
}

/// Load environment configuration from .env file
/// Environment variables take priority over .env file values
fn load_env_config() {
    use std::env;
    use std::path::Path;

    // Tell cargo to rerun this build script if .env file changes
    println!("cargo:rerun-if-changed=.env");

    // Tell cargo to rerun if environment variables change
    println!("cargo:rerun-if-env-changed=BEACON_CHANNEL");
    println!("cargo:rerun-if-env-changed=BEACON_AUTOSTART");

    // Try to load .env file if it exists
    if Path::new(".env").exists() {
        match dotenvy::dotenv() {
            Ok(_) => println!("cargo:warning=Loaded .env file"),
            Err(e) => println!("cargo:warning=Failed to load .env file: {}", e),
        }
    }

    // Empty values fall back to the defaults as well
    let channel = env::var("BEACON_CHANNEL")
        .unwrap_or_else(|_| String::new())
        .trim()
        .to_string();
    let channel = match channel.parse::<u8>() {
        Ok(ch) if (1..=13).contains(&ch) => ch,
        Ok(ch) => {
            println!("cargo:warning=BEACON_CHANNEL {} out of range 1-13, using 1", ch);
            1
        }
        Err(_) => {
            if !channel.is_empty() {
                println!("cargo:warning=BEACON_CHANNEL '{}' is not a number, using 1", channel);
            }
            1
        }
    };

    let autostart = env::var("BEACON_AUTOSTART")
        .unwrap_or_else(|_| String::new())
        .trim()
        .to_ascii_lowercase();
    let autostart = matches!(autostart.as_str(), "1" | "true" | "yes" | "on");

    // Set environment variables for the compilation
    println!("cargo:rustc-env=BEACON_CHANNEL={}", channel);
    println!("cargo:rustc-env=BEACON_AUTOSTART={}", autostart);

    println!("cargo:warning=Beacon channel: {}, autostart: {}", channel, autostart);
}

fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let kind = &args[1];
        let what = &args[2];

        match kind.as_str() {
            "undefined-symbol" => match what.as_str() {
                "_defmt_timestamp" => {
                    eprintln!();
                    eprintln!("💡 `defmt` not found - make sure `defmt.x` is added as a linker script and you have included `use defmt_rtt as _;`");
                    eprintln!();
                }
                "_stack_start" => {
                    eprintln!();
                    eprintln!("💡 Is the linker script `linkall.x` missing?");
                    eprintln!();
                }
                "esp_wifi_preempt_enable"
                | "esp_wifi_preempt_yield_task"
                | "esp_wifi_preempt_task_create" => {
                    eprintln!();
                    eprintln!("💡 `esp-wifi` has no scheduler enabled. Make sure you have the `builtin-scheduler` feature enabled, or that you provide an external scheduler.");
                    eprintln!();
                }
                _ => (),
            },
            // we don't have anything helpful for "missing-lib" yet
            _ => {
                std::process::exit(1);
            }
        }

        std::process::exit(0);
    }

    match std::env::current_exe() {
        Ok(exe) => println!(
            "cargo:rustc-link-arg=--error-handling-script={}",
            exe.display()
        ),
        Err(e) => println!("cargo:warning=Cannot locate build script for linker hints: {}", e),
    }
}
