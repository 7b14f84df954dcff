mod monitor;

use geny::command::ReadbackMode;
use geny::frame::{CommandFrame, CrcMode, ResponseFrame};
use geny::{BenchConfig, Family, TestBench};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::io::{self, BufRead, Write};

// The main entry point for the command-line bench controller.
fn main() -> io::Result<()> {
    // RUST_LOG overrides the default level.
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Warn).env().init() {
        eprintln!("[WARNING] Logging disabled: {}", e);
    }

    println!("==============================");
    println!("  Geny YC99T Bench Controller ");
    println!("==============================");

    // Main menu loop.
    loop {
        println!("\nSelect mode:");
        println!("  1. Frame Inspector");
        println!("  2. Connect to Test Bench");
        println!("  3. Exit");
        let choice = prompt("> ")?;

        match choice.as_str() {
            "1" => run_inspector_mode()?,
            "2" => run_serial_mode()?,
            "3" => break,
            _ => eprintln!("[ERROR] Invalid choice. Please enter 1, 2, or 3."),
        }
    }
    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

// Decodes pasted frames without a port.
fn run_inspector_mode() -> io::Result<()> {
    println!("\n--- Frame Inspector ---");
    println!("Paste a frame as hex, or type 'back' to return to the main menu.");
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let input = line?;
        let input = input.trim();

        if input == "back" {
            break;
        }
        if !input.is_empty() {
            let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
            match hex::decode(&digits) {
                Ok(bytes) => inspect_frame(&bytes),
                Err(e) => eprintln!("[ERROR] Input is not a sequence of hex bytes: {}", e),
            }
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

fn inspect_frame(bytes: &[u8]) {
    match ResponseFrame::decode(bytes, CrcMode::Strict) {
        Ok(frame) => {
            println!(
                "< Response opcode 0x{:04X}, error code 0x{:02X}, {} payload bytes, CRC ok",
                frame.opcode,
                frame.error_code,
                frame.payload.len()
            );
            print_payload(&frame.payload);
            return;
        }
        Err(e) => println!("  not a response frame: {}", e),
    }
    match CommandFrame::decode(bytes, CrcMode::Strict) {
        Ok(frame) => {
            println!(
                "< Command opcode 0x{:02X}, {} payload bytes, CRC ok",
                frame.opcode & 0xFF,
                frame.payload.len()
            );
            print_payload(&frame.payload);
        }
        Err(e) => eprintln!("[ERROR] Not a command frame either: {}", e),
    }
}

// Shows the payload through whichever register set matches its width.
fn print_payload(payload: &[u8]) {
    if let Ok(sample) = geny::SamplingData::decode(payload) {
        println!("{}", sample);
    } else if let Ok(sample) = geny::ErrorSample::decode(payload) {
        println!("{}", sample);
    } else {
        let mut set = geny::calibration::test_configuration_set();
        if set.deserialize(payload).is_ok() {
            print!("{}", set);
            let range = set
                .value("voltage_range")
                .ok()
                .and_then(|v| v.as_u64())
                .and_then(|code| geny::range::voltage_range(Family::Yc99t5c, code as u8).ok());
            if let Some(range) = range {
                println!("voltage range {} ({} V nominal)", range.label, range.nominal);
            }
        }
    }
}

// Connects to the bench and runs the control menu.
fn run_serial_mode() -> io::Result<()> {
    println!("\n--- Serial Mode ---");

    // List available serial ports.
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("[ERROR] Could not enumerate serial ports: {}", e);
            return Ok(());
        }
    };

    if ports.is_empty() {
        eprintln!("[ERROR] No serial ports found.");
        return Ok(());
    }

    println!("Available serial ports:");
    for (i, port) in ports.iter().enumerate() {
        println!("  {}: {}", i, port.port_name);
    }

    // Get user's choice of serial port.
    let port_index: usize = match prompt("Select a port (number): ")?.parse() {
        Ok(i) if i < ports.len() => i,
        _ => {
            eprintln!("[ERROR] Invalid port selection.");
            return Ok(());
        }
    };
    let port_name = &ports[port_index].port_name;

    // Get user's choice of baud rate.
    let baud_rates = [9600, 19200, 38400, 57600, 115200];
    println!("Available baud rates:");
    for (i, &rate) in baud_rates.iter().enumerate() {
        println!("  {}: {}", i, rate);
    }
    let baud_rate = match prompt("Select a baud rate (number, default: 115200): ")?.as_str() {
        "" => 115200,
        s => match s.parse::<usize>() {
            Ok(i) if i < baud_rates.len() => baud_rates[i],
            _ => {
                eprintln!("[ERROR] Invalid baud rate selection.");
                return Ok(());
            }
        },
    };

    let family = match prompt("Instrument family (1: YC99T-5C, 2: YC99T-3C, default: 1): ")?.as_str() {
        "2" => Family::Yc99t3c,
        _ => Family::Yc99t5c,
    };

    let config = BenchConfig {
        family,
        ..BenchConfig::default()
    };
    let mut bench = match TestBench::open(port_name, baud_rate, config) {
        Ok(bench) => bench,
        Err(e) => {
            eprintln!("[ERROR] Failed to open port '{}': {}", port_name, e);
            return Ok(());
        }
    };

    println!("\nConnected to {} on {} at {} baud.", family, port_name, baud_rate);
    run_bench_menu(&mut bench)
}

fn run_bench_menu(bench: &mut TestBench) -> io::Result<()> {
    loop {
        println!("\nSelect action:");
        println!("  1. Login");
        println!("  2. Logout");
        println!("  3. Apply voltage");
        println!("  4. Apply current");
        println!("  5. Read sampling data");
        println!("  6. Read meter errors");
        println!("  7. Live monitor");
        println!("  8. Stop test");
        println!("  9. Back");
        let choice = prompt("> ")?;

        let result = match choice.as_str() {
            "1" => bench.login(),
            "2" => bench.logout(),
            "3" => match read_value("Voltage (V): ")? {
                Some(volts) => bench.set_voltage(volts).and_then(|_| bench.apply()),
                None => continue,
            },
            "4" => match read_value("Current (A): ")? {
                Some(amps) => bench.set_current(amps).and_then(|_| bench.apply()),
                None => continue,
            },
            "5" => bench.read_sampling(ReadbackMode::Once).map(|sample| match sample {
                Some(sample) => println!("{}", sample),
                None => println!("No sampling data returned."),
            }),
            "6" => bench.read_error(ReadbackMode::Once).map(|sample| match sample {
                Some(sample) => println!("{}", sample),
                None => println!("No error data returned."),
            }),
            "7" => {
                monitor::run(bench)?;
                Ok(())
            }
            "8" => bench.stop(),
            "9" => break,
            _ => {
                eprintln!("[ERROR] Invalid choice. Please enter 1 to 9.");
                continue;
            }
        };

        match result {
            Ok(()) => println!("< OK"),
            Err(e) => eprintln!("[ERROR] {}", e),
        }
    }
    Ok(())
}

fn read_value(label: &str) -> io::Result<Option<f64>> {
    let input = prompt(label)?;
    match input.parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            eprintln!("[ERROR] '{}' is not a number.", input);
            Ok(None)
        }
    }
}
