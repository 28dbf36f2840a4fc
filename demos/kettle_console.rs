//! Interactive kettle console
//!
//! Reads commands from stdin and runs them against one kettle. Commands are
//! looked up in a fixed table; anything else is rejected.
//!
//! Run with: cargo run --example kettle_console
//!
//! To connect to a specific kettle:
//!   cargo run --example kettle_console -- --address C4:12:34:56:78:9A

use futures::future::BoxFuture;
use stagg_rust_ble::{
    format_temperature, ClockMode, Error, Kettle, Result, ScheduleMode, SessionConfig,
    StateRecord, Units,
};
use std::io::Write;
use std::str::FromStr;

type Handler = for<'a> fn(&'a Kettle, &'a [&'a str]) -> BoxFuture<'a, Result<StateRecord>>;

struct ConsoleCommand {
    name: &'static str,
    usage: &'static str,
    help: &'static str,
    handler: Handler,
}

const COMMANDS: &[ConsoleCommand] = &[
    ConsoleCommand {
        name: "state",
        usage: "state",
        help: "Read the current state",
        handler: |kettle, _| Box::pin(kettle.get_state()),
    },
    ConsoleCommand {
        name: "temp",
        usage: "temp <celsius>",
        help: "Set the target temperature",
        handler: |kettle, args| {
            Box::pin(async move { kettle.set_target_temperature(arg(args, 0, "celsius")?).await })
        },
    },
    ConsoleCommand {
        name: "hold",
        usage: "hold <minutes>",
        help: "Set the hold time (0-60, 0 disables)",
        handler: |kettle, args| {
            Box::pin(async move { kettle.set_hold_time(arg(args, 0, "minutes")?).await })
        },
    },
    ConsoleCommand {
        name: "chime",
        usage: "chime <0-10>",
        help: "Set the chime volume",
        handler: |kettle, args| {
            Box::pin(async move { kettle.set_chime_volume(arg(args, 0, "level")?).await })
        },
    },
    ConsoleCommand {
        name: "preboil",
        usage: "preboil <on|off>",
        help: "Enable or disable pre-boil",
        handler: |kettle, args| {
            Box::pin(async move { kettle.set_pre_boil(switch(args, 0, "enabled")?).await })
        },
    },
    ConsoleCommand {
        name: "altitude",
        usage: "altitude <meters>",
        help: "Set the altitude (rounded to 30 m)",
        handler: |kettle, args| {
            Box::pin(async move { kettle.set_altitude(arg(args, 0, "meters")?).await })
        },
    },
    ConsoleCommand {
        name: "clock",
        usage: "clock <hour> <minute> [off|digital|analog]",
        help: "Set the kettle clock",
        handler: |kettle, args| {
            Box::pin(async move {
                let hour = arg(args, 0, "hour")?;
                let minute = arg(args, 1, "minute")?;
                let mode = match args.get(2) {
                    Some(raw) => Some(clock_mode(raw)?),
                    None => None,
                };
                kettle.set_clock(hour, minute, mode).await
            })
        },
    },
    ConsoleCommand {
        name: "sync",
        usage: "sync",
        help: "Set the kettle clock to this computer's time",
        handler: |kettle, _| Box::pin(kettle.sync_clock()),
    },
    ConsoleCommand {
        name: "units",
        usage: "units <c|f>",
        help: "Set the display units",
        handler: |kettle, args| {
            Box::pin(async move {
                let units = match args.first().map(|s| s.to_ascii_lowercase()) {
                    Some(u) if u == "c" || u == "celsius" => Units::Celsius,
                    Some(u) if u == "f" || u == "fahrenheit" => Units::Fahrenheit,
                    other => return Err(invalid("units", other.unwrap_or_default())),
                };
                kettle.set_units(units).await
            })
        },
    },
    ConsoleCommand {
        name: "language",
        usage: "language <en|fr|es|zh-hans|zh-hant>",
        help: "Set the display language",
        handler: |kettle, args| {
            Box::pin(async move {
                let code = args.first().ok_or_else(|| invalid("language", ""))?;
                kettle.set_language_code(code).await
            })
        },
    },
    ConsoleCommand {
        name: "schedule",
        usage: "schedule <off|once|daily> [hour minute celsius]",
        help: "Set the schedule",
        handler: |kettle, args| {
            Box::pin(async move {
                let mode = ScheduleMode::from_str(args.first().copied().unwrap_or(""))?;
                if mode == ScheduleMode::Off {
                    return kettle.disable_schedule().await;
                }
                let hour = arg(args, 1, "hour")?;
                let minute = arg(args, 2, "minute")?;
                let celsius = arg(args, 3, "celsius")?;
                kettle.set_schedule(mode, hour, minute, celsius).await
            })
        },
    },
];

fn invalid(name: &str, value: impl ToString) -> Error {
    Error::InvalidArgument {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn arg<T: FromStr>(args: &[&str], index: usize, name: &str) -> Result<T> {
    let raw = args.get(index).copied().unwrap_or("");
    raw.parse().map_err(|_| invalid(name, raw))
}

fn switch(args: &[&str], index: usize, name: &str) -> Result<bool> {
    match args.get(index).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("on") | Some("true") | Some("1") => Ok(true),
        Some("off") | Some("false") | Some("0") => Ok(false),
        other => Err(invalid(name, other.unwrap_or(""))),
    }
}

fn clock_mode(raw: &str) -> Result<ClockMode> {
    match raw.to_ascii_lowercase().as_str() {
        "off" => Ok(ClockMode::Off),
        "digital" => Ok(ClockMode::Digital),
        "analog" => Ok(ClockMode::Analog),
        _ => Err(invalid("clock_mode", raw)),
    }
}

fn print_help() {
    println!("Commands:");
    for command in COMMANDS {
        println!("  {:<48} {}", command.usage, command.help);
    }
    println!("  {:<48} {}", "help", "Show this list");
    println!("  {:<48} {}", "q", "Quit");
    println!();
}

fn print_state(state: &StateRecord) {
    let schedule = state.schedule();
    println!(
        "Target {} | hold {} min | chime {} | pre-boil {} | altitude {} m",
        format_temperature(state.target_temperature(), state.units()),
        state.hold_time(),
        state.chime_volume(),
        if state.pre_boil() { "on" } else { "off" },
        state.altitude()
    );
    println!(
        "Clock {} ({}) | language {} | schedule {}{}",
        state.clock(),
        state.clock_mode().name(),
        state.language().name(),
        schedule.mode.name(),
        if schedule.is_enabled() {
            format!(
                " at {}, {}",
                schedule.time,
                format_temperature(schedule.temperature, state.units())
            )
        } else {
            String::new()
        }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,stagg_rust_ble=info")
        .init();

    println!("Stagg EKG Console");
    println!("=================\n");

    let args: Vec<String> = std::env::args().collect();
    let mut config = SessionConfig::default();
    if let Some(address) = args
        .iter()
        .position(|arg| arg == "--address")
        .and_then(|i| args.get(i + 1))
    {
        config = config.with_address(address.clone());
    }

    let kettle = Kettle::new(config).await?;
    let _events = kettle.on_state_changed(|state| {
        tracing::debug!("State update: {}", state.to_hex());
    });

    print_help();

    let mut input = String::new();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        input.clear();

        match std::io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => continue,
        }

        let words: Vec<&str> = input.split_whitespace().collect();
        let Some((&name, rest)) = words.split_first() else {
            continue;
        };

        match name.to_ascii_lowercase().as_str() {
            "q" | "quit" | "exit" => break,
            "help" | "?" => {
                print_help();
                continue;
            }
            _ => {}
        }

        let Some(command) = COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name)) else {
            println!("Unknown command '{}'. Type 'help' for a list.", name);
            continue;
        };

        match (command.handler)(&kettle, rest).await {
            Ok(state) => print_state(&state),
            Err(Error::ScheduleTransitionPartial { failed_step, source }) => {
                println!(
                    "Schedule change stopped at step {}: {}. The schedule is now off; run the command again.",
                    failed_step, source
                );
            }
            Err(Error::InvalidArgument { .. }) => println!("Usage: {}", command.usage),
            Err(e) => println!("Error: {}", e),
        }
    }

    println!("Exiting...");
    kettle.disconnect().await;
    Ok(())
}
