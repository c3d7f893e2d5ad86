//! Console control front end
//!
//! Stands in for a network control surface: commands typed on stdin become
//! engine pushes, and asynchronous results are printed back.
//!
//! ```text
//! add [channels] [secs]       create a loop
//! remove [index]              remove a loop (default: the last one)
//! hit|down|up <cmd> [index]   send a command (index -1 or omitted: all loops)
//! set <control> <value> [index]
//! get <control> [index]
//! ping
//! loops
//! quit
//! ```

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ostinato_engine::{
    Command, ConfigLoopEvent, ConfigUpdateEvent, Control, ControlConfig, ControlFrontEnd,
    Engine, EventType, GetParamEvent, PingEvent, RegisterConfigEvent, Target,
};
use tracing::{debug, info, warn};

/// Return address used for requests typed at the console
const CONSOLE_URL: &str = "console://stdin";

pub struct ConsoleControl {
    port: u16,
}

impl ConsoleControl {
    /// Bring up the front end and announce the engine to `ping_url`, if set
    pub fn bind(config: &ControlConfig) -> Self {
        let control = Self { port: config.port };
        if let Some(url) = &config.ping_url {
            control.send_ping_ack(url, "/pingack");
        }
        control
    }
}

impl ControlFrontEnd for ConsoleControl {
    fn is_ready(&self) -> bool {
        true
    }

    fn server_url(&self) -> String {
        format!("{}:{}/", CONSOLE_URL, self.port)
    }

    fn server_port(&self) -> u16 {
        self.port
    }

    fn on_get_param_result(&self, event: &GetParamEvent) {
        println!("{} [{}] = {}", event.control, event.instance, event.value);
    }

    fn on_config_update_result(&self, event: &ConfigUpdateEvent) {
        debug!(
            control = %event.control,
            instance = event.instance,
            url = %event.return_url,
            "update subscription"
        );
    }

    fn on_register_result(&self, event: &RegisterConfigEvent) {
        debug!(url = %event.return_url, path = %event.return_path, "config registration");
    }

    fn send_ping_ack(&self, return_url: &str, return_path: &str) {
        info!(to = return_url, path = return_path, url = %self.server_url(), "ping ack");
    }
}

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Add { channels: u32, secs: f32 },
    Remove { index: i32 },
    Command { event_type: EventType, command: Command, target: Target },
    Set { control: Control, value: f32, target: Target },
    Get { control: Control, instance: i32 },
    Ping,
    Loops,
    Quit,
}

fn parse_target(arg: Option<&str>) -> Result<Target, String> {
    let Some(arg) = arg else {
        return Ok(Target::All);
    };
    arg.parse::<i32>()
        .ok()
        .and_then(Target::from_index)
        .ok_or_else(|| format!("bad loop index: {}", arg))
}

fn parse_number<T: std::str::FromStr>(
    arg: Option<&str>,
    default: T,
    what: &str,
) -> Result<T, String> {
    match arg {
        None => Ok(default),
        Some(arg) => arg.parse().map_err(|_| format!("bad {}: {}", what, arg)),
    }
}

/// Parse one console line. `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb {
        "add" => ConsoleCommand::Add {
            channels: parse_number(words.next(), 0, "channel count")?,
            secs: parse_number(words.next(), 0.0, "loop length")?,
        },
        "remove" => ConsoleCommand::Remove {
            index: parse_number(words.next(), -1, "loop index")?,
        },
        "hit" | "down" | "up" => {
            let event_type = match verb {
                "down" => EventType::CommandDown,
                "up" => EventType::CommandUp,
                _ => EventType::CommandHit,
            };
            let name = words.next().ok_or("missing command name")?;
            let command = name.parse::<Command>().map_err(|e| e.to_string())?;
            ConsoleCommand::Command {
                event_type,
                command,
                target: parse_target(words.next())?,
            }
        }
        "set" => {
            let name = words.next().ok_or("missing control name")?;
            let control = name.parse::<Control>().map_err(|e| e.to_string())?;
            let value = words.next().ok_or("missing value")?;
            ConsoleCommand::Set {
                control,
                value: value.parse().map_err(|_| format!("bad value: {}", value))?,
                target: parse_target(words.next())?,
            }
        }
        "get" => {
            let name = words.next().ok_or("missing control name")?;
            ConsoleCommand::Get {
                control: name.parse::<Control>().map_err(|e| e.to_string())?,
                instance: parse_number(words.next(), 0, "loop index")?,
            }
        }
        "ping" => ConsoleCommand::Ping,
        "loops" => ConsoleCommand::Loops,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };

    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument: {}", extra));
    }
    Ok(Some(command))
}

/// Hand a parsed command to the engine. False once the console should stop.
pub fn execute(engine: &Engine, command: ConsoleCommand) -> bool {
    let queued = match command {
        ConsoleCommand::Add { channels, secs } => {
            engine.push_admin_event(ConfigLoopEvent::add(channels, secs))
        }
        ConsoleCommand::Remove { index } => engine.push_admin_event(ConfigLoopEvent::remove(index)),
        ConsoleCommand::Command {
            event_type,
            command,
            target,
        } => engine.push_command_event(event_type, command, target),
        ConsoleCommand::Set {
            control,
            value,
            target,
        } => engine.push_control_event(EventType::ControlChange, control, value, target),
        ConsoleCommand::Get { control, instance } => {
            engine.push_admin_event(GetParamEvent::new(control, instance, CONSOLE_URL, "/get"))
        }
        ConsoleCommand::Ping => engine.push_admin_event(PingEvent {
            return_url: CONSOLE_URL.into(),
            return_path: "/pong".into(),
        }),
        ConsoleCommand::Loops => {
            println!("{} loop(s)", engine.loop_count());
            true
        }
        ConsoleCommand::Quit => {
            engine.quit();
            return false;
        }
    };

    if !queued {
        warn!("engine busy or not running, request dropped");
    }
    true
}

/// Read commands from stdin until `quit` or end of input, then stop the engine
pub fn spawn_console(engine: Arc<Engine>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("ostinato-console".into()).spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_line(&line) {
                Ok(Some(command)) => {
                    if !execute(&engine, command) {
                        return;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{}", message),
            }
        }
        engine.quit();
    })
}
