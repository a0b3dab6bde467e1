mod session;

use std::env;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossterm::style::Stylize;
use weld_core::link::{Framed, LineAssembler, LineMailbox};

use session::{EmuLine, Session, SessionConfig};

const USAGE: &str = "Usage: weld-emulator [--armed] [--arm-timeout <ms>] [--virtual-clock] \
                     [--transcript <path>] [--trace-pwm]";

/// Inbound line slot shared with the stdin reader, like the board's UART path.
static MAILBOX: LineMailbox = LineMailbox::new();
static INPUT_CLOSED: AtomicBool = AtomicBool::new(false);

fn main() -> io::Result<()> {
    let config = parse_args(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let mut session = Session::new(&config)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    writeln!(
        writer,
        "Spot-weld controller emulator ready. Type `help` for commands or `exit` to quit."
    )?;
    print_lines(&mut writer, &session.boot()?)?;

    thread::spawn(read_stdin);

    loop {
        if let Some(line) = MAILBOX.take() {
            let text = String::from_utf8_lossy(&line);
            if should_terminate(text.trim()) {
                writeln!(writer, "Session closed.")?;
                break;
            }
            print_lines(&mut writer, &session.handle_command(&text)?)?;
        } else if INPUT_CLOSED.load(Ordering::Acquire) {
            break;
        }

        // A virtual clock only moves on `wait`, so idle polling has nothing to do.
        if !session.is_virtual() {
            print_lines(&mut writer, &session.tick()?)?;
        }
        thread::sleep(Duration::from_millis(1));
    }

    Ok(())
}

/// Frames stdin into the mailbox, waiting for the control loop to take each line.
fn read_stdin() {
    let mut assembler = LineAssembler::new();
    let mut stdin = io::stdin().lock();
    let mut byte = [0u8; 1];

    loop {
        match stdin.read(&mut byte) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if matches!(byte[0], b'\r' | b'\n') {
                    while MAILBOX.is_ready() {
                        thread::sleep(Duration::from_millis(1));
                    }
                }
                match assembler.push(byte[0], &MAILBOX) {
                    Some(Framed::Dropped { len }) => {
                        eprintln!("dropped {len}-byte line: controller busy");
                    }
                    Some(Framed::Delivered {
                        truncated: true, ..
                    }) => {
                        eprintln!("line truncated to its first bytes");
                    }
                    _ => {}
                }
            }
        }
    }

    // Let the last line drain before signalling end of input.
    while MAILBOX.is_ready() {
        thread::sleep(Duration::from_millis(1));
    }
    INPUT_CLOSED.store(true, Ordering::Release);
}

fn print_lines<W: Write>(writer: &mut W, lines: &[EmuLine]) -> io::Result<()> {
    for line in lines {
        match line {
            EmuLine::Reply(text) => {
                let styled = if text.starts_with("ACK") || text.starts_with("BOOT") {
                    text.as_str().green()
                } else if text.starts_with("DENY") || text.starts_with("ERR") {
                    text.as_str().red()
                } else if text.starts_with("EVENT") {
                    text.as_str().cyan()
                } else {
                    text.as_str().reset()
                };
                writeln!(writer, "{styled}")?;
            }
            EmuLine::Trace(text) => writeln!(writer, "{}", text.as_str().dark_grey())?,
            EmuLine::Note(text) => writeln!(writer, "{text}")?,
        }
    }
    writer.flush()
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<SessionConfig, String> {
    let mut config = SessionConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--armed" => config.armed = true,
            "--virtual-clock" => config.virtual_clock = true,
            "--trace-pwm" => config.trace_pwm = true,
            "--arm-timeout" => {
                let value = args
                    .next()
                    .ok_or_else(|| "Expected value after --arm-timeout".to_string())?;
                config.arm_timeout_ms = value
                    .parse()
                    .map_err(|_| format!("Invalid arm timeout `{value}`"))?;
            }
            "--transcript" => {
                let value = args
                    .next()
                    .ok_or_else(|| "Expected path after --transcript".to_string())?;
                config.transcript = Some(PathBuf::from(value));
            }
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(ToString::to_string).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_every_flag() {
        let config = parse_args(args(&[
            "--armed",
            "--arm-timeout",
            "30000",
            "--virtual-clock",
            "--transcript",
            "out/session.log",
            "--trace-pwm",
        ]))
        .unwrap();
        assert!(config.armed && config.virtual_clock && config.trace_pwm);
        assert_eq!(config.arm_timeout_ms, 30_000);
        assert_eq!(config.transcript, Some(PathBuf::from("out/session.log")));
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse_args(args(&["--profile"])).is_err());
        assert!(parse_args(args(&["--arm-timeout"])).is_err());
        assert!(parse_args(args(&["--arm-timeout", "soon"])).is_err());
    }
}
