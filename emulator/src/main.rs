mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    let profile = parse_profile().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: monitor-emulator [--profile <outage|low-battery|heartbeat>] | monitor-emulator <outage|low-battery|heartbeat>"
        );
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let styled = stdout.is_tty();
    let mut writer = stdout.lock();
    let mut session = Session::new(profile)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Power Monitor Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            if styled {
                write_styled(&mut writer, &response)?;
            } else {
                writeln!(writer, "{response}")?;
            }
        }
    }

    Ok(())
}

/// Highlights published frames and error replies on an interactive terminal.
fn write_styled<W: Write>(writer: &mut W, response: &str) -> io::Result<()> {
    if response.contains(" PUB ") {
        writeln!(writer, "{}", response.green())
    } else if response.starts_with("ERR") || response.contains(" ERR ") {
        writeln!(writer, "{}", response.red())
    } else if response.contains(" LOG ") {
        writeln!(writer, "{}", response.dark_grey())
    } else {
        writeln!(writer, "{response}")
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_profile() -> Result<Option<TranscriptProfile>, String> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(None);
    };

    let profile = if let Some(value) = arg.strip_prefix("--profile=") {
        TranscriptProfile::from_tag(value)
    } else if arg == "--profile" {
        match args.next() {
            Some(value) => TranscriptProfile::from_tag(&value),
            None => Err("Expected value after --profile".to_string()),
        }
    } else {
        TranscriptProfile::from_tag(&arg)
    }?;

    Ok(Some(profile))
}
