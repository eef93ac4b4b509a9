//! Standalone CLI tool for probing mouse input.

use clap::{Parser, Subcommand};

use winclick_core::action::ClickKind;
use winclick_core::click::{ClickExecutor, Clicker};
use winclick_core::input::{InputBackend, SendInputBackend};

#[derive(Parser)]
#[command(name = "winclick-input", about = "Send mouse input via Win32 SendInput")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Click at screen coordinates
    Click {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Click kind: single, double, right
        #[arg(short, long, default_value = "single")]
        kind: String,
        /// Pointer glide duration in seconds
        #[arg(long, default_value = "0")]
        move_duration: f64,
    },
    /// Move cursor to coordinates
    Move {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
    },
    /// Print the current cursor position
    Pos,
}

fn parse_kind(s: &str) -> ClickKind {
    match s {
        "double" => ClickKind::Double,
        "right" => ClickKind::Right,
        _ => ClickKind::Single,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let backend = SendInputBackend;

    match args.command {
        Command::Click {
            x,
            y,
            kind,
            move_duration,
        } => {
            let executor = ClickExecutor::new(Box::new(backend));
            let ok = executor.click(x, y, parse_kind(&kind), move_duration);
            println!("click {kind} at {x},{y}: {}", if ok { "ok" } else { "failed" });
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Move { x, y } => {
            let ok = backend.move_to(x, y);
            println!("moved cursor to {x},{y}: {}", if ok { "ok" } else { "failed" });
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Pos => {
            let (x, y) = backend.cursor_pos();
            println!("{x},{y}");
        }
    }
}
