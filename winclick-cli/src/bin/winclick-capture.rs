//! Standalone CLI tool for snapshotting a window to a PNG.

use clap::Parser;

use winclick_core::window::WindowSession;

#[derive(Parser)]
#[command(name = "winclick-capture", about = "Capture a window's contents to a PNG")]
struct Args {
    /// Title substring of the window to capture
    window: String,

    /// Output file path
    #[arg(short, long, default_value = "window.png")]
    output: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut session = WindowSession::new(&args.window);
    if !session.find_window() {
        eprintln!("no visible window title contains '{}'", args.window);
        std::process::exit(1);
    }

    let Some(capture) = session.capture_window() else {
        eprintln!("window found but could not be captured");
        std::process::exit(1);
    };

    if let Err(e) = capture.pixels.save(&args.output) {
        eprintln!("write {}: {e}", args.output);
        std::process::exit(1);
    }

    println!(
        "captured {}x{} at origin ({},{}) -> '{}'",
        capture.width(),
        capture.height(),
        capture.origin.0,
        capture.origin.1,
        args.output
    );
}
