//! Run a configured click sequence against a target window.

use clap::Parser;

use winclick_core::action::TargetKind;
use winclick_core::click::ClickExecutor;
use winclick_core::config::RunConfig;
use winclick_core::input::SendInputBackend;
use winclick_core::locate::Locator;
use winclick_core::ocr::PaddleRecognizer;
use winclick_core::sequence::Sequencer;
use winclick_core::template::CrossCorrelationMatcher;
use winclick_core::window::WindowSession;

#[derive(Parser)]
#[command(name = "winclick-run", about = "Drive a scripted click sequence from a config file")]
struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override the configured window title substring
    #[arg(long)]
    window: Option<String>,

    /// Override the configured pointer glide duration (seconds)
    #[arg(long)]
    move_duration: Option<f64>,

    /// Suppress the on-screen click marker
    #[arg(long)]
    no_indicator: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match RunConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let title = args.window.as_deref().unwrap_or(&config.window_title);
    let mut session = WindowSession::new(title);
    if !session.find_window() {
        eprintln!("no visible window title contains '{title}'");
        std::process::exit(1);
    }

    let mut locator = Locator::new(Box::new(CrossCorrelationMatcher));
    if let Some(threshold) = config.template_threshold {
        locator = locator.with_threshold(threshold);
    }

    let needs_ocr = config.actions.iter().any(|a| a.kind == TargetKind::Text);
    if needs_ocr {
        let Some(paths) = &config.ocr_models else {
            eprintln!("sequence contains text targets but the config has no ocr_models");
            std::process::exit(1);
        };
        match PaddleRecognizer::new(paths) {
            Ok(recognizer) => locator = locator.with_recognizer(Box::new(recognizer)),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    // Windows that accept background input get the driver channel first.
    let live_title = session.window_title().unwrap_or_default();
    let driver_first = config.accepts_background_input(&live_title);
    if driver_first {
        log::info!("window '{live_title}' accepts background input, preferring DD driver");
    }

    let mut executor =
        ClickExecutor::new(Box::new(SendInputBackend)).with_driver_first(driver_first);
    if args.no_indicator {
        executor = executor.without_indicator();
    }

    let move_duration = args.move_duration.unwrap_or(config.move_duration);
    let sequencer = Sequencer::new(config.retry).with_move_duration(move_duration);

    if sequencer.run(&mut session, &config.actions, &mut locator, &executor) {
        println!("sequence complete ({} steps)", config.actions.len());
    } else {
        eprintln!("sequence failed");
        std::process::exit(1);
    }
}
