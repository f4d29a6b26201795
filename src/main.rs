mod app;
mod config;
mod error;
mod games;
mod generator;
mod screen;
mod settings;

use config::{GameConfig, GameType, MAX_SCALE, MIN_SCALE};
use error::{AppError, Result};
use generator::Fixed;
use settings::Settings;
use std::env;
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

fn main()
{
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()>
{
    let (offline, args) = split_offline_flag(env::args().skip(1).collect());
    let mut args = args.into_iter();
    let command = args.next();
    let rest: Vec<String> = args.collect();

    match command.as_deref() {
        Some("-h") | Some("--help") => {
            print_help();
            return Ok(());
        }
        Some("list") => {
            list_games();
            return Ok(());
        }
        _ => {}
    }

    let mut settings = Settings::from_env()?;
    settings.offline = offline;
    init_logging(&settings);
    tracing::info!(offline, model = %settings.model, "mood-arcade starting");

    match command.as_deref() {
        None => app::run(generator::connect(&settings), None),
        Some("play") => {
            let mood = rest.join(" ");
            if mood.trim().is_empty() {
                return Err(AppError::Usage("'play' needs a mood, e.g. play Angry".to_string()));
            }
            app::run(generator::connect(&settings), Some(mood.trim().to_string()))
        }
        Some(name) => match GameType::from_name(name) {
            Some(game_type) => {
                let speed = parse_speed_args(&rest)?;
                let config = GameConfig::fallback()
                    .with_game_type(game_type)
                    .with_speed(speed);
                app::run(Arc::new(Fixed(config)), Some(game_type.name().to_string()))
            }
            None => Err(AppError::Usage(format!("Unknown command '{name}'. Run with --help."))),
        },
    }
}

fn split_offline_flag(args: Vec<String>) -> (bool, Vec<String>)
{
    let offline = args.iter().any(|arg| arg == "--offline");
    let rest = args.into_iter().filter(|arg| arg != "--offline").collect();
    (offline, rest)
}

fn parse_speed_args(args: &[String]) -> Result<f32>
{
    let mut speed: Option<f32> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--speed" {
            let value = iter
                .next()
                .ok_or_else(|| AppError::Usage("Expected value after --speed".to_string()))?;
            speed = Some(parse_speed(value)?);
        } else if let Some(rest) = arg.strip_prefix("--speed=") {
            speed = Some(parse_speed(rest)?);
        } else {
            return Err(AppError::Usage(format!("Unknown game option '{arg}'")));
        }
    }
    Ok(speed.unwrap_or(GameConfig::fallback().speed()))
}

fn parse_speed(value: &str) -> Result<f32>
{
    let parsed = value
        .parse::<f32>()
        .map_err(|_| AppError::Usage("Speed must be a number".to_string()))?;
    if !(MIN_SCALE..=MAX_SCALE).contains(&parsed) {
        return Err(AppError::Usage(format!(
            "Speed must be between {MIN_SCALE} and {MAX_SCALE}"
        )));
    }
    Ok(parsed)
}

// The terminal belongs to the game screens, so logs go to a file.
fn init_logging(settings: &Settings)
{
    let writer = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_path)
    {
        Ok(file) => BoxMakeWriter::new(Mutex::new(file)),
        Err(_) => BoxMakeWriter::new(std::io::sink),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

fn list_games()
{
    println!("Available games:");
    for game in games::registry() {
        println!("  {:<10} - {}", game.game_type.name(), game.description);
    }
}

fn print_help()
{
    println!("mood-arcade");
    println!("\nUsage:");
    println!("  mood-arcade                      pick a mood, get a game");
    println!("  mood-arcade play <mood>          skip the mood menu");
    println!("  mood-arcade clicker [--speed=5]  play a game with the built-in config");
    println!("  mood-arcade catcher [--speed=5]");
    println!("  mood-arcade memory");
    println!("  mood-arcade list");
    println!("\nOptions:");
    println!("  --offline   never call the generator, always use the built-in config");
    println!("\nEnvironment:");
    println!("  GEMINI_API_KEY            API key for config generation (required online)");
    println!("  GEMINI_MODEL              model name (default gemini-2.0-flash)");
    println!("  GEMINI_BASE_URL           API base URL");
    println!("  MOOD_ARCADE_TIMEOUT_SECS  request timeout (default 30)");
    println!("  MOOD_ARCADE_LOG           log file (default <tmp>/mood-arcade.log)");
    println!("  RUST_LOG                  log filter (default info)");
}
