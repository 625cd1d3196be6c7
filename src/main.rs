use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use calorie_lens::access::{
    AccessGate, AuthProvider, Credentials, FileViewCounter, LocalAuthProvider, ViewCount,
    record_view,
};
use calorie_lens::logging::init_logger;
use calorie_lens::{AnalysisResult, AppConfig, CaptureSession, GeminiClient, ImageFileCamera};

/// Estimate the calories in a photo of a meal.
///
/// The image is sent to a Gemini vision model, which lists the food items it
/// recognises with per-item calories and quantities.
#[derive(Parser, Debug)]
#[command(name = "calorie")]
#[command(about = "🍽️ Estimate the calories in a photo of your meal")]
#[command(long_about = "Estimate the calories in a photo of your meal.
Set GEMINI_API_KEY (or CALORIE_ANALYZER__API_KEY) before analyzing; a .env file in the \
working directory is honoured.")]
struct Args {
    /// Account email
    #[arg(long, global = true, env = "CALORIE_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "CALORIE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file to use instead of ./calorie.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze an image file (JPEG, PNG, WEBP or GIF)
    Analyze {
        #[arg(help = "Image file to analyze")]
        file: PathBuf,
    },
    /// Take a photo with a camera and analyze it
    Snap {
        #[arg(long, help = "Camera device to capture from")]
        device: PathBuf,
    },
    /// Create an account
    Register,
    /// Show the visitor counter
    Views,
}

enum Acquire {
    File(PathBuf),
    Camera(PathBuf),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logger();
    let args = Args::parse();

    let config = AppConfig::load_from(args.config.as_deref(), None)?;
    if matches!(args.command, Command::Analyze { .. } | Command::Snap { .. }) {
        config.analyzer.credential()?;
    }

    let gate = AccessGate::new(
        config.access_policy,
        LocalAuthProvider::new(config.accounts_path()),
    );
    let counter = FileViewCounter::new(config.counter_path());
    let credentials = match (args.email, args.password) {
        (Some(email), Some(password)) => Some(Credentials::new(email, password)),
        _ => None,
    };

    let views = record_view(&counter).await;
    if let ViewCount::Unavailable(_) = views {
        eprintln!("⚠️ {}", views);
    }

    match args.command {
        Command::Register => {
            let credentials =
                credentials.context("Registering needs both --email and --password")?;
            let user = gate
                .provider()
                .sign_up(&credentials.email, &credentials.password)
                .await?;
            println!("Account created for {}", user.email);
            Ok(())
        }
        Command::Views => {
            println!("{}", views);
            Ok(())
        }
        Command::Analyze { file } => {
            run_analysis(&config, &gate, credentials.as_ref(), Acquire::File(file), args.json).await
        }
        Command::Snap { device } => {
            run_analysis(&config, &gate, credentials.as_ref(), Acquire::Camera(device), args.json)
                .await
        }
    }
}

async fn run_analysis(
    config: &AppConfig,
    gate: &AccessGate<LocalAuthProvider>,
    credentials: Option<&Credentials>,
    acquire: Acquire,
    json: bool,
) -> Result<()> {
    gate.admit(credentials).await?;

    let client = GeminiClient::new(config.analyzer.clone())?;
    let mut session = CaptureSession::new(client);
    if let Some(message) = session.configuration_error() {
        bail!("{}", message);
    }

    match acquire {
        Acquire::File(path) => session.select_file(&path)?,
        Acquire::Camera(device) => {
            let camera = ImageFileCamera::new(&device);
            session.open_camera(&camera).await?;
            session.take_photo().await?;
        }
    }

    let result = session.analyze().await?;
    info!(items = result.len(), "analysis complete");

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print_result(result);
    }
    Ok(())
}

fn print_result(result: &AnalysisResult) {
    if result.is_empty() {
        println!("No food items identified.");
        return;
    }

    for record in result.records() {
        println!(
            "{:<30} x{:<3} {:>8.0} kcal  ({} kcal each, {})",
            record.name(),
            record.quantity(),
            record.group_calories(),
            record.calories_per_unit(),
            record.serving_description()
        );
    }
    println!("{:<35} {:>8.0} kcal", "Total", result.total_calories());
}
