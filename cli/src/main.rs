use clap::{Parser, Subcommand};

mod commands;
mod util;

use commands::advise::AdviseArgs;
use commands::chat::ChatArgs;
use commands::crops::CropsArgs;
use commands::diagnose::DiagnoseArgs;
use commands::sensors::SensorsArgs;

#[derive(Parser)]
#[command(
    name = "krishi",
    version,
    about = "Krishi CLI: plant-disease advice, sensor assessment and the farm assistant"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "KRISHI_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health and whether the language model is configured
    Health,
    /// Get treatment advice for a classifier label
    Advise(AdviseArgs),
    /// Classify a leaf photo and get treatment advice
    Diagnose(DiagnoseArgs),
    /// Assess sensor readings (statuses, pest risk, irrigation)
    Sensors(SensorsArgs),
    /// Ask the farm assistant a question
    Chat(ChatArgs),
    /// Recommend crops for field conditions
    Crops(CropsArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let api_url = cli.api_url;

    let code = match cli.command {
        Commands::Health => commands::health::run(&api_url).await,
        Commands::Advise(args) => commands::advise::run(&api_url, args).await,
        Commands::Diagnose(args) => commands::diagnose::run(&api_url, args).await,
        Commands::Sensors(args) => commands::sensors::run(&api_url, args).await,
        Commands::Chat(args) => commands::chat::run(&api_url, args).await,
        Commands::Crops(args) => commands::crops::run(&api_url, args).await,
    };

    std::process::exit(code);
}
