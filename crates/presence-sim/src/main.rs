//! Presence Simulator - command-line entry point

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use presence_core::{password::battery_percent, GeoPoint, LocationFix, PresenceConfig};
use presence_sim::{run_scenario, Scenario};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "presence-sim")]
#[command(about = "Simulate a device against the proof-of-presence login gate", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs (and the run report) as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario file
    Run {
        /// Scenario TOML file
        scenario: PathBuf,

        /// Gate configuration TOML file
        #[arg(short, long, env = "PRESENCE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the password expected at a battery level
    Password {
        /// Battery percentage (0-100)
        #[arg(short, long)]
        battery: u32,

        /// Gate configuration TOML file
        #[arg(short, long, env = "PRESENCE_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show the distance from a point to each target
    Distance {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Gate configuration TOML file
        #[arg(short, long, env = "PRESENCE_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    match cli.command {
        Commands::Run { scenario, config } => {
            let config = load_config(config.as_deref())?;
            let scenario = Scenario::load(&scenario)?;
            let expected = scenario.expectations();

            let report = run_scenario(scenario, &config).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Scenario: {}", report.scenario);
                println!("Steps:    {}", report.steps);
                for login in &report.logins {
                    let mark = if login.met() { "ok" } else { "MISMATCH" };
                    println!(
                        "  step {:>3}  {:<16} {:?}  [{}]",
                        login.step, login.password, login.result, mark
                    );
                }
                println!("Advisories: {:?}", report.advisories);
                println!("Final permission state: {}", report.final_state.as_str());
            }

            let failed = report.mismatches().count();
            if failed > 0 {
                anyhow::bail!("{} of {} login expectations not met", failed, expected);
            }
        }

        Commands::Password { battery, config } => {
            let config = load_config(config.as_deref())?;
            let percent = battery_percent(battery)?;
            println!("{}", config.password_policy().expected_password(percent));
        }

        Commands::Distance { lat, lon, config } => {
            let config = load_config(config.as_deref())?;
            let point = GeoPoint::new(lat, lon);
            if !point.is_valid() {
                anyhow::bail!("coordinates out of range: {}, {}", lat, lon);
            }

            let fix = LocationFix::from(point);
            let geofence = config.geofence();
            for target in geofence.targets() {
                let distance = presence_core::haversine_distance(&point, &target.point);
                println!("{:<12} {:>12.1} m", target.label, distance);
            }
            println!(
                "Within {:.0} m of a target: {}",
                geofence.threshold(),
                geofence.is_near_any_target(Some(&fix))
            );
        }
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "presence_sim=info,presence_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<PresenceConfig> {
    match path {
        Some(path) => {
            let config = PresenceConfig::load(path)?;
            info!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        None => Ok(PresenceConfig::default()),
    }
}
