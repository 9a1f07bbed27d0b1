use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use household_dashboard::cache::Cache;
use household_dashboard::cards::{TrainsCard, WeatherCard};
use household_dashboard::clients::{Authenticator, TransportClient, WeatherClient};
use household_dashboard::daylight::{day_length_hours, sun_times_in};
use household_dashboard::theme::theme_at;
use household_dashboard::{DashboardConfig, DashboardError, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(name = "dashboard-cli")]
#[command(about = "One-shot access to the household dashboard's data sources")]
#[command(
    long_about = "A command-line companion to the household dashboard.\n\n\
    Signs the dashboard in to Google Calendar and runs single fetches against the\n\
    train and weather providers using the same configuration as the dashboard."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the Google consent URL
    ///
    /// Open it in a browser, approve access to the calendar and pass the
    /// returned code to `sign-in`.
    AuthUrl,

    /// Exchange an authorization code for tokens
    ///
    /// The tokens are stored in the state directory, where the dashboard
    /// picks them up on its next start.
    SignIn {
        /// The `code` parameter from the consent redirect
        code: String,
    },

    /// Fetch the departure board once and show the trains card
    Trains,

    /// Fetch the forecast once and show the weather card
    Weather,

    /// Show estimated sunrise and sunset
    SunTimes {
        /// Day to estimate, defaults to today
        #[arg(short, long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::AuthUrl => {
            let config = load_config()?;
            println!("{}", authenticator(&config)?.auth_url());
        }
        Commands::SignIn { code } => {
            let config = load_config()?;
            let token = authenticator(&config)?
                .exchange_code(&code)
                .await
                .context("Failed to exchange authorization code")?;
            println!(
                "✓ Signed in, token expires in {} seconds (saved under {})",
                token.expires_in,
                config.state_dir.display()
            );
        }
        Commands::Trains => {
            let config = load_config()?;
            let cache = Cache::new(config.state_dir.join("cache"));
            let client = TransportClient::new(config.transport.clone(), cache);
            let departures = client.departures().await.context("Failed to fetch departures")?;
            print!("{}", TrainsCard::new(&departures, Local::now(), config.walk_time_mins));
        }
        Commands::Weather => {
            let config = load_config()?;
            let client = WeatherClient::new(config.weather.clone());
            let report = client.forecast().await.context("Failed to fetch forecast")?;
            print!("{}", WeatherCard::new(&report, Local::now()));
        }
        Commands::SunTimes { date } => {
            print_sun_times(date.unwrap_or_else(|| Local::now().date_naive()));
        }
    }

    Ok(())
}

fn load_config() -> Result<DashboardConfig> {
    DashboardConfig::from_env().context("Failed to load dashboard configuration")
}

fn authenticator(config: &DashboardConfig) -> Result<Authenticator> {
    let google = config
        .google
        .clone()
        .ok_or_else(|| DashboardError::missing_env("GOOGLE_CLIENT_ID"))?;
    Ok(Authenticator::new(google, &config.state_dir))
}

fn print_sun_times(date: NaiveDate) {
    let sun = sun_times_in(date, &Local);
    println!("{}", date.format("%A %-d %B %Y"));
    println!("  sunrise     {}", sun.sunrise.format("%H:%M"));
    println!("  sunset      {}", sun.sunset.format("%H:%M"));
    println!("  day length  {:.2} h", day_length_hours(date));
    if date == Local::now().date_naive() {
        println!("  theme now   {}", theme_at(&Local::now()).as_str());
    }
}
