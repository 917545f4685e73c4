use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use votum::app::{ContextUpdate, Planner};
use votum::board::{export_board, BoardOptions, Theme};
use votum::config::{Config, ConfigOverrides};
use votum::gemini::{collect_arrivals, spawn_image_requests, AnalysisOutcome, GeminiClient, GenerativeBackend};
use votum::output::csv::{plan_to_csv, projection_to_csv, trips_to_csv};
use votum::output::json::render_json;
use votum::output::table::{
    render_context_table, render_months_table, render_plan_table, render_summary_table,
    render_themes_table, render_trips_table,
};
use votum::server::run_server;
use votum::store::{load_state, save_state, DebouncedSaver, SaveOutcome, SqliteStateStore, StatePort};
use votum::trips::{
    BreakdownComponent, Importance, Month, TravelMethod, TripDraft, TripRequest, UserContext,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "votum",
    about = "Plan a year of trips against your savings"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long = "api-key")]
    api_key: Option<String>,
    #[arg(long)]
    db: Option<String>,
    #[arg(long)]
    font: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show or edit origin and savings.
    Context {
        #[arg(long)]
        origin: Option<String>,
        #[arg(long)]
        monthly: Option<f64>,
        #[arg(long)]
        initial: Option<f64>,
        #[arg(long)]
        currency: Option<String>,
    },
    AddTrip {
        name: String,
        #[arg(long, default_value_t = 3)]
        days: u32,
        #[arg(long, default_value = "flight")]
        method: String,
        #[arg(long, default_value = "medium")]
        importance: String,
        /// Preferred month, 0-11 or a month name.
        #[arg(long)]
        month: Option<String>,
    },
    RemoveTrip {
        id: String,
    },
    Trips,
    /// Estimate costs and schedule every trip.
    Analyze,
    Dashboard,
    /// Move a planned trip to another month ("none" unassigns it).
    SetMonth {
        id: String,
        month: String,
    },
    /// Edit one cost component; the trip cost becomes the component sum.
    SetCost {
        id: String,
        component: String,
        value: f64,
    },
    ExportCsv {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    ExportBoard {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Skip destination image generation.
        #[arg(long)]
        no_images: bool,
        #[arg(long, default_value_t = 90)]
        image_timeout_secs: u64,
    },
    Themes,
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        api_key: cli.api_key.clone(),
        db_path: cli.db.clone(),
        font_path: cli.font.clone(),
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if matches!(cli.command, Commands::Themes) {
        return print_themes(cli.output);
    }

    let db_path = config.resolved_db_path();
    let store: Arc<dyn StatePort> =
        Arc::new(SqliteStateStore::open(&db_path, config.storage.max_value_bytes).with_context(
            || format!("failed opening state store: {}", db_path.display()),
        )?);
    let state = load_state(store.as_ref(), config.initial_context())?;
    let mut planner = Planner::from_state(state);

    match &cli.command {
        Commands::Context {
            origin,
            monthly,
            initial,
            currency,
        } => {
            let update = ContextUpdate {
                origin_country: origin.clone(),
                monthly_savings: *monthly,
                initial_savings: *initial,
                currency: currency.clone(),
            };
            let changed = update.origin_country.is_some()
                || update.monthly_savings.is_some()
                || update.initial_savings.is_some()
                || update.currency.is_some();
            if changed {
                planner.update_context(update)?;
                persist(store.as_ref(), &planner)?;
            }
            print_context(planner.context(), cli.output)?;
        }
        Commands::AddTrip {
            name,
            days,
            method,
            importance,
            month,
        } => {
            let draft = TripDraft {
                name: name.clone(),
                days: *days,
                method: TravelMethod::from_str(method)?,
                importance: Importance::from_str(importance)?,
                preferred_month: month.as_deref().map(Month::from_str).transpose()?,
            };
            let trip = planner.add_trip(draft)?.clone();
            persist(store.as_ref(), &planner)?;
            print_trips(std::slice::from_ref(&trip), cli.output)?;
        }
        Commands::RemoveTrip { id } => {
            let removed = planner.remove_trip(id)?;
            persist(store.as_ref(), &planner)?;
            info!("removed trip {} ({})", removed.name, removed.id);
            print_trips(planner.trips(), cli.output)?;
        }
        Commands::Trips => print_trips(planner.trips(), cli.output)?,
        Commands::Analyze => {
            planner.ensure_ready_for_analysis()?;
            let backend = GeminiClient::from_config(&config.ai)?;
            let outcome = planner.run_analysis(&backend).await?;
            persist(store.as_ref(), &planner)?;
            report_gaps(&outcome);
            print_analysis(&planner, &outcome, config.export.resolved_year(), cli.output)?;
        }
        Commands::Dashboard => print_dashboard(&planner, cli.output)?,
        Commands::SetMonth { id, month } => {
            let month = parse_assignment(month)?;
            planner.reassign_month(id, month)?;
            persist(store.as_ref(), &planner)?;
            print_dashboard(&planner, cli.output)?;
        }
        Commands::SetCost {
            id,
            component,
            value,
        } => {
            let component = BreakdownComponent::from_str(component)?;
            planner.update_breakdown(id, component, *value)?;
            persist(store.as_ref(), &planner)?;
            print_dashboard(&planner, cli.output)?;
        }
        Commands::ExportCsv { out } => {
            if planner.plan().is_empty() {
                return Err(anyhow!("no plan yet; run `votum analyze` first"));
            }
            let rendered = plan_to_csv(
                planner.context(),
                planner.plan(),
                &planner.projection(),
                config.export.resolved_year(),
            )?;
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.export.csv_path));
            write_file(&path, rendered.as_bytes())?;
            println!("Wrote {}", path.display());
        }
        Commands::ExportBoard {
            theme,
            title,
            out,
            no_images,
            image_timeout_secs,
        } => {
            if planner.plan().is_empty() {
                return Err(anyhow!("no plan yet; run `votum analyze` first"));
            }
            let theme = theme.as_deref().map(Theme::from_str).transpose()?;
            let options = BoardOptions::from_config(&config, theme, title.clone())?;
            if !*no_images {
                attach_images(&mut planner, &config, Duration::from_secs(*image_timeout_secs))
                    .await;
            }
            let jpeg = export_board(planner.plan(), &config, &options)?;
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.export.board_path));
            write_file(&path, &jpeg)?;
            println!("Wrote {} ({} theme)", path.display(), options.theme);
        }
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            let backend: Arc<dyn GenerativeBackend> =
                Arc::new(GeminiClient::from_config(&config.ai)?);
            let saver = DebouncedSaver::spawn(
                Arc::clone(&store),
                Duration::from_millis(config.storage.debounce_ms),
            );
            run_server(config, addr, planner, backend, saver).await?;
        }
        Commands::Themes | Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(&config.redacted())?);
    }
    Ok(())
}

fn persist(store: &dyn StatePort, planner: &Planner) -> Result<()> {
    if save_state(store, &planner.snapshot())? == SaveOutcome::PlanDropped {
        warn!("storage quota reached; the plan was not saved");
    }
    Ok(())
}

fn parse_assignment(raw: &str) -> Result<Option<Month>> {
    match raw.trim().to_lowercase().as_str() {
        "none" | "sin" | "-" => Ok(None),
        _ => Ok(Some(Month::from_str(raw)?)),
    }
}

/// Generates missing destination images within `budget`. Failures leave the
/// slot empty.
async fn attach_images(planner: &mut Planner, config: &Config, budget: Duration) {
    let requests = planner.image_requests();
    if requests.is_empty() {
        return;
    }
    let backend: Arc<dyn GenerativeBackend> = match GeminiClient::from_config(&config.ai) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            warn!("skipping destination images: {err:#}");
            return;
        }
    };
    let arrivals = collect_arrivals(spawn_image_requests(backend, requests), budget).await;
    info!("{} destination image(s) ready", arrivals.len());
    for arrival in arrivals {
        planner.apply_image(arrival);
    }
}

fn report_gaps(outcome: &AnalysisOutcome) {
    if !outcome.omitted.is_empty() {
        eprintln!(
            "The model skipped {} trip(s); re-run analyze to retry: {}",
            outcome.omitted.len(),
            outcome.omitted.join(", ")
        );
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("failed writing {}", path.display()))
}

fn print_context(context: &UserContext, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_context_table(context)),
        OutputFormat::Json => println!("{}", render_json(context)?),
        OutputFormat::Csv => {
            warn!("CSV output for context not implemented, using JSON");
            println!("{}", render_json(context)?);
        }
    }
    Ok(())
}

fn print_trips(trips: &[TripRequest], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_trips_table(trips)),
        OutputFormat::Json => println!("{}", render_json(trips)?),
        OutputFormat::Csv => println!("{}", trips_to_csv(trips)?),
    }
    Ok(())
}

fn print_analysis(
    planner: &Planner,
    outcome: &AnalysisOutcome,
    year: i32,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let projection = planner.projection();
            println!(
                "{}",
                render_plan_table(planner.plan(), &projection, &planner.context().currency)
            );
            println!(
                "{}",
                render_summary_table(&projection.summary, &planner.context().currency)
            );
        }
        OutputFormat::Json => println!("{}", render_json(outcome)?),
        OutputFormat::Csv => println!(
            "{}",
            plan_to_csv(
                planner.context(),
                planner.plan(),
                &planner.projection(),
                year,
            )?
        ),
    }
    Ok(())
}

fn print_dashboard(planner: &Planner, format: OutputFormat) -> Result<()> {
    let projection = planner.projection();
    let currency = &planner.context().currency;
    match format {
        OutputFormat::Table => {
            println!("{}", render_context_table(planner.context()));
            println!("{}", render_months_table(&projection, currency));
            if !planner.plan().is_empty() {
                println!("{}", render_plan_table(planner.plan(), &projection, currency));
            }
            println!("{}", render_summary_table(&projection.summary, currency));
        }
        OutputFormat::Json => println!("{}", render_json(&projection)?),
        OutputFormat::Csv => println!("{}", projection_to_csv(&projection)?),
    }
    Ok(())
}

fn print_themes(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Csv => println!("{}", render_themes_table()),
        OutputFormat::Json => {
            let themes = Theme::ALL.iter().map(Theme::as_slug).collect::<Vec<_>>();
            println!("{}", render_json(&themes)?);
        }
    }
    Ok(())
}
