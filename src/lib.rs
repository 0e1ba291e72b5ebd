pub mod config;
pub mod models;
pub mod db;
pub mod directory;
pub mod pipeline;
pub mod session;
pub mod console;

use std::io;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use chrono::{Duration, NaiveDate};

use config::{ConfigError, ProviderConfig};
use db::DatabaseError;
use directory::{parse_doctor_seeds, rebase_seed_slots, DoctorDirectory, NoTerminology, SqliteStore};
use pipeline::generation::{
    CredentialPool, GeminiClient, GenerationClient, ProviderError, TextProvider,
};
use pipeline::triage::{health_summary, DialogueController, TriageReport, HEALTH_HISTORY_LIMIT};
use session::{SessionError, SessionRegistry};

/// Doctor directory loaded into an empty database on first start. Its slot
/// dates are shifted so the earliest one falls on the day after seeding.
const DEFAULT_DOCTORS: &str = include_str!("../resources/doctors.json");

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Console I/O error: {0}")]
    Io(#[from] io::Error),
}

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    if let Err(e) = start() {
        tracing::error!(error = %e, "CarePath stopped");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

/// Open the store and run one console triage session, then offer a booking.
fn start() -> Result<(), StartupError> {
    let provider_config = ProviderConfig::from_env()?;

    let today = chrono::Local::now().date_naive();
    let store = SqliteStore::open(&config::database_path())?;
    seed_directory(&store, today)?;

    let client = GenerationClient::new(
        GeminiClient::from_config(&provider_config)?,
        CredentialPool::new(provider_config.api_keys.clone()),
    );
    let controller = DialogueController::new(&client, &NoTerminology, &store);

    let registry = SessionRegistry::new();
    let session_id = registry.create()?;
    let handle = registry.get(&session_id)?;
    let mut session = handle.lock().map_err(|_| SessionError::LockPoisoned)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let last = console::run_triage(&controller, &mut session, &mut input, &mut output)?;
    let booking = match last {
        Some(action) if action.is_terminal() => {
            console::run_booking(&store, &store, today, &mut input, &mut output)?
        }
        _ => None,
    };

    if !session.conversation().is_empty() {
        let report = TriageReport::from_session(&client, &session);
        console::print_report(&mut output, &report)?;

        // A booking already collected the phone; otherwise ask for one.
        let report = match booking.filter(|b| !b.phone.trim().is_empty()) {
            Some(b) => report.for_patient(&b.phone, Some(b.user_name.as_str())),
            None => match console::ask_phone(&mut input, &mut output)? {
                Some(phone) => report.for_patient(&phone, None),
                None => report,
            },
        };
        if let Some(summary) = save_report(&store, &client, &report)? {
            console::print_health_summary(&mut output, &summary)?;
        }
    }
    drop(session);
    registry.remove(&session_id)?;
    Ok(())
}

/// Import the bundled doctor list when the directory is empty.
fn seed_directory(store: &SqliteStore, today: NaiveDate) -> Result<(), DatabaseError> {
    if store.list_doctors()?.is_empty() {
        let mut seeds = parse_doctor_seeds(DEFAULT_DOCTORS)?;
        rebase_seed_slots(&mut seeds, today + Duration::days(1))?;
        let count = store.import_doctor_seeds(&seeds)?;
        tracing::info!(count, "Seeded doctor directory");
    }
    Ok(())
}

/// Saves a phone-keyed report. When the patient has earlier reports, returns
/// a health summary across the latest few.
fn save_report<P: TextProvider>(
    store: &SqliteStore,
    client: &GenerationClient<P>,
    report: &TriageReport,
) -> Result<Option<String>, DatabaseError> {
    let Some(record) = report.to_record() else {
        return Ok(None);
    };
    store.save_report(&record)?;

    let history = store.reports_for_phone(&record.phone, Some(HEALTH_HISTORY_LIMIT))?;
    if history.len() < 2 {
        return Ok(None);
    }
    Ok(Some(health_summary(client, &history)))
}
