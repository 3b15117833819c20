//! Operator command line for the clinic call queue.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clinic_queue_core::{Patient, PatientId, QueueConfig, QueueService};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clinic-queue", about = "Walk-in clinic call queue")]
struct Cli {
    /// Database file (overrides CLINIC_QUEUE_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or upgrade the database schema, then exit
    Migrate,
    /// List room codes accepted at registration
    Rooms,
    /// Register a patient
    Register {
        /// Patient name
        name: String,
        /// Room code (1-5, Extraction, Xray, ECG)
        room: String,
    },
    /// List all patients, newest first
    List,
    /// Show one patient
    Show { id: i64 },
    /// Call a patient to their room
    Call { id: i64 },
    /// Re-announce a patient
    Recall { id: i64 },
    /// Mark a patient as done
    Done { id: i64 },
    /// Delete a patient
    Remove { id: i64 },
    /// Print the display feed as JSON
    Current,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = QueueConfig::from_env()?;
    if let Some(path) = cli.db {
        config = config.with_database_path(path);
    }
    init_logging(&config.log_level)?;

    let service = QueueService::open(&config)?;

    match cli.command {
        Command::Migrate => {
            tracing::info!(path = %config.database_path.display(), "schema up to date");
        }
        Command::Rooms => {
            for (code, label) in service.rooms() {
                println!("{code:<12} {label}");
            }
        }
        Command::Register { name, room } => {
            let patient = service.register(&name, &room)?;
            print_patient(&patient);
        }
        Command::List => {
            let patients = service.list_for_admin()?;
            if patients.is_empty() {
                println!("No patients registered.");
            }
            for patient in &patients {
                print_patient(patient);
            }
        }
        Command::Show { id } => print_patient(&service.get(PatientId(id))?),
        Command::Call { id } => print_patient(&service.call(PatientId(id))?),
        Command::Recall { id } => print_patient(&service.recall(PatientId(id))?),
        Command::Done { id } => print_patient(&service.complete(PatientId(id))?),
        Command::Remove { id } => {
            service.remove(PatientId(id))?;
            println!("Removed patient {id}");
        }
        Command::Current => {
            let feed = service.current_announcements()?;
            println!("{}", serde_json::to_string_pretty(&feed)?);
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for `current`.
fn init_logging(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn print_patient(patient: &Patient) {
    println!(
        "{:>5}  {:<24} {:<10} {:<8} token={:<4} {}",
        patient.id.0,
        patient.name,
        patient.room.code(),
        patient.status.as_str(),
        patient.called_seq,
        patient.registered_at,
    );
}
