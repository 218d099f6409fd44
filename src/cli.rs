use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::database::{Database, DatabaseError};
use crate::models::{
    Activity, AttendanceRecord, Evidence, FinancialMovement, MovementKind, RecordKind,
    ServiceType, ValidationError,
};
use crate::report::{self, ReportError, ReportKind, ReportLayout};
use crate::session::{AuthError, Session};
use crate::summary::{self, AttendanceSummary, FinancialSummary};
use crate::utils::{file_timestamp, parse_date, today};

#[derive(Parser)]
#[command(name = "congrega")]
#[command(about = "Church administration: finances, attendance, activities and PDF reports")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Username from the [users] table of the config file
    #[arg(short, long, env = "CONGREGA_USER")]
    pub user: Option<String>,

    /// Password for --user
    #[arg(short, long, env = "CONGREGA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Financial summary, category breakdown and attendance trend (default)
    Dashboard,
    /// Record an income or expense; expenses require --evidence
    AddMovement {
        /// income | expense (ingreso | gasto)
        #[arg(long)]
        kind: MovementKind,
        /// Category, e.g. "Diezmos" or "Pago de Servicios"
        #[arg(long)]
        category: String,
        /// Non-negative amount
        #[arg(long)]
        amount: f64,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Free-text note
        #[arg(long, default_value = "")]
        note: String,
        /// Invoice or receipt (png, jpg, jpeg or pdf)
        #[arg(long)]
        evidence: Option<PathBuf>,
    },
    /// Record the headcount of a service
    AddAttendance {
        /// Service type, e.g. "Culto Dominical" or "vigil"
        #[arg(long)]
        service: ServiceType,
        #[arg(long, default_value_t = 0)]
        men: u32,
        #[arg(long, default_value_t = 0)]
        women: u32,
        #[arg(long, default_value_t = 0)]
        children: u32,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Schedule an activity
    AddActivity {
        #[arg(long)]
        name: String,
        /// Person in charge
        #[arg(long)]
        responsible: String,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List records of one kind
    List {
        /// movements | attendance | activities
        kind: RecordKind,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete one record by ID (no-op when the ID does not exist)
    Delete {
        /// movements | attendance | activities
        kind: RecordKind,
        id: i64,
    },
    /// Render a PDF report
    Report {
        /// finances | attendance
        kind: ReportKind,
        /// Output file (defaults to <report_dir>/Finanzas.pdf or Asistencia.pdf)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Append a timestamp to the default file name
        #[arg(long)]
        timestamped: bool,
    },
    /// Save the evidence attached to a movement
    Evidence {
        /// Movement ID
        id: i64,
        /// Output file (defaults to the original filename in report_dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show the suggested categories
    Categories {
        /// Limit to income or expense
        #[arg(long)]
        kind: Option<MovementKind>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Authentication failed: {0}")]
    AuthError(#[from] AuthError),
    #[error("Report error: {0}")]
    ReportError(#[from] ReportError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Failed to read evidence file {path:?}: {source}")]
    EvidenceReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to save evidence to {path:?}: {source}")]
    EvidenceWriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Movement {0} not found")]
    MovementNotFound(i64),
    #[error("Movement {0} has no evidence attached")]
    NoEvidence(i64),
    #[error("Failed to serialize output: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        CliError::DatabaseError(DatabaseError::Validation(value))
    }
}

fn resolve_date(date: Option<String>) -> Result<chrono::NaiveDate, CliError> {
    match date {
        Some(date_str) => parse_date(&date_str).map_err(|e| {
            CliError::DateParseError(format!("Invalid date format '{}': {}", date_str, e))
        }),
        None => Ok(today()),
    }
}

/// Dispatch one command for an authenticated session
pub fn run(command: Commands, config: &Config, db: &Database, session: &Session) -> Result<(), CliError> {
    match command {
        Commands::Dashboard => handle_dashboard(db),
        Commands::AddMovement {
            kind,
            category,
            amount,
            date,
            note,
            evidence,
        } => handle_add_movement(kind, category, amount, date, note, evidence, db, session),
        Commands::AddAttendance {
            service,
            men,
            women,
            children,
            date,
            note,
        } => handle_add_attendance(service, (men, women, children), date, note, db),
        Commands::AddActivity {
            name,
            responsible,
            date,
            description,
        } => handle_add_activity(name, responsible, date, description, db),
        Commands::List { kind, json } => handle_list(kind, json, db),
        Commands::Delete { kind, id } => handle_delete(kind, id, db),
        Commands::Report {
            kind,
            output,
            timestamped,
        } => handle_report(kind, output, timestamped, config, db),
        Commands::Evidence { id, output } => handle_evidence(id, output, config, db),
        Commands::Categories { kind } => {
            handle_categories(kind);
            Ok(())
        }
    }
}

fn read_evidence(path: &Path) -> Result<Evidence, CliError> {
    let data = fs::read(path).map_err(|source| CliError::EvidenceReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(Evidence::new(filename, data)?)
}

/// Handle the add-movement command
#[allow(clippy::too_many_arguments)]
pub fn handle_add_movement(
    kind: MovementKind,
    category: String,
    amount: f64,
    date: Option<String>,
    note: String,
    evidence: Option<PathBuf>,
    db: &Database,
    session: &Session,
) -> Result<(), CliError> {
    let mut movement = FinancialMovement::new(resolve_date(date)?, kind, category, amount, session.user());
    movement.note = note;
    movement.evidence = evidence.as_deref().map(read_evidence).transpose()?;

    let id = db.insert_movement(&movement)?;
    println!("{} recorded successfully (ID: {})", kind, id);

    Ok(())
}

/// Handle the add-attendance command
pub fn handle_add_attendance(
    service: ServiceType,
    (men, women, children): (u32, u32, u32),
    date: Option<String>,
    note: String,
    db: &Database,
) -> Result<(), CliError> {
    let mut record = AttendanceRecord::new(resolve_date(date)?, service).with_counts(men, women, children);
    record.note = note;

    let id = db.insert_attendance(&record)?;
    println!("Attendance recorded successfully (ID: {}, total: {})", id, record.total());

    Ok(())
}

/// Handle the add-activity command
pub fn handle_add_activity(
    name: String,
    responsible: String,
    date: Option<String>,
    description: String,
    db: &Database,
) -> Result<(), CliError> {
    let mut activity = Activity::new(resolve_date(date)?, name, responsible);
    activity.description = description;

    let id = db.insert_activity(&activity)?;
    println!("Activity scheduled successfully (ID: {})", id);

    Ok(())
}

fn print_movements(db: &Database, json: bool) -> Result<(), CliError> {
    let mut movements = db.get_all_movements()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&movements)?);
        return Ok(());
    }
    if movements.is_empty() {
        println!("No financial records.");
        return Ok(());
    }
    movements.sort_by(|a, b| b.date.cmp(&a.date));
    println!("{:>5}  {:<10}  {:<7}  {:<20}  {:>14}  {:<12}  NOTE", "ID", "DATE", "KIND", "CATEGORY", "AMOUNT", "BY");
    for m in &movements {
        println!(
            "{:>5}  {:<10}  {:<7}  {:<20}  {:>14}  {:<12}  {}",
            m.id.unwrap_or_default(),
            m.date,
            m.kind,
            m.category,
            summary::format_currency(m.amount),
            m.recorded_by,
            m.note
        );
        if let Some(evidence) = &m.evidence {
            match evidence.preview() {
                Some((width, height)) => println!(
                    "       evidence: {} ({}x{} image)",
                    evidence.filename, width, height
                ),
                None => println!(
                    "       evidence: {} ({})",
                    evidence.filename,
                    evidence.kind().map_or("unknown", |kind| kind.mime())
                ),
            }
        }
    }
    Ok(())
}

fn print_attendance(db: &Database, json: bool) -> Result<(), CliError> {
    let mut records = db.get_all_attendance()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No attendance records.");
        return Ok(());
    }
    records.sort_by(|a, b| b.date.cmp(&a.date));
    println!("{:>5}  {:<10}  {:<28}  {:>5}  {:>5}  {:>5}  {:>6}  NOTE", "ID", "DATE", "SERVICE", "MEN", "WOMEN", "CHILD", "TOTAL");
    for r in &records {
        println!(
            "{:>5}  {:<10}  {:<28}  {:>5}  {:>5}  {:>5}  {:>6}  {}",
            r.id.unwrap_or_default(),
            r.date,
            r.service,
            r.men,
            r.women,
            r.children,
            r.total(),
            r.note
        );
    }
    Ok(())
}

fn print_activities(db: &Database, json: bool) -> Result<(), CliError> {
    let mut activities = db.get_all_activities()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&activities)?);
        return Ok(());
    }
    if activities.is_empty() {
        println!("No scheduled activities.");
        return Ok(());
    }
    activities.sort_by_key(|a| a.date);
    println!("{:>5}  {:<10}  {:<24}  {:<20}  DETAILS", "ID", "DATE", "ACTIVITY", "RESPONSIBLE");
    for a in &activities {
        println!(
            "{:>5}  {:<10}  {:<24}  {:<20}  {}",
            a.id.unwrap_or_default(),
            a.date,
            a.name,
            a.responsible,
            a.description
        );
    }
    Ok(())
}

/// Handle the list command
pub fn handle_list(kind: RecordKind, json: bool, db: &Database) -> Result<(), CliError> {
    match kind {
        RecordKind::Movement => print_movements(db, json),
        RecordKind::Attendance => print_attendance(db, json),
        RecordKind::Activity => print_activities(db, json),
    }
}

/// Handle the delete command
pub fn handle_delete(kind: RecordKind, id: i64, db: &Database) -> Result<(), CliError> {
    if db.delete_record(kind, id)? {
        println!("Deleted {} record {}", kind, id);
    } else {
        println!("No {} record with ID {}; nothing deleted", kind, id);
    }
    Ok(())
}

/// Handle the dashboard command
pub fn handle_dashboard(db: &Database) -> Result<(), CliError> {
    let movements = db.get_all_movements()?;
    let records = db.get_all_attendance()?;

    println!("Financial summary");
    if movements.is_empty() {
        println!("  No financial data to show.");
    } else {
        let totals = FinancialSummary::from_movements(&movements);
        println!("  Income:   {:>16}", summary::format_currency(totals.income));
        println!("  Expenses: {:>16}", summary::format_currency(totals.expense));
        println!("  Balance:  {:>16}", summary::format_currency(totals.balance));
        println!();
        println!("By category");
        for entry in summary::category_breakdown(&movements) {
            println!(
                "  {:<24} {:>16} {:>6.1}%",
                entry.category,
                summary::format_currency(entry.total),
                entry.share
            );
        }
    }

    println!();
    println!("Attendance");
    if records.is_empty() {
        println!("  Record attendance to see the trend.");
    } else {
        let stats = AttendanceSummary::from_records(&records);
        println!(
            "  {} services, {} attendees, {:.1} on average",
            stats.services, stats.total_attendance, stats.average
        );
        for point in summary::attendance_trend(&records) {
            println!("  {}  {:>6}", point.date, point.total);
        }
    }

    Ok(())
}

/// Handle the report command
pub fn handle_report(
    kind: ReportKind,
    output: Option<PathBuf>,
    timestamped: bool,
    config: &Config,
    db: &Database,
) -> Result<(), CliError> {
    let layout = ReportLayout::from_config(config);
    let (bytes, rows) = match kind {
        ReportKind::Finances => {
            let movements = db.get_all_movements()?;
            (report::render_financial_report(&movements, &layout)?, movements.len())
        }
        ReportKind::Attendance => {
            let records = db.get_all_attendance()?;
            (report::render_attendance_report(&records, &layout)?, records.len())
        }
    };

    let path = output.unwrap_or_else(|| {
        let stamp = timestamped.then(file_timestamp);
        config.get_report_dir().join(kind.file_name(stamp.as_deref()))
    });
    report::write_report(&path, &bytes)?;
    if rows == 0 {
        println!("{} report has no data rows", kind);
    }
    println!("Report saved to {}", path.display());

    Ok(())
}

/// Handle the evidence command
pub fn handle_evidence(id: i64, output: Option<PathBuf>, config: &Config, db: &Database) -> Result<(), CliError> {
    let movement = db.get_movement(id)?.ok_or(CliError::MovementNotFound(id))?;
    let evidence = movement.evidence.ok_or(CliError::NoEvidence(id))?;

    // Only the final component of the stored name is trusted
    let stored_name = Path::new(&evidence.filename)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "doc".to_string());
    let path = output.unwrap_or_else(|| config.get_report_dir().join(stored_name));

    let write_error = |source| CliError::EvidenceWriteError {
        path: path.clone(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(&path, &evidence.data).map_err(write_error)?;
    println!("Evidence saved to {}", path.display());

    Ok(())
}

/// Handle the categories command
pub fn handle_categories(kind: Option<MovementKind>) {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => MovementKind::ALL.to_vec(),
    };
    for kind in kinds {
        println!("{}:", kind);
        for category in kind.categories() {
            println!("  {}", category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StaticCredentials;
    use crate::test_utils::{seeded_db, temp_dir};
    use std::collections::BTreeMap;

    fn session() -> Session {
        let creds = StaticCredentials::new(BTreeMap::from([("rmerlin".to_string(), "x".to_string())]));
        Session::login(&creds, Some("rmerlin"), Some("x")).unwrap()
    }

    fn config_in(dir: &Path) -> Config {
        Config {
            database_path: dir.join("congrega.db").to_string_lossy().to_string(),
            report_dir: dir.to_string_lossy().to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_cli_parses_add_movement() {
        let cli = Cli::try_parse_from([
            "congrega", "--user", "admin", "--password", "admin",
            "add-movement", "--kind", "gasto", "--category", "Mantenimiento", "--amount", "40",
            "--evidence", "factura.pdf",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::AddMovement { kind, amount, evidence, .. }) => {
                assert_eq!(kind, MovementKind::Expense);
                assert_eq!(amount, 40.0);
                assert_eq!(evidence, Some(PathBuf::from("factura.pdf")));
            }
            _ => panic!("expected add-movement"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_record_kind() {
        assert!(Cli::try_parse_from(["congrega", "list", "members"]).is_err());
        assert!(Cli::try_parse_from(["congrega", "report", "activities"]).is_err());
    }

    #[test]
    fn test_add_movement_records_session_user() -> Result<(), CliError> {
        let db = Database::open_in_memory()?;
        handle_add_movement(
            MovementKind::Income,
            "Ofrendas".to_string(),
            12.5,
            Some("2026-03-01".to_string()),
            String::new(),
            None,
            &db,
            &session(),
        )?;
        let stored = db.get_all_movements()?;
        assert_eq!(stored[0].recorded_by, "rmerlin");
        Ok(())
    }

    #[test]
    fn test_add_expense_without_file_is_rejected() -> Result<(), CliError> {
        let db = Database::open_in_memory()?;
        let result = handle_add_movement(
            MovementKind::Expense,
            "Mantenimiento".to_string(),
            40.0,
            None,
            String::new(),
            None,
            &db,
            &session(),
        );
        assert!(matches!(
            result,
            Err(CliError::DatabaseError(DatabaseError::Validation(ValidationError::MissingEvidence)))
        ));
        assert_eq!(db.count_records(RecordKind::Movement)?, 0);
        Ok(())
    }

    #[test]
    fn test_add_expense_with_unsupported_file_is_rejected() -> Result<(), CliError> {
        let dir = temp_dir("congrega-cli-evidence");
        let path = dir.join("factura.txt");
        fs::write(&path, b"texto").unwrap();
        let db = Database::open_in_memory()?;
        let result = handle_add_movement(
            MovementKind::Expense,
            "Mantenimiento".to_string(),
            40.0,
            None,
            String::new(),
            Some(path),
            &db,
            &session(),
        );
        assert!(matches!(
            result,
            Err(CliError::DatabaseError(DatabaseError::Validation(ValidationError::UnsupportedEvidence(_))))
        ));
        Ok(())
    }

    #[test]
    fn test_bad_date_is_reported() {
        assert!(matches!(
            resolve_date(Some("2026/01/01".to_string())),
            Err(CliError::DateParseError(_))
        ));
    }

    #[test]
    fn test_report_and_evidence_are_written() -> Result<(), CliError> {
        let dir = temp_dir("congrega-cli-report");
        let config = config_in(&dir);
        let db = seeded_db();

        handle_report(ReportKind::Finances, None, false, &config, &db)?;
        let pdf = fs::read(dir.join("Finanzas.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));

        handle_evidence(2, None, &config, &db)?;
        assert_eq!(fs::read(dir.join("factura.pdf")).unwrap(), b"%PDF-1.4 factura");
        Ok(())
    }

    #[test]
    fn test_evidence_export_creates_missing_report_dir() -> Result<(), CliError> {
        let dir = temp_dir("congrega-cli-fresh");
        let config = Config {
            report_dir: dir.join("reports").join("2026").to_string_lossy().to_string(),
            ..config_in(&dir)
        };
        let db = seeded_db();

        handle_evidence(2, None, &config, &db)?;
        let saved = dir.join("reports").join("2026").join("factura.pdf");
        assert_eq!(fs::read(saved).unwrap(), b"%PDF-1.4 factura");

        let explicit = dir.join("exports").join("copia.pdf");
        handle_evidence(2, Some(explicit.clone()), &config, &db)?;
        assert!(explicit.exists());
        Ok(())
    }

    #[test]
    fn test_evidence_errors_for_income_and_missing_ids() -> Result<(), CliError> {
        let dir = temp_dir("congrega-cli-noevidence");
        let config = config_in(&dir);
        let db = seeded_db();
        assert!(matches!(handle_evidence(1, None, &config, &db), Err(CliError::NoEvidence(1))));
        assert!(matches!(handle_evidence(77, None, &config, &db), Err(CliError::MovementNotFound(77))));
        Ok(())
    }

    #[test]
    fn test_list_and_dashboard_run_on_seeded_store() -> Result<(), CliError> {
        let db = seeded_db();
        handle_list(RecordKind::Movement, false, &db)?;
        handle_list(RecordKind::Movement, true, &db)?;
        handle_list(RecordKind::Attendance, false, &db)?;
        handle_list(RecordKind::Activity, true, &db)?;
        handle_dashboard(&db)?;
        handle_delete(RecordKind::Movement, 99, &db)?;
        assert_eq!(db.count_records(RecordKind::Movement)?, 2);
        Ok(())
    }
}
