mod config;
mod db;
mod export;
mod form;
mod gateway;
mod models;
mod session;
mod sync;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use models::{Application, JoiningForm};
use session::Credentials;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sync::SyncCoordinator;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onboard")]
#[command(about = "Employee onboarding - joining forms, applicant records and an admin console")]
struct Cli {
    /// Config file (defaults to <config_dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite cache path, overrides storage.path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Never contact the remote store
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the local cache
    Init,

    /// Work with joining form files
    Form {
        #[command(subcommand)]
        command: FormCommands,
    },

    /// Validate and submit a filled joining form (JSON)
    Submit {
        /// Path to the form file
        file: PathBuf,
    },

    /// Start an admin session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// End the admin session
    Logout,

    /// List applicant records
    List,

    /// Search applicants by name, email, employee code or mobile
    Search {
        query: String,
    },

    /// Show an applicant record
    Show {
        /// Record ID
        id: String,
    },

    /// Delete an applicant record
    Delete {
        /// Record ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export applicant records to CSV
    Export {
        /// Only export records matching this search
        #[arg(short, long)]
        query: Option<String>,

        /// Directory to write the CSV file into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Replay pending changes to the remote store
    Sync {
        /// Discard the queued change for this record ID instead of sending it
        #[arg(long)]
        drop: Option<String>,
    },

    /// Manage job openings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Manage interviews
    Interviews {
        #[command(subcommand)]
        command: InterviewCommands,
    },

    /// Open the interactive admin console
    Console,
}

#[derive(Subcommand)]
enum FormCommands {
    /// Write a blank joining form to fill in
    Template {
        /// Output file path
        #[arg(short, long, default_value = "joining-form.json")]
        out: PathBuf,
    },

    /// Append an empty employment or reference row
    AddRow {
        file: PathBuf,

        #[arg(value_enum)]
        section: Section,
    },

    /// Remove an employment or reference row
    RemoveRow {
        file: PathBuf,

        #[arg(value_enum)]
        section: Section,

        /// Row number, starting at 1
        row: usize,
    },

    /// Fill in one education level (10th, 12th, Diploma, Graduation, ...)
    Education {
        file: PathBuf,

        level: String,

        #[arg(short, long)]
        institution: String,

        #[arg(short, long, default_value = "")]
        percentage: String,

        /// Passing year
        #[arg(short, long, default_value = "")]
        year: String,
    },

    /// Run the submit-time checks without submitting
    Check {
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Section {
    Employment,
    Reference,
}

#[derive(Subcommand)]
enum JobCommands {
    /// List job openings
    List,

    /// Add a job opening
    Add {
        /// Job title
        title: String,

        #[arg(short, long)]
        department: String,

        /// Open, On Hold or Closed
        #[arg(short, long, default_value = "Open")]
        status: String,
    },
}

#[derive(Subcommand)]
enum InterviewCommands {
    /// List scheduled interviews
    List,

    /// Schedule an interview
    Add {
        /// Candidate name
        name: String,

        #[arg(short, long)]
        role: String,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Time, e.g. "10:30 AM"
        #[arg(short, long)]
        time: String,

        /// Video Call, In Person or Phone
        #[arg(short, long, default_value = "Video Call")]
        kind: String,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
        }
    }
    Ok(())
}

fn write_form(path: &Path, form: &JoiningForm) -> Result<()> {
    std::fs::write(path, form.to_json_pretty()?)
        .with_context(|| format!("Failed to write form: {}", path.display()))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_applications(apps: &[Application]) {
    println!("{:<18} {:<10} {:<26} {:<28} {:<12}", "ID", "CODE", "NAME", "EMAIL", "MOBILE");
    println!("{}", "-".repeat(98));
    for app in apps {
        println!(
            "{:<18} {:<10} {:<26} {:<28} {:<12}",
            app.id,
            truncate(&app.form.employee_code, 10),
            truncate(&app.form.full_name(), 24),
            truncate(&app.form.email, 26),
            app.form.mobile
        );
    }
}

fn print_application(app: &Application) {
    let f = &app.form;
    println!("{} ({})", f.full_name(), app.id);
    println!("Employee code: {}", f.employee_code);
    println!("Submitted: {}", app.submitted_at);
    println!("Email: {}", f.email);
    println!("Mobile: {}", f.mobile);
    if !f.alternate_mobile.is_empty() {
        println!("Alternate mobile: {}", f.alternate_mobile);
    }
    println!("Father: {}", f.father_name);
    println!("Mother: {}", f.mother_name);
    println!("DOB: {}  DOJ: {}", f.dob, f.doj);
    println!("Marital status: {}", f.marital_status);
    if !f.wife_name.is_empty() {
        println!("Wife: {}", f.wife_name);
    }
    println!("Bank: {} ({})", f.bank_account, f.ifsc_code);
    println!("Aadhaar: {}  PAN: {}", f.aadhaar_number, f.pan_number);
    if !f.uan_number.is_empty() || !f.esic_number.is_empty() {
        println!("UAN: {}  ESIC: {}", f.uan_number, f.esic_number);
    }

    println!("\n--- Address ---");
    println!("Local:\n{}", textwrap::indent(&textwrap::fill(&f.local_address, 70), "  "));
    println!("Permanent:\n{}", textwrap::indent(&textwrap::fill(&f.permanent_address, 70), "  "));
    println!("Pincode: {}", f.pincode);

    let education = export::education_summary(f);
    if !education.is_empty() {
        println!("\n--- Education ---");
        for entry in education.split("; ") {
            println!("  {}", entry);
        }
    }

    let employment: Vec<_> = f.employment.iter().filter(|e| !e.is_blank()).collect();
    if !employment.is_empty() {
        println!("\n--- Employment ---");
        for emp in employment {
            println!(
                "  {} - {} ({}) {} to {}, CTC {}",
                emp.employer, emp.designation, emp.location, emp.from_date, emp.to_date, emp.ctc
            );
        }
    }

    println!("\n--- References ---");
    for r in &f.references {
        println!("  {} ({}) {}", r.name, r.organization, r.mobile);
    }

    println!("\nSigned: {} on {}", f.signature, f.submission_date);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let console = matches!(cli.command, Commands::Console);
    if !console {
        init_logging(None)?;
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.storage.path = Some(db.clone());
    }
    if console {
        init_logging(Some(&config.log_path()))?;
    }

    let mut sync = SyncCoordinator::from_config(&config, cli.offline)?;

    match cli.command {
        Commands::Init => {
            let jobs = sync.jobs()?;
            let interviews = sync.interviews()?;
            println!("Local cache initialized at {}", config.database_path().display());
            println!("{} job openings, {} interviews on file.", jobs.len(), interviews.len());
        }

        Commands::Form { command } => match command {
            FormCommands::Template { out } => {
                write_form(&out, &JoiningForm::blank(Local::now().date_naive()))?;
                println!("Blank joining form written to {}", out.display());
            }

            FormCommands::AddRow { file, section } => {
                let mut form = JoiningForm::from_json_file(&file)?;
                let rows = match section {
                    Section::Employment => {
                        form.add_employment_row();
                        form.employment.len()
                    }
                    Section::Reference => {
                        form.add_reference_row();
                        form.references.len()
                    }
                };
                write_form(&file, &form)?;
                println!("Added row {}.", rows);
            }

            FormCommands::RemoveRow { file, section, row } => {
                let mut form = JoiningForm::from_json_file(&file)?;
                let index = row.saturating_sub(1);
                match section {
                    Section::Employment => form.remove_employment_row(index),
                    Section::Reference => form.remove_reference_row(index),
                }
                write_form(&file, &form)?;
                println!("Removed row {}.", row);
            }

            FormCommands::Education { file, level, institution, percentage, year } => {
                let mut form = JoiningForm::from_json_file(&file)?;
                if !form.update_education(&level, &institution, &percentage, &year) {
                    let levels: Vec<_> = form.education.iter().map(|e| e.degree.as_str()).collect();
                    return Err(anyhow!("Unknown education level '{}'. Expected one of: {}", level, levels.join(", ")));
                }
                write_form(&file, &form)?;
                println!("Updated {}.", level);
            }

            FormCommands::Check { file } => {
                JoiningForm::from_json_file(&file)?.validate()?;
                println!("Form is ready to submit.");
            }
        },

        Commands::Submit { file } => {
            let form = JoiningForm::from_json_file(&file)?;
            let outcome = form::submit(form, &mut sync)?;
            println!("Application submitted successfully. Record ID: {}", outcome.id);
            if !outcome.mirrored {
                println!("Remote store unreachable; saved locally and queued for sync.");
            }
        }

        Commands::Login { username, password } => {
            let expected = Credentials::from(&config.admin);
            session::login(&mut sync, &expected, &Credentials::new(&username, &password))?;
            println!("Logged in as {}.", username);
        }

        Commands::Logout => {
            session::logout(&mut sync)?;
            println!("Logged out.");
        }

        Commands::List => {
            session::require_session(&sync)?;
            let apps = sync.list();
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                print_applications(&apps);
            }
        }

        Commands::Search { query } => {
            session::require_session(&sync)?;
            let apps = sync.search(&query);
            if apps.is_empty() {
                println!("No applications match '{}'.", query);
            } else {
                print_applications(&apps);
            }
        }

        Commands::Show { id } => {
            session::require_session(&sync)?;
            match sync.list().into_iter().find(|a| a.id == id) {
                Some(app) => print_application(&app),
                None => println!("Application {} not found.", id),
            }
        }

        Commands::Delete { id, yes } => {
            session::require_session(&sync)?;
            let Some(app) = sync.list().into_iter().find(|a| a.id == id) else {
                println!("Application {} not found.", id);
                return Ok(());
            };
            if !yes && !confirm(&format!("Delete {} ({})?", app.form.full_name(), id))? {
                println!("Cancelled.");
                return Ok(());
            }
            let outcome = sync.delete(&id)?;
            if outcome.mirrored {
                println!("Deleted {}.", id);
            } else {
                println!("Deleted {} locally; remote store unreachable, queued for sync.", id);
            }
        }

        Commands::Export { query, out_dir } => {
            session::require_session(&sync)?;
            let apps = match &query {
                Some(q) => sync.search(q),
                None => sync.list(),
            };
            match export::export_applications(&apps, &out_dir, Local::now())? {
                Some(path) => println!("Exported {} records to {}", apps.len(), path.display()),
                None => println!("No records to export."),
            }
        }

        Commands::Sync { drop } => {
            session::require_session(&sync)?;
            if let Some(id) = drop {
                if sync.discard_pending(&id)? {
                    println!("Discarded queued change for {}.", id);
                } else {
                    println!("Nothing queued for {}.", id);
                }
                return Ok(());
            }
            if sync.pending() == 0 {
                println!("Nothing to sync.");
                return Ok(());
            }

            let report = sync.flush_outbox()?;
            println!("Replayed {} pending changes.", report.replayed);
            if !report.reachable {
                println!("Remote unreachable; {} still pending.", report.remaining);
            } else if report.refused > 0 {
                println!("Remote refused {} changes:", report.refused);
                for entry in sync.pending_entries() {
                    let op = match entry.mutation {
                        sync::Mutation::Upsert { .. } => "save",
                        sync::Mutation::Delete => "delete",
                    };
                    println!("  {:<18} {:<7} queued {}", entry.id, op, entry.queued_at);
                }
                println!("Fix the record on the server, or run 'onboard sync --drop <id>'.");
            }
        }

        Commands::Jobs { command } => {
            session::require_session(&sync)?;
            match command {
                JobCommands::List => {
                    let jobs = sync.jobs()?;
                    if jobs.is_empty() {
                        println!("No job openings.");
                    } else {
                        println!("{:<18} {:<30} {:<16} {:<10} {:>10}", "ID", "TITLE", "DEPARTMENT", "STATUS", "APPLICANTS");
                        println!("{}", "-".repeat(88));
                        for job in jobs {
                            println!(
                                "{:<18} {:<30} {:<16} {:<10} {:>10}",
                                job.id,
                                truncate(&job.title, 28),
                                truncate(&job.department, 14),
                                job.status,
                                job.applicants
                            );
                        }
                    }
                }

                JobCommands::Add { title, department, status } => {
                    let job = sync.add_job(&title, &department, &status)?;
                    println!("Added job {} - {}", job.id, job.title);
                }
            }
        }

        Commands::Interviews { command } => {
            session::require_session(&sync)?;
            match command {
                InterviewCommands::List => {
                    let interviews = sync.interviews()?;
                    if interviews.is_empty() {
                        println!("No interviews scheduled.");
                    } else {
                        println!("{:<18} {:<22} {:<22} {:<12} {:<10} {:<12} {:<10}", "ID", "NAME", "ROLE", "DATE", "TIME", "TYPE", "STATUS");
                        println!("{}", "-".repeat(112));
                        for i in interviews {
                            println!(
                                "{:<18} {:<22} {:<22} {:<12} {:<10} {:<12} {:<10}",
                                i.id,
                                truncate(&i.name, 20),
                                truncate(&i.role, 20),
                                i.date,
                                i.time,
                                i.kind,
                                i.status
                            );
                        }
                    }
                }

                InterviewCommands::Add { name, role, date, time, kind } => {
                    let interview = sync.add_interview(&name, &role, &date, &time, &kind)?;
                    println!("Scheduled {} for {} on {} at {}", interview.id, interview.name, interview.date, interview.time);
                }
            }
        }

        Commands::Console => {
            session::require_session(&sync)?;
            let export_dir = std::env::current_dir()?;
            tui::run_console(sync, export_dir)?;
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Priyanka Raghunathan", 10), "Priyank...");
        assert_eq!(truncate("ÄÖÜäöüßÄÖÜ", 5), "ÄÖ...");
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["onboard", "delete", "APP-1", "--yes", "--offline"]).unwrap();
        assert!(cli.offline);
        match cli.command {
            Commands::Delete { id, yes } => {
                assert_eq!(id, "APP-1");
                assert!(yes);
            }
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn test_form_row_section_parses() {
        let cli = Cli::try_parse_from(["onboard", "form", "remove-row", "f.json", "employment", "2"]).unwrap();
        match cli.command {
            Commands::Form {
                command: FormCommands::RemoveRow { section: Section::Employment, row, .. },
            } => assert_eq!(row, 2),
            _ => panic!("expected form remove-row"),
        }
    }

    #[test]
    fn test_write_form_round_trips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.json");
        let mut form = JoiningForm::blank(Local::now().date_naive());
        form.add_reference_row();
        write_form(&path, &form).unwrap();
        assert_eq!(JoiningForm::from_json_file(&path).unwrap().references.len(), 2);
    }

    #[test]
    fn test_sync_drop_flag() {
        let cli = Cli::try_parse_from(["onboard", "sync", "--drop", "APP-5"]).unwrap();
        match cli.command {
            Commands::Sync { drop } => assert_eq!(drop.as_deref(), Some("APP-5")),
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_cli_interview_defaults() {
        let cli = Cli::try_parse_from([
            "onboard", "interviews", "add", "Meera", "-r", "Analyst", "-d", "2026-04-02", "-t", "11:00 AM",
        ])
        .unwrap();
        match cli.command {
            Commands::Interviews {
                command: InterviewCommands::Add { kind, .. },
            } => assert_eq!(kind, "Video Call"),
            _ => panic!("expected interviews add"),
        }
    }
}
