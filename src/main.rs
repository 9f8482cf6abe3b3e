use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use finance_tracker::backup::BackupService;
use finance_tracker::config::AppConfig;
use finance_tracker::contacts::ContactService;
use finance_tracker::db::{establish_connection, Database};
use finance_tracker::error::FinanceError;
use finance_tracker::file_writer::{write_report_to_dir, ReportFormat};
use finance_tracker::loans::LoanLedger;
use finance_tracker::logging::{init_logging, OperationTimer};
use finance_tracker::metrics::MetricsCollector;
use finance_tracker::models::{
    Contact, Loan, LoanChanges, LoanStatus, LoanType, NewContact, NewLoan, NewTransaction, Transaction, TransactionType,
};
use finance_tracker::statistics::StatisticsService;
use finance_tracker::transactions::TransactionLedger;
use finance_tracker::utils::{format_amount, format_date, parse_date};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file layered over config/default and config/local
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage contacts
    #[command(subcommand)]
    Contact(ContactCommand),
    /// Record and inspect transactions
    #[command(subcommand)]
    Tx(TxCommand),
    /// Move money in and out of savings
    #[command(subcommand)]
    Savings(SavingsCommand),
    /// Manage loans
    #[command(subcommand)]
    Loan(LoanCommand),
    /// Show period totals for a transaction type
    Stats {
        /// Transaction type (INCOME, EXPENSE, SAVINGS, ...)
        #[arg(short = 't', long = "type", default_value = "EXPENSE")]
        tx_type: TransactionType,
    },
    /// Show spending recommendations
    Advice,
    /// Create, list, restore and delete backups
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Export all transactions to a report file
    Export {
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ReportFormat,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output_dir: PathBuf,
    },
    /// Inspect the effective configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ContactCommand {
    /// Add a contact
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        phone: Option<String>,
    },
    /// List contacts one page at a time
    List {
        #[arg(long, default_value = "0")]
        page: usize,
        #[arg(long, default_value = "20")]
        size: usize,
    },
    /// Search contacts by name or phone
    Search { term: String },
    /// Change a contact's name or phone
    Update {
        id: i64,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        phone: Option<String>,
    },
    /// Remove a contact without loans
    Remove { id: i64 },
    /// Import contacts from a CSV file with `name,phone` columns
    Import { file: PathBuf },
    /// Loan totals with a contact
    Summary { id: i64 },
}

#[derive(Args)]
struct NewTxArgs {
    /// Amount
    amount: f64,
    #[arg(short, long, default_value = "")]
    description: String,
    #[arg(short, long)]
    category: Option<String>,
    /// Date as YYYY-MM-DD or epoch milliseconds (default: now)
    #[arg(long)]
    date: Option<String>,
}

#[derive(Subcommand)]
enum TxCommand {
    /// Record a transaction
    Add {
        #[arg(short = 't', long = "type")]
        tx_type: TransactionType,
        #[command(flatten)]
        entry: NewTxArgs,
    },
    /// List transactions, newest first
    List {
        #[arg(short = 't', long = "type")]
        tx_type: Option<TransactionType>,
    },
    /// Search transactions
    Search { term: String },
    /// Edit a transaction
    Update {
        id: i64,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a transaction
    Remove { id: i64 },
    /// Show the current balance
    Balance,
}

#[derive(Subcommand)]
enum SavingsCommand {
    /// Move money from the balance into savings
    Deposit(NewTxArgs),
    /// Move money from savings back into the balance
    Withdraw {
        amount: f64,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the savings balance
    Balance,
}

#[derive(Subcommand)]
enum LoanCommand {
    /// Record a new loan
    Create {
        #[arg(long)]
        contact: i64,
        amount: f64,
        #[arg(short = 't', long = "type")]
        loan_type: LoanType,
        /// Interest rate in percent
        #[arg(short, long, default_value = "0")]
        rate: f64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Record a repayment
    Repay { id: i64, amount: f64 },
    /// Change a loan's contact, principal or rate
    Update {
        id: i64,
        #[arg(long)]
        contact: Option<i64>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(short, long)]
        rate: Option<f64>,
    },
    /// Delete a loan
    Remove { id: i64 },
    /// Show one loan
    Show { id: i64 },
    /// List loans, optionally filtered
    List {
        #[arg(long)]
        status: Option<LoanStatus>,
        #[arg(long)]
        contact: Option<i64>,
        /// Start of the date range (inclusive)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// End of the date range (inclusive)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Search loans by contact, amount, status or date
    Search { term: String },
    /// Loans that need attention
    Alerts,
}

#[derive(Subcommand)]
enum BackupCommand {
    /// Write a new backup file
    Create,
    /// List backup files, newest first
    List,
    /// Replace the ledger with a backup
    Restore { name: String },
    /// Delete a backup file
    Delete { name: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as YAML
    Show,
    /// Check the configuration and database
    Validate,
}

/// Services shared by all commands
struct App {
    config: AppConfig,
    db: Database,
    metrics: MetricsCollector,
    json: bool,
}

impl App {
    fn contacts(&self) -> Result<ContactService> {
        Ok(ContactService::new(self.db.clone(), self.metrics.clone())?)
    }

    fn transactions(&self) -> TransactionLedger {
        TransactionLedger::new(self.db.clone(), self.metrics.clone())
    }

    fn loans(&self) -> LoanLedger {
        LoanLedger::new(self.db.clone(), self.metrics.clone())
    }

    fn statistics(&self) -> StatisticsService {
        StatisticsService::new(self.db.clone())
    }

    fn backups(&self) -> BackupService {
        BackupService::new(self.db.clone(), &self.config.backup.directory, self.metrics.clone())
    }

    fn money(&self, amount: f64) -> String {
        format_amount(amount, &self.config.settings.currency)
    }

    fn date_or_now(&self, date: Option<&str>) -> Result<i64> {
        Ok(match date {
            Some(date) => parse_date(date)?,
            None => self.transactions().now(),
        })
    }

    /// Print `value` as JSON when `--json` is set, otherwise the given lines
    #[allow(clippy::print_stdout)]
    fn emit<T: Serialize>(&self, value: &T, lines: impl FnOnce() -> Vec<String>) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            for line in lines() {
                println!("{line}");
            }
        }
        Ok(())
    }
}

fn contact_line(contact: &Contact) -> String {
    format!("#{:<4} {:<30} {}", contact.id, contact.name, contact.phone.as_deref().unwrap_or("-"))
}

fn tx_lines(app: &App, txs: &[Transaction]) -> Vec<String> {
    txs.iter()
        .map(|tx| {
            format!(
                "#{:<4} {} {:<8} {:>16} {:<20} {}",
                tx.id,
                format_date(tx.date),
                tx.tx_type,
                app.money(tx.amount),
                tx.category.as_deref().unwrap_or("-"),
                tx.description
            )
        })
        .collect()
}

fn loan_lines(app: &App, loans: &[Loan]) -> Vec<String> {
    loans
        .iter()
        .map(|loan| {
            format!(
                "#{:<4} contact #{:<4} {:<5} {:<9} {} total {} remaining {} ({:.0}% repaid){}",
                loan.id,
                loan.contact_id,
                loan.loan_type,
                loan.status,
                format_date(loan.date),
                app.money(loan.total_amount),
                app.money(loan.remaining_amount),
                loan.repayment_percentage(),
                if loan.needs_alert() { " !" } else { "" }
            )
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ContactRecord {
    name: String,
    phone: Option<String>,
}

fn read_contacts_csv(path: &Path) -> Result<Vec<NewContact>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open contacts file {}", path.display()))?;
    reader
        .deserialize::<ContactRecord>()
        .map(|record| -> Result<NewContact> {
            let record = record?;
            Ok(NewContact { name: record.name, phone: record.phone })
        })
        .collect()
}

fn run_contact(app: &App, command: ContactCommand) -> Result<()> {
    let contacts = app.contacts()?;
    match command {
        ContactCommand::Add { name, phone } => {
            let contact = contacts.add(&NewContact { name, phone })?;
            app.emit(&contact, || vec![contact_line(&contact)])
        }
        ContactCommand::List { page, size } => {
            let listing = contacts.page(page, size)?;
            app.emit(&listing.contacts, || {
                let mut lines: Vec<String> = listing.contacts.iter().map(contact_line).collect();
                lines.push(format!("page {page}, {} of {} contacts", listing.contacts.len(), listing.total));
                lines
            })
        }
        ContactCommand::Search { term } => {
            let found = contacts.search(&term)?;
            app.emit(&found, || found.iter().map(contact_line).collect())
        }
        ContactCommand::Update { id, name, phone } => {
            let current = contacts.get(id)?;
            let updated = contacts.update(&Contact {
                id,
                name: name.unwrap_or(current.name),
                phone: phone.or(current.phone),
            })?;
            app.emit(&updated, || vec![contact_line(&updated)])
        }
        ContactCommand::Remove { id } => {
            contacts.remove(id)?;
            app.emit(&id, || vec![format!("Removed contact #{id}")])
        }
        ContactCommand::Import { file } => {
            let candidates = read_contacts_csv(&file)?;
            let imported = contacts.import(&candidates)?;
            app.emit(&imported, || vec![format!("Imported {imported} of {} contacts", candidates.len())])
        }
        ContactCommand::Summary { id } => {
            let summary = app.loans().contact_summary(id)?;
            app.emit(&summary, || {
                vec![
                    format!("Given:       {}", app.money(summary.total_given)),
                    format!("Taken:       {}", app.money(summary.total_taken)),
                    format!("Owed to you: {}", app.money(summary.outstanding_given)),
                    format!("You owe:     {}", app.money(summary.outstanding_taken)),
                ]
            })
        }
    }
}

fn run_tx(app: &App, command: TxCommand) -> Result<()> {
    let ledger = app.transactions();
    match command {
        TxCommand::Add { tx_type, entry } => {
            let tx = ledger.add(&NewTransaction {
                tx_type,
                amount: entry.amount,
                description: entry.description,
                date: app.date_or_now(entry.date.as_deref())?,
                category: entry.category,
            })?;
            app.emit(&tx, || tx_lines(app, std::slice::from_ref(&tx)))
        }
        TxCommand::List { tx_type } => {
            let txs = match tx_type {
                Some(tx_type) => ledger.by_type(tx_type)?,
                None => ledger.list()?,
            };
            app.emit(&txs, || tx_lines(app, &txs))
        }
        TxCommand::Search { term } => {
            let txs = ledger.search(&term)?;
            app.emit(&txs, || tx_lines(app, &txs))
        }
        TxCommand::Update { id, amount, description, category, date } => {
            let current = ledger.get(id)?;
            let edited = Transaction {
                amount: amount.unwrap_or(current.amount),
                description: description.unwrap_or_else(|| current.description.clone()),
                category: category.or_else(|| current.category.clone()),
                date: match date {
                    Some(date) => parse_date(&date)?,
                    None => current.date,
                },
                ..current
            };
            let tx = ledger.update(&edited)?;
            app.emit(&tx, || tx_lines(app, std::slice::from_ref(&tx)))
        }
        TxCommand::Remove { id } => {
            ledger.remove(id)?;
            app.emit(&id, || vec![format!("Removed transaction #{id}")])
        }
        TxCommand::Balance => {
            let balance = ledger.current_balance()?;
            app.emit(&balance, || vec![format!("Current balance: {}", app.money(balance))])
        }
    }
}

fn run_savings(app: &App, command: SavingsCommand) -> Result<()> {
    let ledger = app.transactions();
    match command {
        SavingsCommand::Deposit(entry) => {
            let date = app.date_or_now(entry.date.as_deref())?;
            let tx = ledger.deposit_savings(entry.amount, &entry.description, date, entry.category.as_deref())?;
            app.emit(&tx, || tx_lines(app, std::slice::from_ref(&tx)))
        }
        SavingsCommand::Withdraw { amount, description, date } => {
            let date = app.date_or_now(date.as_deref())?;
            let tx = ledger.withdraw_savings(amount, &description, date)?;
            app.emit(&tx, || tx_lines(app, std::slice::from_ref(&tx)))
        }
        SavingsCommand::Balance => {
            let savings = ledger.savings_balance()?;
            app.emit(&savings, || vec![format!("Savings: {}", app.money(savings))])
        }
    }
}

fn run_loan(app: &App, command: LoanCommand) -> Result<()> {
    let ledger = app.loans();
    let loans = match command {
        LoanCommand::Create { contact, amount, loan_type, rate, date } => {
            let date = app.date_or_now(date.as_deref())?;
            vec![ledger.create(&NewLoan { contact_id: contact, amount, loan_type, date, interest_rate: rate })?]
        }
        LoanCommand::Repay { id, amount } => vec![ledger.repay(id, amount)?],
        LoanCommand::Update { id, contact, amount, rate } => {
            let current = ledger.get(id)?;
            vec![ledger.update(
                id,
                &LoanChanges {
                    contact_id: contact.unwrap_or(current.contact_id),
                    amount: amount.unwrap_or(current.amount),
                    interest_rate: rate.unwrap_or(current.interest_rate),
                },
            )?]
        }
        LoanCommand::Remove { id } => {
            ledger.remove(id)?;
            return app.emit(&id, || vec![format!("Removed loan #{id}")]);
        }
        LoanCommand::Show { id } => vec![ledger.get(id)?],
        LoanCommand::List { status, contact, from, to } => match (status, contact, from, to) {
            (Some(status), _, _, _) => ledger.by_status(status)?,
            (None, Some(contact), _, _) => ledger.by_contact(contact)?,
            (None, None, Some(from), Some(to)) => ledger.by_date_range(parse_date(&from)?, parse_date(&to)?)?,
            _ => ledger.list()?,
        },
        LoanCommand::Search { term } => ledger.search(&term)?,
        LoanCommand::Alerts => ledger.alerts()?,
    };
    app.emit(&loans, || loan_lines(app, &loans))
}

fn run_backup(app: &App, command: BackupCommand) -> Result<()> {
    let backups = app.backups();
    match command {
        BackupCommand::Create => {
            let name = backups.export(&app.config.settings)?;
            app.emit(&name, || vec![format!("Backup written to {}", backups.directory().join(&name).display())])
        }
        BackupCommand::List => {
            let entries = backups.list()?;
            let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            app.emit(&names, || {
                entries
                    .iter()
                    .map(|e| format!("{:<45} {} {:>8} bytes", e.name, e.modified.format("%Y-%m-%d %H:%M"), e.size))
                    .collect()
            })
        }
        BackupCommand::Restore { name } => {
            let settings = backups.restore_file(&name, &app.config.settings)?;
            app.emit(&settings, || {
                vec![
                    format!("Restored {name}"),
                    format!("Settings from the backup: currency {}, dark mode {}", settings.currency, settings.dark_mode),
                ]
            })
        }
        BackupCommand::Delete { name } => {
            backups.delete(&name)?;
            app.emit(&name, || vec![format!("Deleted {name}")])
        }
    }
}

fn run(cli: Cli, config: AppConfig) -> Result<()> {
    if let Commands::Config(ConfigCommand::Show) = cli.command {
        let yaml = config.to_yaml()?;
        #[allow(clippy::print_stdout)]
        {
            print!("{yaml}");
        }
        return Ok(());
    }

    let db = establish_connection(&config.database)?;
    let app = App { config, db, metrics: MetricsCollector::new(), json: cli.json };
    let timer = OperationTimer::new("command");

    match cli.command {
        Commands::Contact(command) => run_contact(&app, command)?,
        Commands::Tx(command) => run_tx(&app, command)?,
        Commands::Savings(command) => run_savings(&app, command)?,
        Commands::Loan(command) => run_loan(&app, command)?,
        Commands::Stats { tx_type } => {
            let totals = app.statistics().stats_by_type(tx_type)?;
            app.emit(&totals, || {
                vec![
                    format!("{tx_type} today:     {}", app.money(totals.daily)),
                    format!("{tx_type} this week: {}", app.money(totals.weekly)),
                    format!("{tx_type} 30 days:   {}", app.money(totals.monthly)),
                    format!("{tx_type} 365 days:  {}", app.money(totals.yearly)),
                ]
            })?;
        }
        Commands::Advice => {
            let advice = app.statistics().recommendations()?;
            app.emit(&advice, || {
                if advice.is_empty() {
                    return vec!["No income recorded in the last 30 days".to_string()];
                }
                advice.iter().map(|r| format!("[{}] {}", r.priority, r.message)).collect()
            })?;
        }
        Commands::Backup(command) => run_backup(&app, command)?,
        Commands::Export { format, output_dir } => {
            let txs = app.transactions().list()?;
            let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
            let path = write_report_to_dir(&txs, format, &output_dir, &stamp)?;
            info!(path = %path.display(), count = txs.len(), "Report exported");
            app.emit(&path, || vec![format!("Wrote {} transactions to {}", txs.len(), path.display())])?;
        }
        Commands::Config(_) => {
            let counts = app.db.table_counts()?;
            app.emit(&(counts.contacts, counts.transactions, counts.loans), || {
                vec![format!(
                    "Configuration OK: {} contacts, {} transactions, {} loans",
                    counts.contacts, counts.transactions, counts.loans
                )]
            })?;
        }
    }

    timer.finish();
    debug!(metrics = ?app.metrics.snapshot(), "Command finished");
    Ok(())
}

fn main() -> ExitCode {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {err:#}");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Logging error: {err:#}");
            }
            return ExitCode::FAILURE;
        }
    };

    info!("Starting finance-tracker");

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<FinanceError>() {
            Some(rejection) if rejection.is_rejection() => {
                warn!("{rejection}");
                ExitCode::from(2)
            }
            _ => {
                error!("{err:#}");
                ExitCode::FAILURE
            }
        },
    }
}
