use std::path::PathBuf;

use adsheet_tools::directory::{ConnectionSettings, LdapSession, SecurityMode};
use adsheet_tools::sync::{self, DEFAULT_EXPORT_PATH, ImportRequest};
use adsheet_tools::{Result, ToolError};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_tracing(cli.verbose) {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(error.exit_code());
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Import(args) => execute_import(args),
        Command::Export(args) => execute_export(args),
    }
}

fn execute_import(args: ImportArgs) -> Result<()> {
    let settings = args.connection.settings();
    let request = ImportRequest {
        input: args.xlsx,
        sheet: args.sheet,
        skip_header: args.skip_header,
        base_dn: args.base_dn,
        dry_run: args.dry_run,
    };

    match sync::import_workbook(&request, || LdapSession::open(&settings))? {
        Some(summary) => println!("\n{summary}"),
        None => eprintln!("No data rows found in {}.", request.input.display()),
    }
    Ok(())
}

fn execute_export(args: ExportArgs) -> Result<()> {
    let settings = args.connection.settings();
    let count = sync::export_workbook(&args.base_dn, &args.output, || {
        LdapSession::open(&settings)
    })?;
    println!(
        "File {} generated successfully ({count} users).",
        args.output.display()
    );
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Synchronise directory attributes with Excel worksheets."
)]
struct Cli {
    /// Log debug details (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Update directory attributes from a worksheet: first column is the
    /// login, the others are attributes.
    Import(ImportArgs),
    /// Export active users (login, mobile, title) to a workbook.
    Export(ExportArgs),
}

#[derive(clap::Args)]
struct ConnectionArgs {
    /// Domain controller host, host:port, or ldap:// / ldaps:// URL.
    #[arg(long)]
    server: String,

    /// Account used to bind (e.g. "EMPRESA\adm.svc" or a full DN).
    #[arg(long)]
    user: String,

    /// Password of the bind account.
    #[arg(long, env = "ADSHEET_PASSWORD", hide_env_values = true)]
    password: String,

    /// Connection security; defaults to secure unless the server URL says otherwise.
    #[arg(long, value_enum)]
    security: Option<SecurityKind>,

    /// Skip TLS certificate validation (testing only).
    #[arg(long)]
    insecure: bool,
}

impl ConnectionArgs {
    fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            server: self.server.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            security: self.security.map(SecurityMode::from),
            insecure: self.insecure,
        }
    }
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Workbook to read (.xlsx).
    #[arg(long)]
    xlsx: PathBuf,

    /// Base DN searched for users (e.g. "DC=empresa,DC=local").
    #[arg(long, visible_alias = "base")]
    base_dn: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Worksheet name; the first sheet is used when omitted.
    #[arg(long)]
    sheet: Option<String>,

    /// Treat the first row as the header (recommended).
    #[arg(long)]
    skip_header: bool,

    /// Only log the intended changes without writing to the directory.
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// Base DN searched for users.
    #[arg(long, visible_alias = "base")]
    base_dn: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output workbook path.
    #[arg(long, default_value = DEFAULT_EXPORT_PATH)]
    output: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SecurityKind {
    Plain,
    Starttls,
    Secure,
}

impl From<SecurityKind> for SecurityMode {
    fn from(kind: SecurityKind) -> Self {
        match kind {
            SecurityKind::Plain => SecurityMode::Plain,
            SecurityKind::Starttls => SecurityMode::StartTls,
            SecurityKind::Secure => SecurityMode::Secure,
        }
    }
}
