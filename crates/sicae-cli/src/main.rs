//! `sicae`: operator command line for the SICAE access-control service.
//!
//! # Usage
//!
//! ```
//! sicae login --email guard@example.com
//! sicae dashboard
//! sicae events --result denied
//! sicae people add --name "Ana Pérez" --document 12345 --phone 555-0100 --kind visitor
//! sicae credentials issue <PERSON_ID>
//! sicae validate QR-001 --point <ACCESS_POINT_ID>
//! sicae scan --frames ./frames
//! sicae scan --device /dev/video2   # built with --features v4l2
//! ```

mod commands;
mod scan;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use settings::Settings;
use sicae_client::{AccessConsole, ApiConfig, HttpApi, SessionStore};
use sicae_core::{
  Role,
  domain::{AccessResult, PersonKind},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sicae", version, about = "Operator console for SICAE access control")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "sicae.toml")]
  config: PathBuf,

  /// Base URL of the API (overrides the config file).
  #[arg(long, env = "SICAE_URL")]
  url: Option<String>,

  /// Directory holding the persisted session.
  #[arg(long, value_name = "DIR")]
  state_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Log in and remember the session.
  Login {
    #[arg(long)]
    email:    String,
    /// Read from stdin when omitted.
    #[arg(long, env = "SICAE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Forget the stored session.
  Logout,
  /// Show who is logged in.
  Whoami,
  /// Reload every collection and print the counts.
  Sync,
  /// Headline counters and the most recent access events.
  Dashboard,
  /// The access event log.
  Events {
    /// Only events with this verdict.
    #[arg(long, value_enum)]
    result: Option<ResultArg>,
  },
  #[command(subcommand)]
  People(PeopleCommand),
  #[command(subcommand)]
  Credentials(CredentialCommand),
  /// Access points.
  #[command(subcommand)]
  Points(PointCommand),
  /// Operator accounts.
  #[command(subcommand)]
  Users(UserCommand),
  /// Ask the server to judge one code.
  Validate {
    code:  String,
    /// Access point the code was presented at.
    #[arg(long)]
    point: Option<Uuid>,
    /// Reader address to report.
    #[arg(long)]
    ip:    Option<String>,
  },
  /// Run a reader: scan frames (or typed codes) and validate each one.
  Scan {
    #[arg(long)]
    point:  Option<Uuid>,
    #[arg(long)]
    ip:     Option<String>,
    /// Replay `.pgm` frames from this directory instead of a camera.
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,
    /// V4L2 camera node.
    #[arg(long, value_name = "PATH")]
    device: Option<PathBuf>,
    #[arg(long)]
    fps:    Option<u32>,
    /// Start over when the last frame has been shown.
    #[arg(long = "loop")]
    looped: bool,
  },
}

#[derive(Subcommand, Debug)]
enum PeopleCommand {
  List,
  Add {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    document: String,
    #[arg(long, default_value = "")]
    phone:    String,
    #[arg(long, value_enum, default_value_t = KindArg::Visitor)]
    kind:     KindArg,
    #[arg(long)]
    company:  Option<String>,
    #[arg(long)]
    contact:  Option<String>,
    #[arg(long)]
    reason:   Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum CredentialCommand {
  List,
  /// Issue a fresh QR credential.
  Issue { person: Uuid },
}

#[derive(Subcommand, Debug)]
enum PointCommand {
  List,
  Add {
    #[arg(long)]
    name:     String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long, default_value = "")]
    kind:     String,
    #[arg(long)]
    inactive: bool,
  },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
  List,
  Add {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    email:    String,
    #[arg(long, env = "SICAE_NEW_PASSWORD", hide_env_values = true)]
    password: String,
    /// ADMIN, SEGURIDAD, VISITANTE or EMPLEADO.
    #[arg(long, default_value = "VISITANTE")]
    role:     Role,
  },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
  Employee,
  Visitor,
  Contractor,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResultArg {
  Allowed,
  Denied,
  Pending,
}

impl From<ResultArg> for AccessResult {
  fn from(result: ResultArg) -> Self {
    match result {
      ResultArg::Allowed => Self::Allowed,
      ResultArg::Denied => Self::Denied,
      ResultArg::Pending => Self::Pending,
    }
  }
}

impl From<KindArg> for PersonKind {
  fn from(kind: KindArg) -> Self {
    match kind {
      KindArg::Employee => Self::Employee,
      KindArg::Visitor => Self::Visitor,
      KindArg::Contractor => Self::Contractor,
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so command output stays pipeable.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  if let Some(url) = cli.url {
    settings.base_url = url;
  }
  if let Some(dir) = cli.state_dir {
    settings.state_dir = settings::expand_tilde(&dir);
  }

  let api = HttpApi::new(ApiConfig::new(settings.base_url.clone()))
    .context("failed to build HTTP client")?;
  let console = AccessConsole::new(api, SessionStore::open(&settings.state_dir));

  match cli.command {
    Command::Login { email, password } => {
      let password = match password {
        Some(p) => p,
        None => commands::read_password()?,
      };
      commands::login(&console, &email, &password).await
    }
    Command::Logout => commands::logout(&console),
    Command::Whoami => commands::whoami(&console),
    Command::Sync => commands::sync(&console).await,
    Command::Dashboard => commands::dashboard(&console).await,
    Command::Events { result } => commands::events(&console, result.map(Into::into)).await,
    Command::People(PeopleCommand::List) => commands::list_people(&console).await,
    Command::People(PeopleCommand::Add {
      name,
      document,
      phone,
      kind,
      company,
      contact,
      reason,
    }) => {
      let person = sicae_core::domain::NewPerson {
        full_name: name,
        document,
        phone,
        kind: kind.into(),
        company,
        contact_person: contact,
        visit_reason: reason,
      };
      commands::add_person(&console, &person).await
    }
    Command::Credentials(CredentialCommand::List) => commands::list_credentials(&console).await,
    Command::Credentials(CredentialCommand::Issue { person }) => {
      commands::issue_credential(&console, person).await
    }
    Command::Points(PointCommand::List) => commands::list_points(&console).await,
    Command::Points(PointCommand::Add { name, location, kind, inactive }) => {
      let point = sicae_core::domain::NewAccessPoint { name, location, kind, active: !inactive };
      commands::add_point(&console, &point).await
    }
    Command::Users(UserCommand::List) => commands::list_users(&console).await,
    Command::Users(UserCommand::Add { name, email, password, role }) => {
      commands::add_user(&console, &name, &email, &password, role).await
    }
    Command::Validate { code, point, ip } => {
      let point = point.or(settings.access_point);
      let ip = ip.or_else(|| settings.reader_ip.clone());
      commands::validate(&console, &code, point, ip.as_deref()).await
    }
    Command::Scan { point, ip, frames, device, fps, looped } => {
      let options = scan::ScanOptions {
        ctx: sicae_client::ReaderContext {
          access_point_id: point.or(settings.access_point),
          source_ip:       ip.or_else(|| settings.reader_ip.clone()),
        },
        frames: frames.map(|d| settings::expand_tilde(&d)).or(settings.frames_dir.clone()),
        device: device.unwrap_or(settings.device.clone()),
        fps: fps.unwrap_or(settings.fps),
        looped,
      };
      scan::run(&console, options).await
    }
  }
}
