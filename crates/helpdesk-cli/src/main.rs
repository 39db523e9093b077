use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use helpdesk_core::types::{LoginOutcome, RestoreMode, Role, UserId};
use helpdesk_core::{HelpDesk, HelpDeskConfig};
use helpdesk_crypto::{generate_body_key, key_to_base64};

#[derive(Parser)]
#[command(name = "helpdesk", about = "Help desk operator tool")]
struct Args {
    /// Database file. Falls back to HELPDESK_DB_PATH, then `helpdesk.db`.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Credentials of the admin performing an operation.
#[derive(clap::Args)]
struct AdminLogin {
    #[arg(long = "as", value_name = "USERNAME")]
    username: String,

    #[arg(long)]
    secret: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print a fresh HELPDESK_BODY_KEY value.
    Keygen,

    /// Create the first admin account on an empty database.
    BootstrapAdmin {
        username: String,
        #[arg(long)]
        secret: String,
    },

    /// Issue an invitation code for a role.
    Invite {
        #[command(flatten)]
        admin: AdminLogin,
        /// Admin, Instructor or Student.
        role: Role,
    },

    /// Issue a one-time secret for a user who forgot theirs.
    ResetSecret {
        #[command(flatten)]
        admin: AdminLogin,
        username: String,
    },

    /// List accounts and their roles.
    Users,

    /// List groups with their articles and members.
    Groups {
        /// Only groups whose name contains this text.
        #[arg(long)]
        search: Option<String>,
    },

    /// Write a snapshot of all articles, or of one group.
    Backup {
        #[arg(long)]
        group: Option<String>,
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Load a snapshot. Replaces every article unless --merge is given.
    Restore {
        file: PathBuf,
        #[arg(long)]
        merge: bool,
    },
}

fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk=info,helpdesk_core=info,helpdesk_db=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Command::Keygen = args.command {
        println!("{}", key_to_base64(&generate_body_key()));
        return Ok(());
    }

    // Config
    let config = HelpDeskConfig::from_env()?;
    let db_path = args.db.unwrap_or_else(|| {
        std::env::var("HELPDESK_DB_PATH")
            .unwrap_or_else(|_| "helpdesk.db".into())
            .into()
    });

    let desk = HelpDesk::open(&db_path, config)?;

    match args.command {
        Command::Keygen => {}
        Command::BootstrapAdmin { username, secret } => {
            let id = desk.bootstrap_admin(&username, &secret, &secret)?;
            println!("Created admin {} ({})", username, id);
        }
        Command::Invite { admin, role } => {
            let requester = login(&desk, &admin)?;
            let invitation = desk.issue_invitation(&requester, role)?;
            println!("{}  ({}, expires {})", invitation.code, invitation.role, invitation.expires_at);
        }
        Command::ResetSecret { admin, username } => {
            let requester = login(&desk, &admin)?;
            let issued = desk.issue_one_time_secret(&requester, &username)?;
            println!("{}  (expires {})", issued.secret, issued.expires_at);
        }
        Command::Users => {
            for user in desk.list_users()? {
                let roles: Vec<_> = user.roles.iter().map(|r| r.as_str()).collect();
                println!("{:<20} {:<30} {}", user.username, user.full_name, roles.join(", "));
            }
        }
        Command::Groups { search } => {
            let groups = match search {
                Some(fragment) => desk.search_groups(&fragment)?,
                None => desk.list_groups_with_summary()?,
            };
            for group in groups {
                println!("{}", group.name);
                println!("  articles: {}", group.article_titles);
                println!("  members:  {}", group.member_names);
            }
        }
        Command::Backup { group, out } => {
            let count = match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    let mut writer = BufWriter::new(file);
                    let count = desk.backup_to_writer(&mut writer, group.as_deref())?;
                    writer.flush()?;
                    count
                }
                None => desk.backup_to_writer(io::stdout().lock(), group.as_deref())?,
            };
            info!("{} articles backed up", count);
        }
        Command::Restore { file, merge } => {
            let input = std::fs::read(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let mode = if merge { RestoreMode::Merge } else { RestoreMode::Replace };
            let report = desk.restore(&input, mode)?;
            println!("Restored {} articles, skipped {}", report.restored, report.skipped);
        }
    }

    Ok(())
}

fn login(desk: &HelpDesk, admin: &AdminLogin) -> Result<UserId> {
    match desk.verify(&admin.username, &admin.secret)? {
        LoginOutcome::Authenticated(id) => Ok(id),
        LoginOutcome::ResetRequired(_) => {
            bail!("{} must choose a new secret before continuing", admin.username)
        }
    }
}
