//! `userstore` command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto `UserService` use cases.
//! - Print results as one JSON document per line on stdout.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use userstore_core::{
    default_log_level, RegisterUserRequest, Store, StoreConfig, UserId, UserService,
};

/// Manage user accounts, user types and section grants.
#[derive(Parser, Debug)]
#[command(name = "userstore")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file; in memory when omitted
    #[arg(long, global = true, env = "USERSTORE_DB")]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "USERSTORE_LOG_LEVEL", default_value_t = default_log_level().to_string())]
    log_level: String,

    /// Absolute directory for rolling log files; logging is off when omitted
    #[arg(long, global = true, env = "USERSTORE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user type
    AddType {
        alias: String,
        name: String,
        #[arg(long, default_value = "")]
        permissions: String,
    },
    /// Create a user with optional section grants
    AddUser {
        username: String,
        name: String,
        email: String,
        #[arg(long)]
        user_type: i64,
        #[arg(long)]
        password: Option<String>,
        #[arg(long = "section")]
        sections: Vec<String>,
    },
    /// List users, optionally filtered by username
    List {
        #[arg(long = "username")]
        usernames: Vec<String>,
    },
    /// List user types
    Types,
    /// Show one user
    Show { id: UserId },
    /// Grant a section to a user
    Grant { id: UserId, section: String },
    /// Revoke a section from a user
    Revoke { id: UserId, section: String },
    /// Delete a user and its section grants
    Delete { id: UserId },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StoreConfig {
        db_path: cli.db,
        log_level: cli.log_level,
        log_dir: cli.log_dir,
        ..StoreConfig::default()
    };
    config.init_logging()?;

    let mut service = UserService::new(Store::open_with_config(&config)?);
    log::info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Command::AddType {
            alias,
            name,
            permissions,
        } => print_json(&service.register_user_type(&alias, &name, &permissions)?),
        Command::AddUser {
            username,
            name,
            email,
            user_type,
            password,
            sections,
        } => {
            let request = RegisterUserRequest {
                user_type,
                name,
                username,
                email,
                password: password.unwrap_or_default(),
                sections,
            };
            print_json(&service.register_user(&request)?)
        }
        Command::List { usernames } => {
            for user in service.list_users(&usernames)? {
                print_json(&user)?;
            }
            Ok(())
        }
        Command::Types => {
            for user_type in service.list_user_types()? {
                print_json(&user_type)?;
            }
            Ok(())
        }
        Command::Show { id } => match service.get_user(id)? {
            Some(user) => print_json(&user),
            None => Err(format!("user not found: {id}").into()),
        },
        Command::Grant { id, section } => print_json(&service.grant_section(id, &section)?),
        Command::Revoke { id, section } => print_json(&service.revoke_section(id, &section)?),
        Command::Delete { id } => print_json(&service.delete_user(id)?),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::AddType { .. } => "add-type",
        Command::AddUser { .. } => "add-user",
        Command::List { .. } => "list",
        Command::Types => "types",
        Command::Show { .. } => "show",
        Command::Grant { .. } => "grant",
        Command::Revoke { .. } => "revoke",
        Command::Delete { .. } => "delete",
    }
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
