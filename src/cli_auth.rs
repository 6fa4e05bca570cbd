//! Account administration for the stats database.
//!
//! Sign-up and login live with the identity provider; this tool creates the
//! matching local users and hands out session tokens for them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use soundstats_server::listening::{ListeningStatsStore, SocialGraphStore, UserIdentityStore};
use soundstats_server::SqliteStatsStore;

const STATS_DB_FILE_NAME: &str = "stats.db";

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the stats database.
    #[clap(value_parser = parse_path)]
    pub db_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a user with the given handle.
    AddUser {
        user_handle: String,
        #[clap(long)]
        display_name: Option<String>,
    },

    /// Issues a new session token for a user, creating the user if missing.
    IssueToken { user_handle: String },

    /// Shows a user's profile, friends and first recorded play.
    Show { user_handle: String },

    /// Shows the path of the stats db.
    Where,
}

fn user_id_for(store: &SqliteStatsStore, user_handle: &str) -> Result<usize> {
    match store.get_user_id_by_handle(user_handle)? {
        Some(id) => Ok(id),
        None => bail!("No user with handle {}", user_handle),
    }
}

fn execute(store: &SqliteStatsStore, db_path: &Path, command: Command) -> Result<()> {
    match command {
        Command::AddUser {
            user_handle,
            display_name,
        } => {
            let id = store.create_user(&user_handle, display_name.as_deref())?;
            println!("Created user {} with id {}", user_handle, id);
        }
        Command::IssueToken { user_handle } => {
            let id = match store.get_user_id_by_handle(&user_handle)? {
                Some(id) => id,
                None => {
                    let id = store.create_user(&user_handle, None)?;
                    println!("Created user {} with id {}", user_handle, id);
                    id
                }
            };
            let token = store.issue_auth_token(id)?;
            println!("{}", token);
        }
        Command::Show { user_handle } => {
            let id = user_id_for(store, &user_handle)?;
            let profile = store
                .get_user(id)?
                .with_context(|| format!("User {} vanished", id))?;
            println!("{:#?}", profile);

            let friends = store.get_friend_ids(id)?;
            println!("\nFriends:");
            if friends.is_empty() {
                println!("  (none)");
            }
            for friend_id in friends {
                match store.get_user(friend_id)? {
                    Some(friend) => println!("  - {} ({})", friend.handle, friend.id),
                    None => println!("  - {}", friend_id),
                }
            }

            match store.get_first_listen_at(id)? {
                Some(first) => println!("\nFirst play: {}", first.to_rfc3339()),
                None => println!("\nNo plays recorded"),
            }
        }
        Command::Where => println!("{}", db_path.display()),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if !cli_args.db_dir.is_dir() {
        bail!("db_dir is not a directory: {:?}", cli_args.db_dir);
    }
    let db_path = cli_args.db_dir.join(STATS_DB_FILE_NAME);
    let store = SqliteStatsStore::new(&db_path)
        .with_context(|| format!("Failed to open stats db at {:?}", db_path))?;

    execute(&store, &db_path, cli_args.command)
}
