//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod config;
pub mod delete;
pub mod embed;
pub mod index;
pub mod restore;
pub mod search;
pub mod show;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args),
        Commands::Show(args) => show::run(ctx, args),
        Commands::Delete(args) => delete::run(ctx, args),
        Commands::Restore(args) => restore::run(ctx, args),
        Commands::Embed(args) => embed::run(ctx, args),
        Commands::Index(args) => index::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}
