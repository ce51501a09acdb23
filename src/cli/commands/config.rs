//! finhub config - Show the effective configuration

use clap::Args;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{FhError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print only the resolved database path
    #[arg(long)]
    pub db_path: bool,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    if args.db_path {
        let path = ctx.config.database_path(ctx.root());
        if ctx.robot_mode {
            return output::emit_json(&serde_json::json!({ "database_path": path }));
        }
        println!("{}", path.display());
        return Ok(());
    }

    if ctx.robot_mode {
        return output::emit_json(&ctx.config);
    }

    let rendered = toml::to_string_pretty(&ctx.config)
        .map_err(|err| FhError::Config(format!("render config: {err}")))?;
    println!("{rendered}");
    Ok(())
}
