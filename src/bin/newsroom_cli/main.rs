//! newsroom-cli: command-line client for the newsroom portal API.
//! Thin layer over the `newsroom` library; every command goes through the
//! same session store, controllers and upload client as any other consumer.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;

use clap::Parser;
use tracing::warn;

use args::{Cli, Commands};
use client::{CliError, build_ctx};
use handlers::{assets, auth, comments, dashboard, files, posts, users};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = newsroom::config::load(cli.config_file.as_deref(), &cli.overrides)?;
    newsroom::telemetry::init(&settings.logging)?;

    let mut ctx = build_ctx(settings, cli.yes)?;
    if let Err(err) = ctx.auth.bootstrap().await {
        warn!(
            target = "newsroom_cli",
            op = "cli::bootstrap",
            result = "error",
            error = %err,
            "Could not complete stored session"
        );
    }

    match cli.command {
        Commands::Auth(cmd) => auth::handle(&mut ctx, cmd.action).await?,
        Commands::Posts(cmd) => posts::handle(&ctx, cmd.action).await?,
        Commands::Users(cmd) => users::handle(&ctx, cmd.action).await?,
        Commands::Comments(cmd) => comments::handle(&ctx, cmd.action).await?,
        Commands::Files(cmd) => files::handle(&ctx, cmd.action).await?,
        Commands::Assets(cmd) => assets::handle(&ctx, cmd.action).await?,
        Commands::Dashboard => dashboard::handle(&ctx).await?,
    }

    Ok(())
}
