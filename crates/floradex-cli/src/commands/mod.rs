mod alerts;
mod enrich;
mod health;
mod import;
mod reset;
mod status;
mod watch;

use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::context::AppContext;
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let context = AppContext::build()?;

    match &cli.command {
        Command::Import(args) => import::run(args, &context).await,
        Command::Enrich(args) => enrich::run(args, &context).await,
        Command::Status(args) => status::run(args, &context),
        Command::Health(args) => health::run(args, &context),
        Command::Alerts(args) => alerts::run(args, &context),
        Command::Reset(args) => reset::run(args, &context),
        Command::Watch(args) => watch::run(args, &context).await,
    }
}
