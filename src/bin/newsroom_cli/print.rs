#![deny(clippy::all, clippy::pedantic)]

use newsroom::collection::Notice;
use serde::Serialize;

use crate::client::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{out}");
    Ok(())
}

pub fn print_notice(notice: Option<Notice>) {
    match notice {
        Some(Notice::Success(message)) => println!("{message}"),
        Some(Notice::Failure(message)) => eprintln!("{message}"),
        None => {}
    }
}
