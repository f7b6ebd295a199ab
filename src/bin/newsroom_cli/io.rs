#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use newsroom::client::AssetBlob;

use crate::args::PasswordInput;
use crate::client::CliError;

pub fn read_value(val: Option<String>, file: Option<PathBuf>) -> Result<String, CliError> {
    read_opt_value(val, file)?.ok_or_else(|| CliError::InvalidInput("value required".into()))
}

pub fn read_opt_value(
    val: Option<String>,
    file: Option<PathBuf>,
) -> Result<Option<String>, CliError> {
    if let Some(path) = file {
        let data = fs::read_to_string(&path).map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })?;
        return Ok(Some(data));
    }
    Ok(val)
}

/// Secret from a file (trimmed) or the environment; files win.
pub fn read_secret(file: Option<PathBuf>, env: Option<String>) -> Result<Option<String>, CliError> {
    Ok(read_opt_value(env, file)?
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

pub fn read_password(input: PasswordInput) -> Result<Option<String>, CliError> {
    read_secret(input.password_file, input.password_env)
}

pub async fn read_blob(path: &Path) -> Result<AssetBlob, CliError> {
    AssetBlob::from_path(path)
        .await
        .map_err(|source| CliError::InputFile {
            path: path.display().to_string(),
            source,
        })
}

pub async fn read_opt_blob(path: Option<PathBuf>) -> Result<Option<AssetBlob>, CliError> {
    match path {
        Some(path) => Ok(Some(read_blob(&path).await?)),
        None => Ok(None),
    }
}

/// Ask on stderr, answer on stdin. Anything but y/yes declines.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, CliError> {
    if assume_yes {
        return Ok(true);
    }
    let stdin = std::io::stdin();
    let mut stderr = std::io::stderr();
    confirm_with(&mut stdin.lock(), &mut stderr, prompt)
}

pub fn confirm_with(
    input: &mut impl BufRead,
    output: &mut impl Write,
    prompt: &str,
) -> Result<bool, CliError> {
    write!(output, "{prompt} [y/N] ")
        .and_then(|()| output.flush())
        .map_err(|e| CliError::Output(e.to_string()))?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| CliError::InvalidInput(e.to_string()))?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
