//! Interactive prompts for runs started without a target.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

/// Print `message` and read one trimmed line from stdin.
pub async fn read_line(message: &str) -> Result<String> {
    let message = message.to_string();
    tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", message)?;
        stdout.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read from stdin")
}

/// What the user asked to harvest.
#[derive(Debug, PartialEq, Eq)]
pub enum TargetAnswer {
    Category(u64),
    Search(String),
}

/// Ask for a category id or a name to search for. Empty input aborts.
pub async fn target() -> Result<TargetAnswer> {
    let answer = read_line("Category id, or a name to search for: ").await?;
    match parse_target(&answer) {
        Some(target) => Ok(target),
        None => bail!("No category id or search name given"),
    }
}

/// Ask for a folder name after the remote lookup failed; empty means the id.
pub async fn folder_name(category_id: u64) -> Result<String> {
    let answer = read_line(&format!(
        "Could not fetch the category name. Folder name [{}]: ",
        category_id
    ))
    .await?;
    Ok(folder_or_id(answer, category_id))
}

/// Digits select a category; anything else is a name search.
fn parse_target(answer: &str) -> Option<TargetAnswer> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    Some(match answer.parse() {
        Ok(id) => TargetAnswer::Category(id),
        Err(_) => TargetAnswer::Search(answer.to_string()),
    })
}

fn folder_or_id(answer: String, category_id: u64) -> String {
    if answer.trim().is_empty() {
        category_id.to_string()
    } else {
        answer
    }
}
