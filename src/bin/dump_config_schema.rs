//! Prints the JSON schema of `config.toml`, or writes it to the path given as
//! the first argument.

use std::fs;

use anyhow::{Context, Result};

fn main() -> Result<()> {
    let schema = serde_json::to_string_pretty(&snapframe::Config::json_schema())?;
    match std::env::args_os().nth(1) {
        Some(path) => fs::write(&path, schema)
            .with_context(|| format!("Failed to write {}", path.to_string_lossy()))?,
        None => println!("{schema}"),
    }
    Ok(())
}
