use crate::error::CliError;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_report<T: Serialize>(value: &T, path: &str) -> Result<(), CliError> {
    tokio::fs::write(path, to_json(value)?).await?;
    Ok(())
}

pub fn print_report<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", to_json(value)?);
    Ok(())
}

pub fn print_table(title: &str, rows: &BTreeMap<String, String>) {
    let width = rows.keys().map(String::len).max().unwrap_or(0).max(8);
    println!("{title}");
    println!("{}", "-".repeat(width + 24));
    for (key, value) in rows {
        println!("{key:<width$} {value}");
    }
}
