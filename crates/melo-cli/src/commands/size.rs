use anyhow::Result;
use colored::Colorize;
use melo_logging::{format_size, parse_size};

pub fn execute(value: &str) -> Result<()> {
    let bytes = parse_size(value)?;
    println!("{} bytes ({})", bytes.to_string().cyan().bold(), format_size(bytes));
    Ok(())
}
