use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use super::OutputFormat;

/// Print rows in the specified format
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_default();
            println!("{}", json);
        }
        OutputFormat::Table => {
            let table = Table::new(data).to_string();
            println!("{}", table);
        }
        OutputFormat::Plain => {
            // Pipe-separated field values, one row per line
            let json = serde_json::to_value(data).unwrap_or_default();
            if let Some(arr) = json.as_array() {
                for item in arr {
                    if let Some(obj) = item.as_object() {
                        let values: Vec<String> = obj.values().map(plain_value).collect();
                        println!("{}", values.join("|"));
                    }
                }
            }
        }
    }
}

/// Print a single item; tables make no sense for arbitrary payloads, so
/// only `plain` differs (compact JSON)
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Table => {
            let json = serde_json::to_string_pretty(data).unwrap_or_default();
            println!("{}", json);
        }
        OutputFormat::Plain => {
            let json = serde_json::to_string(data).unwrap_or_default();
            println!("{}", json);
        }
    }
}

fn plain_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "".to_string(),
        other => other.to_string(),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
