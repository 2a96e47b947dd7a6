use crate::error::CliError;
use connectors::ConnectionSummary;

pub fn print_summary(summary: &ConnectionSummary, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let or_unset = |value: Option<String>| value.unwrap_or_else(|| "(unset)".to_string());

    println!("{:<16} {}", "Driver class", or_unset(summary.driver_class.clone()));
    println!("{:<16} {}", "URL", or_unset(summary.url.clone()));
    println!("{:<16} {}", "Username", or_unset(summary.username.clone()));
    println!(
        "{:<16} {}",
        "Password",
        if summary.password_set { "(set)" } else { "(unset)" }
    );
    println!("{:<16} {}", "Input table", or_unset(summary.input_table_name.clone()));
    println!(
        "{:<16} {}",
        "Input columns",
        or_unset(summary.input_column_names.as_ref().map(|c| c.join(", ")))
    );
    println!("{:<16} {}", "Primary key", or_unset(summary.primary_key_column.clone()));
    println!("{:<16} {}", "Chunks", summary.num_chunks);
    println!("{:<16} {}", "Min id", or_unset(summary.min_id.map(|id| id.to_string())));
    println!("{:<16} {}", "Max id", or_unset(summary.max_id.map(|id| id.to_string())));

    if summary.driver_properties.is_empty() {
        println!("{:<16} (none)", "Properties");
    } else {
        println!("Properties:");
        for (key, value) in &summary.driver_properties {
            println!("  {key} = {value}");
        }
    }

    Ok(())
}
