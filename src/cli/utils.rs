use serde_json::Value;

/// Pretty-print a JSON payload to stdout
pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
