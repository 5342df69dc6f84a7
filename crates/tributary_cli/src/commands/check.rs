use super::load_pipeline;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use std::path::Path;
use tributary_core::Record;

/// Execute the `check` command: run one resource's rules over local
/// records and report what would be kept.
pub fn execute(pipeline_path: &Path, resource: &str, records_path: &Path) -> Result<()> {
    let config = load_pipeline(pipeline_path)?;
    config.check()?;
    let resource_config = config
        .resources
        .get(resource)
        .ok_or_else(|| eyre!("Unknown resource '{}'", resource))?;
    let spec = resource_config.compile_spec(resource)?;

    let text = std::fs::read_to_string(records_path)
        .wrap_err_with(|| format!("Failed to read records: {}", records_path.display()))?;
    let records: Vec<Record> = serde_json::from_str(&text)
        .wrap_err_with(|| format!("Expected a JSON array of objects in {}", records_path.display()))?;

    let total = records.len();
    let filtered = spec.filter(records);
    for (record, rejection) in &filtered.rejected {
        let id = record.get("id").map_or_else(|| "-".to_string(), ToString::to_string);
        println!("Rejected id={}: {}", id, rejection);
    }
    println!("Records:  {}", total);
    println!("Accepted: {}", filtered.accepted.len());
    println!("Rejected: {}", filtered.rejected.len());
    Ok(())
}
