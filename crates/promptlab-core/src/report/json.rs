use crate::dashboard::Dashboard;
use anyhow::Result;
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

pub fn to_json(d: &Dashboard) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "promptlab_version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "dashboard": serde_json::to_value(d)?,
    }))
}

pub fn write_json(d: &Dashboard, out: &Path) -> Result<()> {
    let v = to_json(d)?;
    std::fs::write(out, serde_json::to_string_pretty(&v)?)?;
    Ok(())
}
