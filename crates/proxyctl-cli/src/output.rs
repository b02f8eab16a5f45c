//! JSON rendering of command results.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};

use proxyctl_core::orchestrator::UndeployReport;
use proxyctl_core::pipeline::ExportedBundle;
use proxyctl_core::types::Revision;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
pub struct ExportSummary {
    pub filename: String,
    pub path: String,
    pub revision: Revision,
    pub bytes: usize,
}

impl ExportSummary {
    pub fn new(bundle: &ExportedBundle, path: &Path) -> Self {
        Self {
            filename: bundle.filename.clone(),
            path: path.display().to_string(),
            revision: bundle.revision,
            bytes: bundle.bytes.len(),
        }
    }
}

pub fn undeploy_json(report: &UndeployReport) -> Value {
    match report {
        UndeployReport::Revision { revision, response } => json!({
            "revision": revision,
            "response": response,
        }),
        UndeployReport::All(outcomes) => Value::Array(
            outcomes
                .iter()
                .map(|o| {
                    json!({
                        "asset": o.asset,
                        "revision": o.revision,
                        "error": o.error.as_ref().map(|e| e.to_string()),
                    })
                })
                .collect(),
        ),
    }
}
