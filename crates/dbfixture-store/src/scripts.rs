//! Seed scripts
//!
//! Scripts use the batch convention of the SQL Server tools: a line holding
//! only `GO` (any case) ends a batch. Each batch is sent on its own.

use crate::errors::Result;
use crate::sql::SqlExecutor;
use dbfixture_core::{ConnectionEndpoint, ProvisionError};
use std::path::Path;

/// Split script text into batches on `GO` separator lines
pub fn split_batches(script: &str) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in script.lines() {
        if line.trim().eq_ignore_ascii_case("go") {
            push_batch(&mut batches, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_batch(&mut batches, &current);
    batches
}

fn push_batch(batches: &mut Vec<String>, lines: &[&str]) {
    let batch = lines.join("\n");
    let batch = batch.trim();
    if !batch.is_empty() {
        batches.push(batch.to_string());
    }
}

/// Read a script file and split it into batches
pub fn load_script(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|err| ProvisionError::io(path, err))?;
    Ok(split_batches(&text))
}

/// Apply every script in order; returns the number of batches executed
pub async fn apply_scripts<P: AsRef<Path>>(
    executor: &dyn SqlExecutor,
    endpoint: &ConnectionEndpoint,
    scripts: &[P],
) -> Result<usize> {
    let mut executed = 0;
    for path in scripts {
        let path = path.as_ref();
        let batches = load_script(path)?;
        tracing::debug!(
            script = %path.display(),
            batches = batches.len(),
            "Applying seed script"
        );
        for batch in &batches {
            executor.execute(endpoint, batch).await?;
            executed += 1;
        }
    }
    Ok(executed)
}
