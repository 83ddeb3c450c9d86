//! Biosample JSON input and output.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;

/// Read biosample records from a JSON list or a `{"biosamples": [...]}` object.
pub fn read_biosamples(path: &Path) -> Result<Vec<Value>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let document: Value =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    biosample_records(document).with_context(|| format!("read biosamples from {}", path.display()))
}

pub fn biosample_records(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut object) => match object.remove("biosamples") {
            Some(Value::Array(records)) => Ok(records),
            Some(_) => bail!("\"biosamples\" is not a list"),
            None => bail!("expected a list of biosamples or an object with a \"biosamples\" list"),
        },
        _ => bail!("expected a list of biosamples or an object with a \"biosamples\" list"),
    }
}

/// Write `value` as JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = to_json(value, pretty)?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.context("serialize JSON")
}
