use crate::error::Anomaly;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Reads a previously persisted output. Anything that can't be used is treated as if no prior data
/// existed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no prior data");
            return None;
        }
        Err(err) => {
            conflict(path, err);
            return None;
        }
    };
    match serde_json::from_reader(BufReader::new(file)) {
        Ok(value) => Some(value),
        Err(err) => {
            conflict(path, err);
            None
        }
    }
}

fn conflict(path: &Path, err: impl ToString) {
    let anomaly = Anomaly::PersistenceConflict {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };
    warn!(%anomaly, "ignoring prior data");
}

/// Writes tab-indented JSON through a sibling temporary file so readers never see a torn file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(
            File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?,
        );
        let mut serializer =
            Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"\t"));
        value
            .serialize(&mut serializer)
            .with_context(|| format!("failed to serialize {}", path.display()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", tmp.display()))?;
    debug!(path = %path.display(), "wrote output");
    Ok(())
}
