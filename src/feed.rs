use crate::error::Anomaly;
use crate::read_dir::read_dir;
use crate::util::null_default;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One line of the play-by-play log: every game on the schedule as of one moment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Tick {
    #[serde(deserialize_with = "null_default")]
    pub schedule: Vec<Value>,
    #[serde(deserialize_with = "null_default")]
    pub sim: Sim,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Sim {
    pub season: Option<u16>,
}

/// Streams ticks from an NDJSON file, a gzipped NDJSON file, or a directory of them (processed in
/// path order). Lines that don't parse are logged and skipped; I/O errors end the stream.
pub struct TickReader {
    pending: VecDeque<PathBuf>,
    current: Option<(PathBuf, usize, Lines<Box<dyn BufRead>>)>,
}

impl TickReader {
    pub fn open(path: &Path) -> Result<TickReader> {
        let pending = if path.is_dir() {
            read_dir(path)
                .with_context(|| format!("failed to list {}", path.display()))?
                .into_iter()
                .map(|entry| path.join(entry.file_name))
                .collect()
        } else {
            std::iter::once(path.to_path_buf()).collect()
        };
        Ok(TickReader {
            pending,
            current: None,
        })
    }

    fn next_file(&mut self) -> Result<bool> {
        let path = match self.pending.pop_front() {
            Some(path) => path,
            None => return Ok(false),
        };
        debug!(path = %path.display(), "reading feed file");
        let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
        let reader: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let reader: Box<dyn BufRead> = Box::new(BufReader::new(reader));
        self.current = Some((path, 0, reader.lines()));
        Ok(true)
    }
}

impl Iterator for TickReader {
    type Item = Result<Tick>;

    fn next(&mut self) -> Option<Result<Tick>> {
        loop {
            if let Some((path, number, lines)) = &mut self.current {
                match lines.next() {
                    Some(Ok(line)) => {
                        *number += 1;
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str(&line) {
                            Ok(tick) => return Some(Ok(tick)),
                            Err(err) => {
                                let anomaly = Anomaly::malformed("tick", err);
                                warn!(path = %path.display(), line = *number, %anomaly, "skipping line");
                            }
                        }
                    }
                    Some(Err(err)) => {
                        let context = format!("failed to read {}", path.display());
                        self.current = None;
                        self.pending.clear();
                        return Some(Err(anyhow::Error::new(err).context(context)));
                    }
                    None => self.current = None,
                }
            } else {
                match self.next_file() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(err) => {
                        self.pending.clear();
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TickReader;
    use flate2::{write::GzEncoder, Compression};
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        fs::write(
            &path,
            concat!(
                "{\"sim\": {\"season\": 3}, \"schedule\": [{\"id\": \"G1\"}]}\n",
                "not json at all\n",
                "\n",
                "{\"sim\": null, \"schedule\": null}\n",
            ),
        )
        .unwrap();

        let ticks: Vec<_> = TickReader::open(&path).unwrap().map(Result::unwrap).collect();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].sim.season, Some(3));
        assert_eq!(ticks[0].schedule.len(), 1);
        assert_eq!(ticks[1].sim.season, None);
        assert!(ticks[1].schedule.is_empty());
    }

    #[test]
    fn test_directory_of_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();
        for (name, season) in &[("002.json.gz", 2), ("001.json.gz", 1)] {
            let mut writer = GzEncoder::new(Vec::new(), Compression::default());
            writeln!(writer, "{{\"sim\": {{\"season\": {}}}, \"schedule\": []}}", season).unwrap();
            fs::write(dir.path().join(name), writer.finish().unwrap()).unwrap();
        }

        let seasons: Vec<_> = TickReader::open(dir.path())
            .unwrap()
            .map(|tick| tick.unwrap().sim.season)
            .collect();
        assert_eq!(seasons, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = TickReader::open(&dir.path().join("nope.json")).unwrap();
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}
