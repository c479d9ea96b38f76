use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Append-only log of evaluation records, one per line. The path is injected
/// at construction so callers (and tests) decide where records persist.
/// There is no in-memory cache: every read goes back to the file.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryLog { path: path.into() }
    }

    /// Appends one record. Each append opens, writes and closes the file on
    /// its own, so a record is on disk before the caller echoes it and a
    /// crash between expressions keeps everything already written.
    pub fn append(&self, record: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open history file '{}'", self.path.display()))?;
        writeln!(file, "{}", record)
            .with_context(|| format!("cannot write to history file '{}'", self.path.display()))?;
        Ok(())
    }

    /// Reads every record in insertion order. A missing file is an empty
    /// history, not an error.
    pub fn records(&self) -> Result<Vec<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("cannot read history file '{}'", self.path.display())
                });
            }
        };
        BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("cannot read history file '{}'", self.path.display()))
    }

    /// Truncates the log to the empty sequence.
    pub fn clear(&self) -> Result<()> {
        File::create(&self.path)
            .with_context(|| format!("cannot clear history file '{}'", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryLog;

    fn temp_log(name: &str) -> HistoryLog {
        let mut path = std::env::temp_dir();
        path.push(format!("histcalc-{}-{}.log", std::process::id(), name));
        let _ = std::fs::remove_file(&path);
        HistoryLog::new(path)
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let log = temp_log("missing");
        assert_eq!(log.records().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn appended_records_come_back_in_order() {
        let log = temp_log("ordered");
        log.append("2 + 2 = 4").unwrap();
        log.append("10/0 = Division by zero").unwrap();
        log.append("2**3 = 8").unwrap();
        assert_eq!(
            log.records().unwrap(),
            vec!["2 + 2 = 4", "10/0 = Division by zero", "2**3 = 8"]
        );
    }

    #[test]
    fn clear_empties_the_log() {
        let log = temp_log("cleared");
        log.append("1 + 1 = 2").unwrap();
        log.clear().unwrap();
        assert_eq!(log.records().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn clear_on_missing_file_is_fine() {
        let log = temp_log("clear-missing");
        log.clear().unwrap();
        assert_eq!(log.records().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn appending_after_clear_starts_fresh() {
        let log = temp_log("fresh");
        log.append("old = 1").unwrap();
        log.clear().unwrap();
        log.append("new = 2").unwrap();
        assert_eq!(log.records().unwrap(), vec!["new = 2"]);
    }
}
