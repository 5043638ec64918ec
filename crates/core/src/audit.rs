//! Append-only upload audit log.
//!
//! One line per committed upload:
//!
//! ```text
//! [2026-01-01T00:00:00.123Z] File: file-1767225600123-42-report.pdf, EHR System: Epic
//! ```
//!
//! Each append opens the log, writes the complete line with a single `write_all` and closes the
//! file again. Concurrent appenders rely on the platform's atomic small-append guarantee; lines
//! may interleave in any order but are never torn. No lock is held between requests.
//!
//! Backslashes and control characters in the filename or label are escaped before writing
//! (`\\`, `\n`, `\u{7f}`, ...) so every upload occupies exactly one line. Parsing reverses the
//! escape.

use crate::{AuditError, AuditResult};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;

const FILE_MARKER: &str = "] File: ";
const EHR_SYSTEM_MARKER: &str = ", EHR System: ";

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub ehr_system: String,
}

impl AuditEntry {
    /// Record stamped with the current time, truncated to millisecond precision.
    pub fn new(filename: impl Into<String>, ehr_system: impl Into<String>) -> Self {
        Self::at(Utc::now().trunc_subsecs(3), filename, ehr_system)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        filename: impl Into<String>,
        ehr_system: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            filename: filename.into(),
            ehr_system: ehr_system.into(),
        }
    }
}

impl fmt::Display for AuditEntry {
    /// Formats the log line without its trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] File: {}, EHR System: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            escape_field(&self.filename),
            escape_field(&self.ehr_system)
        )
    }
}

impl FromStr for AuditEntry {
    type Err = AuditError;

    /// Parses a log line (with or without its newline).
    ///
    /// The filename ends at the first `, EHR System: `; sanitised filenames cannot contain `:`
    /// so the split is unambiguous for them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        let malformed = || AuditError::Parse(line.to_string());

        let rest = line.strip_prefix('[').ok_or_else(malformed)?;
        let (timestamp, rest) = rest.split_once(FILE_MARKER).ok_or_else(malformed)?;
        let (filename, ehr_system) = rest.split_once(EHR_SYSTEM_MARKER).ok_or_else(malformed)?;

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| malformed())?
            .with_timezone(&Utc);

        Ok(Self::at(
            timestamp,
            unescape_field(filename),
            unescape_field(ehr_system),
        ))
    }
}

fn escape_field(value: &str) -> Cow<'_, str> {
    if !value.chars().any(|c| c == '\\' || c.is_control()) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if c == '\\' || c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}

/// Inverse of [`escape_field`]. Unknown escape sequences are kept as written.
fn unescape_field(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(pos) = rest.find('\\') {
        unescaped.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (decoded, consumed) = match tail.as_bytes().get(1) {
            Some(b'\\') => (Some('\\'), 2),
            Some(b'n') => (Some('\n'), 2),
            Some(b'r') => (Some('\r'), 2),
            Some(b't') => (Some('\t'), 2),
            Some(b'u') => match tail[2..].strip_prefix('{').and_then(|t| t.split_once('}')) {
                Some((hex, _)) => (
                    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
                    hex.len() + 4,
                ),
                None => (None, 0),
            },
            _ => (None, 0),
        };

        match decoded {
            Some(c) => {
                unescaped.push(c);
                rest = &tail[consumed..];
            }
            None => {
                unescaped.push('\\');
                rest = &tail[1..];
            }
        }
    }

    unescaped.push_str(rest);
    unescaped
}

/// Appends [`AuditEntry`] lines to the shared log file.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Append one line for `entry`, creating the log if needed.
    ///
    /// # Errors
    /// Returns [`AuditError::Append`] if the log cannot be opened or written. Callers decide
    /// whether that matters; the upload handler logs it and carries on.
    pub async fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        let line = format!("{entry}\n");
        let append_error = |source| AuditError::Append {
            path: self.log_path.clone(),
            source,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(append_error)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(append_error)?;
        file.flush().await.map_err(append_error)?;

        Ok(())
    }

    /// Read and parse every line of the log. A missing log reads as empty.
    ///
    /// Lines that do not parse are skipped with a warning so one bad line does not hide the
    /// rest of the log.
    pub fn read_entries(&self) -> AuditResult<Vec<AuditEntry>> {
        let contents = match std::fs::read_to_string(&self.log_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AuditError::Read(e)),
        };

        let entries = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
            .filter_map(|(index, line)| match line.parse::<AuditEntry>() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        "skipping audit line {} in {}: {}",
                        index + 1,
                        self.log_path.display(),
                        e
                    );
                    None
                }
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap() + chrono::Duration::milliseconds(678)
    }

    #[test]
    fn test_line_format() {
        let entry = AuditEntry::at(fixed_time(), "file-1-2-report.pdf", "Epic");
        assert_eq!(
            entry.to_string(),
            "[2026-01-02T03:04:05.678Z] File: file-1-2-report.pdf, EHR System: Epic"
        );
    }

    #[test]
    fn test_whole_seconds_keep_millisecond_field() {
        let entry = AuditEntry::at(
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            "f",
            "Unknown",
        );
        assert!(entry.to_string().starts_with("[2026-01-02T03:04:05.000Z]"));
    }

    #[test]
    fn test_parse_line() {
        let entry: AuditEntry =
            "[2026-01-02T03:04:05.678Z] File: file-1-2-a b.txt, EHR System: Cerner Millennium\n"
                .parse()
                .unwrap();

        assert_eq!(entry.timestamp, fixed_time());
        assert_eq!(entry.filename, "file-1-2-a b.txt");
        assert_eq!(entry.ehr_system, "Cerner Millennium");
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!("File: x, EHR System: y".parse::<AuditEntry>().is_err());
        assert!("[not-a-time] File: x, EHR System: y"
            .parse::<AuditEntry>()
            .is_err());
        assert!("[2026-01-02T03:04:05.678Z] File: x"
            .parse::<AuditEntry>()
            .is_err());
    }

    #[test]
    fn test_control_characters_are_escaped() {
        let entry = AuditEntry::at(fixed_time(), "file-1-2-a.txt", "Epic\n[fake] line");
        let line = entry.to_string();

        assert!(!line.contains('\n'));
        assert!(line.ends_with("EHR System: Epic\\n[fake] line"));
    }

    #[test]
    fn test_backslashes_and_control_characters_round_trip() {
        let labels = [
            "Epic\n[fake] line",
            r"C:\ehr\new",
            r"literal \n not a newline",
            "tab\there\r\u{7f}\u{1b}end",
            r"dangling \",
            r"\u{zz} stays",
        ];

        for label in labels {
            let entry = AuditEntry::at(fixed_time(), "file-1-2-a.txt", label);
            let line = entry.to_string();
            assert!(!line.contains('\n'), "{line}");

            let parsed: AuditEntry = line.parse().unwrap();
            assert_eq!(parsed.ehr_system, label, "{line}");
        }
    }

    #[test]
    fn test_unescape_keeps_unknown_sequences() {
        assert_eq!(unescape_field(r"a\qb"), r"a\qb");
        assert_eq!(unescape_field(r"end\"), r"end\");
        assert_eq!(unescape_field(r"\u{41}"), "A");
    }

    #[tokio::test]
    async fn test_append_creates_log_and_adds_one_line_per_call() {
        let temp = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp.path().join("logs.txt"));

        logger
            .append(&AuditEntry::at(fixed_time(), "file-1-1-a.txt", "Epic"))
            .await
            .unwrap();
        logger
            .append(&AuditEntry::at(fixed_time(), "file-2-2-b.txt", "Unknown"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(logger.log_path()).unwrap();
        assert_eq!(
            contents,
            "[2026-01-02T03:04:05.678Z] File: file-1-1-a.txt, EHR System: Epic\n\
             [2026-01-02T03:04:05.678Z] File: file-2-2-b.txt, EHR System: Unknown\n"
        );

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].filename, "file-2-2-b.txt");
    }

    #[tokio::test]
    async fn test_append_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let log_path = temp.path().join("logs.txt");
        std::fs::create_dir(&log_path).unwrap();

        let result = AuditLogger::new(&log_path)
            .append(&AuditEntry::new("file-1-1-a.txt", "Epic"))
            .await;

        assert!(matches!(result, Err(AuditError::Append { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_appends_produce_whole_lines() {
        let temp = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp.path().join("logs.txt"));

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let logger = logger.clone();
                tokio::spawn(async move {
                    logger
                        .append(&AuditEntry::new(format!("file-{i}-0-x.txt"), "Epic"))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let entries = logger.read_entries().unwrap();
        assert_eq!(entries.len(), 50);
        assert!(entries.iter().all(|e| e.ehr_system == "Epic"));
    }

    #[test]
    fn test_read_entries_skips_malformed_lines() {
        let temp = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp.path().join("logs.txt"));
        std::fs::write(
            logger.log_path(),
            "[2026-01-02T03:04:05.678Z] File: file-1-1-a.txt, EHR System: Epic\n\
             not an audit line\n\
             \n\
             [2026-01-02T03:04:05.678Z] File: file-2-2-b.txt, EHR System: Unknown\n",
        )
        .unwrap();

        let entries = logger.read_entries().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].filename, "file-1-1-a.txt");
        assert_eq!(entries[1].filename, "file-2-2-b.txt");
    }

    #[test]
    fn test_read_entries_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp.path().join("logs.txt"));
        assert!(logger.read_entries().unwrap().is_empty());
    }

    #[test]
    fn test_new_entry_round_trips_through_line() {
        let entry = AuditEntry::new("file-1-2-a.txt", "Epic");
        let parsed: AuditEntry = entry.to_string().parse().unwrap();
        assert_eq!(parsed, entry);
    }
}
