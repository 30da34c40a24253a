use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::csv::{parse_rows, write_row};
use crate::error::{Result, ScrapeError};
use crate::record::{cell_text, PlayerRecord};

/// Append-only CSV of player records, plus the dedup keys already in it.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    header: Option<Vec<String>>,
    names: HashSet<String>,
    ids: HashSet<String>,
    rows: usize,
    /// The file is non-empty and its last line is unterminated.
    open_line: bool,
}

impl Dataset {
    /// Reads the dataset at `path`. A missing or empty file is a dataset with no header yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ScrapeError::persistence(path, e)),
        };

        let open_line = !text.is_empty() && !text.ends_with('\n') && !text.ends_with('\r');
        let mut rows = parse_rows(&text).into_iter();
        let Some(header) = rows.next() else {
            return Ok(Self {
                path,
                header: None,
                names: HashSet::new(),
                ids: HashSet::new(),
                rows: 0,
                open_line,
            });
        };

        let column = |name: &str| {
            header.iter().position(|c| c == name).ok_or_else(|| {
                ScrapeError::persistence(
                    &path,
                    io::Error::new(io::ErrorKind::InvalidData, format!("header has no {name:?} column")),
                )
            })
        };
        let name_col = column("userName")?;
        let id_col = column("id")?;

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        let mut count = 0;
        for row in rows {
            if let Some(name) = row.get(name_col) {
                names.insert(name.clone());
            }
            if let Some(id) = row.get(id_col) {
                ids.insert(id.clone());
            }
            count += 1;
        }

        debug!(path = %path.display(), rows = count, "Loaded dataset");

        Ok(Self {
            path,
            header: Some(header),
            names,
            ids,
            rows: count,
            open_line,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file already carries a header row.
    pub fn exists(&self) -> bool {
        self.header.is_some()
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn knows_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn knows_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Writes all `records` in one append. The header is written only when the
    /// file has none yet; rows are laid out by the existing header's columns.
    pub fn append(&mut self, records: &[PlayerRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };

        let write_header = self.header.is_none();
        let header = self.header.clone().unwrap_or_else(|| first.header());

        let mut buf = Vec::new();
        if self.open_line {
            buf.push(b'\n');
        }
        let encode = |buf: &mut Vec<u8>| -> io::Result<()> {
            if write_header {
                write_row(&mut *buf, &header)?;
            }
            for record in records {
                write_row(&mut *buf, &aligned_row(record, &header))?;
            }
            Ok(())
        };
        encode(&mut buf).map_err(|e| ScrapeError::persistence(&self.path, e))?;

        self.write_all(&buf)
            .map_err(|e| ScrapeError::persistence(&self.path, e))?;

        for record in records {
            self.names.insert(record.user_name());
            self.ids.insert(record.id());
        }
        self.rows += records.len();
        self.header = Some(header);
        self.open_line = false;

        Ok(records.len())
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf)?;
        file.flush()?;
        file.sync_all()
    }
}

fn aligned_row(record: &PlayerRecord, header: &[String]) -> Vec<String> {
    if record.columns().eq(header.iter().map(String::as_str)) {
        return record.to_row();
    }
    header
        .iter()
        .map(|column| record.get(column).map(cell_text).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::config::PLAYER_BASE_STATS;
    use crate::record::RecordBuilder;

    fn stats_payload(name: &str, id: u64) -> Value {
        let mut map = serde_json::Map::new();
        for key in PLAYER_BASE_STATS {
            map.insert(key.to_string(), json!(0));
        }
        map.insert("userName".into(), json!(name));
        map.insert("id".into(), json!(id));
        map.insert("weapons".into(), json!([]));
        map.insert("vehicles".into(), json!([]));
        Value::Object(map)
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "bf4_player_db_dataset_{}_{}.csv",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn missing_file_is_an_empty_dataset() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        let dataset = Dataset::open(&path).unwrap();
        assert!(!dataset.exists());
        assert!(dataset.is_empty());
        assert!(!dataset.knows_name("Alice"));
    }

    #[test]
    fn existing_keys_are_loaded() {
        let path = temp_path("keys");
        fs::write(&path, "rank,userName,id\n10,Alice,1\n20,\"Bob, Jr\",2\n").unwrap();

        let dataset = Dataset::open(&path).unwrap();
        assert!(dataset.exists());
        assert_eq!(dataset.len(), 2);
        assert!(dataset.knows_name("Bob, Jr"));
        assert!(dataset.knows_id("1"));
        assert!(!dataset.knows_id("3"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn header_without_key_columns_is_rejected() {
        let path = temp_path("nokeys");
        fs::write(&path, "name,score\nAlice,1\n").unwrap();

        let err = Dataset::open(&path).unwrap_err();
        assert!(matches!(err, ScrapeError::Persistence { .. }));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unterminated_last_line_is_closed_before_appending() {
        let path = temp_path("unterminated");
        fs::write(&path, "userName,id\nOldName,7").unwrap();
        let record = RecordBuilder::default()
            .build_record("Carol", &stats_payload("Carol", 8))
            .unwrap();

        let mut dataset = Dataset::open(&path).unwrap();
        dataset.append(&[record]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "userName,id\nOldName,7\nCarol,8\n");

        let reopened = Dataset::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.knows_id("7") && reopened.knows_id("8"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn crlf_terminated_file_gets_no_extra_line() {
        let path = temp_path("crlf");
        fs::write(&path, "userName,id\r\nOldName,7\r\n").unwrap();
        let record = RecordBuilder::default()
            .build_record("Carol", &stats_payload("Carol", 8))
            .unwrap();

        let mut dataset = Dataset::open(&path).unwrap();
        dataset.append(&[record]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "userName,id\r\nOldName,7\r\nCarol,8\n");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn appending_nothing_touches_nothing() {
        let path = temp_path("nothing");
        let _ = fs::remove_file(&path);

        let mut dataset = Dataset::open(&path).unwrap();
        assert_eq!(dataset.append(&[]).unwrap(), 0);
        assert!(!path.exists());
    }
}
