use std::{
    fs,
    io::{BufWriter, Write},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::jurisdiction::{
    error::{JurisdictionError, internal_error, io_error, serialization_error},
    types::JurisdictionTable,
};

const TABLE_VERSION: u64 = 1;

#[derive(Debug, Clone)]
pub struct TablePersistence {
    path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedTable {
    version: u64,
    jurisdictions: JurisdictionTable,
}

impl TablePersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Missing file means no table has been computed yet, not an error.
    pub fn load(&self) -> Result<Option<JurisdictionTable>, JurisdictionError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(io_error(format!(
                    "failed to read jurisdiction table '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedTable = serde_json::from_str(&content).map_err(|err| {
            serialization_error(format!(
                "failed to parse jurisdiction table '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != TABLE_VERSION {
            return Err(internal_error(format!(
                "unsupported jurisdiction table version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(Some(parsed.jurisdictions))
    }

    pub fn save(&self, table: &JurisdictionTable) -> Result<(), JurisdictionError> {
        let parent = self.path.parent().ok_or_else(|| {
            internal_error(format!(
                "jurisdiction table path '{}' has no parent",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            io_error(format!(
                "failed to create jurisdiction table directory '{}': {err}",
                parent.display()
            ))
        })?;

        let persisted = PersistedTable {
            version: TABLE_VERSION,
            jurisdictions: table.clone(),
        };

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            io_error(format!(
                "failed to create jurisdiction temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &persisted).map_err(|err| {
                serialization_error(format!(
                    "failed to serialize jurisdiction table '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").map_err(|err| {
                io_error(format!(
                    "failed to finalize jurisdiction table '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.flush().map_err(|err| {
                io_error(format!(
                    "failed to flush jurisdiction table '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }

        let tmp_file = fs::OpenOptions::new()
            .read(true)
            .open(&tmp_path)
            .map_err(|err| {
                io_error(format!(
                    "failed to reopen jurisdiction temp file '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        tmp_file.sync_all().map_err(|err| {
            io_error(format!(
                "failed to sync jurisdiction temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            io_error(format!(
                "failed to replace jurisdiction table '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        Ok(())
    }
}
