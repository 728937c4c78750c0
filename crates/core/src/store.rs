//! JSON backing file for the registry.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    error::{RegistryError, Result},
    models::VehicleRecord,
};

/// Default backing file name, relative to the working directory.
pub const DEFAULT_DATA_FILE: &str = "carros.json";

/// Read the record list at `path`, returning `None` if the file does not exist.
pub fn read_records(path: impl AsRef<Path>) -> Result<Option<Vec<VehicleRecord>>> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(RegistryError::io(path, err)),
    };

    // a `null` document is an empty list
    let records = serde_json::from_str::<Option<Vec<VehicleRecord>>>(&contents)
        .map_err(|err| RegistryError::format(path, err.to_string()))?
        .unwrap_or_default();
    debug!(path = %path.display(), bytes = contents.len(), records = records.len(), "records read");
    Ok(Some(records))
}

/// Replace the file at `path` with the pretty-printed record list.
///
/// The content is written to a temporary file in the same directory and then
/// renamed over the target, so readers never observe a half-written file.
pub fn write_records(path: impl AsRef<Path>, records: &[VehicleRecord]) -> Result<()> {
    let path = path.as_ref();
    let parent = parent_dir(path);
    fs::create_dir_all(&parent).map_err(|err| RegistryError::io(&parent, err))?;

    let serialised = serde_json::to_vec_pretty(records)
        .map_err(|err| RegistryError::format(path, err.to_string()))?;

    let mut file = NamedTempFile::new_in(&parent).map_err(|err| RegistryError::io(&parent, err))?;
    file.write_all(&serialised)
        .map_err(|err| RegistryError::io(file.path(), err))?;
    file.persist(path)
        .map_err(|err| RegistryError::io(path, err.error))?;

    debug!(path = %path.display(), bytes = serialised.len(), records = records.len(), "records written");
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(id: &str) -> VehicleRecord {
        VehicleRecord {
            id: id.to_string(),
            make: "Honda".to_string(),
            model: "Civic".to_string(),
            year: 2018,
            color: "Red".to_string(),
            price: 70_000.0,
            origin_country: "Japan".to_string(),
            registered_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    #[test]
    fn missing_file_reads_as_none() -> Result<()> {
        let dir = tempdir()?;
        assert!(read_records(dir.path().join("absent.json"))?.is_none());
        Ok(())
    }

    #[test]
    fn null_document_reads_as_empty_list() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cars.json");
        fs::write(&path, "null")?;
        assert_eq!(read_records(&path)?, Some(Vec::new()));
        Ok(())
    }

    #[test]
    fn writes_pretty_json_with_stable_keys() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("cars.json");
        write_records(&path, &[record("car_1"), record("car_2")])?;

        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("[\n  {\n    \"id\": \"car_1\",\n    \"make\": \"Honda\""));
        assert!(text.contains("\"registered_on\": \"2024-01-15\""));
        let id_pos = text.find("\"id\"").unwrap();
        let origin_pos = text.find("\"origin_country\"").unwrap();
        assert!(id_pos < origin_pos);

        let records = read_records(&path)?.expect("file should exist");
        assert_eq!(records, vec![record("car_1"), record("car_2")]);
        Ok(())
    }

    #[test]
    fn overwrite_replaces_previous_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cars.json");
        write_records(&path, &[record("car_1"), record("car_2")])?;
        write_records(&path, &[])?;
        assert_eq!(read_records(&path)?, Some(Vec::new()));
        Ok(())
    }

    #[test]
    fn malformed_content_is_a_format_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cars.json");
        fs::write(&path, "{ not json")?;
        let err = read_records(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Format { .. }));
        Ok(())
    }
}
