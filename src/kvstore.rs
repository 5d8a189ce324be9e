/*
 *  kvstore.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Tiny persisted key-value store, one text file per key
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

impl From<PersistError> for KvError {
    // the temp file inside the error is dropped, and removed, here
    fn from(e: PersistError) -> Self {
        KvError::Io(e.error)
    }
}

#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl KvStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, KvError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        if !valid_key(key) {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes through a temp file in the same directory and persists it over
    /// the key, so readers never see half a value.
    pub fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), KvError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path().join("cache")).unwrap();
        assert_eq!(kv.get("background_2025-03-31").unwrap(), None);

        kv.set("background_2025-03-31", r#"{"imageUrl":"a"}"#).unwrap();
        assert_eq!(kv.get("background_2025-03-31").unwrap().as_deref(), Some(r#"{"imageUrl":"a"}"#));

        kv.set("background_2025-03-31", r#"{"imageUrl":"b"}"#).unwrap();
        assert_eq!(kv.get("background_2025-03-31").unwrap().as_deref(), Some(r#"{"imageUrl":"b"}"#));
        assert!(dir.path().join("cache/background_2025-03-31.json").exists());

        kv.remove("background_2025-03-31").unwrap();
        kv.remove("background_2025-03-31").unwrap();
        assert_eq!(kv.get("background_2025-03-31").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        for key in ["", "../etc", "a/b", "a.b", "name with space"] {
            assert!(matches!(kv.set(key, "x"), Err(KvError::InvalidKey(_))), "{:?}", key);
        }
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        // a directory where the value file should go makes the final rename fail
        fs::create_dir(dir.path().join("k.json")).unwrap();

        assert!(matches!(kv.set("k", "v"), Err(KvError::Io(_))));
        assert_eq!(entries(dir.path()), ["k.json"]);
    }

    #[test]
    fn test_overwrite_leaves_only_value_files() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        kv.set("a", "1").unwrap();
        kv.set("a", "2").unwrap();
        kv.set("b", "3").unwrap();
        assert_eq!(entries(dir.path()), ["a.json", "b.json"]);
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        KvStore::open(dir.path()).unwrap().set("k", "v").unwrap();
        let again = KvStore::open(dir.path()).unwrap();
        assert_eq!(again.get("k").unwrap().as_deref(), Some("v"));
    }
}
