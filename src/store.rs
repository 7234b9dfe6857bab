// On-chain action runtime for the Stories mobile app
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Stories app developers
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::{fs, io};

use amplify::IoError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes kept verbatim in file names. The dot is always escaped, so no key file can end in
/// `.tmp` and clash with a pending write.
const FILE_NAME_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');
/// File name of the empty key; escapes always carry two hex digits after `%`.
const EMPTY_KEY_FILE: &str = "%";

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum StoreError {
    /// local storage is unavailable: {0}
    #[from]
    #[from(io::Error)]
    Unavailable(IoError),

    /// local storage lock is poisoned by a panicked writer.
    Poisoned,
}

/// Device-local string key-value storage. Absence of a key is not an error.
pub trait KeyValueStore: Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> { (**self).get(key) }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> { (**self).set(key, value) }
}

/// Volatile store, used in tests and as a fallback when no storage directory is available.
#[derive(Debug, Default)]
pub struct MemStore(RwLock<HashMap<String, String>>);

impl MemStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.0.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.0.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Directory-backed store keeping each key in its own file.
#[derive(Clone, Debug)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Distinct keys always map to distinct files.
    fn path(&self, key: &str) -> PathBuf {
        if key.is_empty() {
            return self.dir.join(EMPTY_KEY_FILE);
        }
        self.dir.join(utf8_percent_encode(key, FILE_NAME_ENCODE).to_string())
    }
}

impl KeyValueStore for FsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        // a crash in the middle of a write must leave the previous value readable
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        trace!("stored {} bytes under `{key}`", value.len());
        Ok(())
    }
}
