//! On-disk key containers for [`super::SoftCsp`]
//!
//! One file per container, named after the hex of the UTF-8 container name.
//! Record layout (little-endian):
//!
//! ```text
//! magic "SWCK" | entry count u32 | { key spec u32 | blob length u32 | PRIVATEKEYBLOB }*
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};
use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use super::{KeySpec, ProviderCode, ProviderResult};

const CONTAINER_MAGIC: &[u8; 4] = b"SWCK";
const CONTAINER_EXTENSION: &str = "ctr";
const MAX_ENTRIES: u32 = 2;

/// Directory of persisted key containers
#[derive(Debug, Clone)]
pub(crate) struct ContainerStore {
    root: PathBuf,
}

impl ContainerStore {
    pub(crate) fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", hex::encode(name.as_bytes()), CONTAINER_EXTENSION))
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Create an empty container; fails with `EXISTS` if one is present
    pub(crate) fn create(&self, name: &str) -> ProviderResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| ProviderCode::from_io(&e))?;

        let path = self.path_for(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ProviderCode::EXISTS);
            }
            Err(e) => return Err(ProviderCode::from_io(&e)),
        };
        file.write_all(&encode_entries(&[]))
            .map_err(|e| ProviderCode::from_io(&e))?;

        debug!("Created key container {:?} at {}", name, path.display());
        Ok(())
    }

    /// Remove a container; fails with `BAD_KEYSET` if it is missing
    pub(crate) fn delete(&self, name: &str) -> ProviderResult<()> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted key container {:?}", name);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ProviderCode::BAD_KEYSET),
            Err(e) => Err(ProviderCode::from_io(&e)),
        }
    }

    /// Load the key blobs stored in a container
    pub(crate) fn load(&self, name: &str) -> ProviderResult<Vec<(KeySpec, Vec<u8>)>> {
        let path = self.path_for(name);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProviderCode::BAD_KEYSET);
            }
            Err(e) => return Err(ProviderCode::from_io(&e)),
        };
        let entries = decode_entries(&data)?;
        trace!("Loaded {} key(s) from container {:?}", entries.len(), name);
        Ok(entries)
    }

    /// Replace the key blobs stored in a container
    pub(crate) fn store(&self, name: &str, entries: &[(KeySpec, Vec<u8>)]) -> ProviderResult<()> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(ProviderCode::BAD_KEYSET);
        }
        fs::write(&path, encode_entries(entries)).map_err(|e| ProviderCode::from_io(&e))?;
        trace!("Stored {} key(s) in container {:?}", entries.len(), name);
        Ok(())
    }
}

fn encode_entries(entries: &[(KeySpec, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        8 + entries
            .iter()
            .map(|(_, blob)| 8 + blob.len())
            .sum::<usize>(),
    );
    out.extend_from_slice(CONTAINER_MAGIC);
    // Writes into a Vec cannot fail
    let _ = out.write_u32::<LittleEndian>(entries.len() as u32);
    for (spec, blob) in entries {
        let _ = out.write_u32::<LittleEndian>(spec.value());
        let _ = out.write_u32::<LittleEndian>(blob.len() as u32);
        out.extend_from_slice(blob);
    }
    out
}

fn decode_entries(data: &[u8]) -> ProviderResult<Vec<(KeySpec, Vec<u8>)>> {
    let mut cursor = Cursor::new(data);

    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| ProviderCode::BAD_KEYSET_PARAM)?;
    if &magic != CONTAINER_MAGIC {
        return Err(ProviderCode::BAD_KEYSET_PARAM);
    }

    let count = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| ProviderCode::BAD_KEYSET_PARAM)?;
    if count > MAX_ENTRIES {
        return Err(ProviderCode::BAD_KEYSET_PARAM);
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let spec = cursor
            .read_u32::<LittleEndian>()
            .ok()
            .and_then(KeySpec::from_value)
            .ok_or(ProviderCode::BAD_KEYSET_PARAM)?;
        let len = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| ProviderCode::BAD_KEYSET_PARAM)? as usize;

        let remaining = data.len() - cursor.position() as usize;
        if len > remaining {
            return Err(ProviderCode::BAD_KEYSET_PARAM);
        }
        let mut blob = vec![0u8; len];
        cursor
            .read_exact(&mut blob)
            .map_err(|_| ProviderCode::BAD_KEYSET_PARAM)?;
        entries.push((spec, blob));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_container_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = ContainerStore::new(dir.path());

        assert!(!store.exists("box"));
        assert_eq!(store.delete("box"), Err(ProviderCode::BAD_KEYSET));
        assert_eq!(store.load("box"), Err(ProviderCode::BAD_KEYSET));

        store.create("box").unwrap();
        assert!(store.exists("box"));
        assert_eq!(store.create("box"), Err(ProviderCode::EXISTS));
        assert!(store.load("box").unwrap().is_empty());

        let entries = vec![(KeySpec::Signature, vec![1, 2, 3])];
        store.store("box", &entries).unwrap();
        assert_eq!(store.load("box").unwrap(), entries);

        store.delete("box").unwrap();
        assert!(!store.exists("box"));
        assert_eq!(store.store("box", &entries), Err(ProviderCode::BAD_KEYSET));
    }

    #[test]
    fn test_file_name_is_hex_of_container_name() {
        let dir = TempDir::new().unwrap();
        let store = ContainerStore::new(dir.path());
        store.create("ab").unwrap();
        assert!(dir.path().join("6162.ctr").is_file());
    }

    #[test]
    fn test_corrupt_container_rejected() {
        assert_eq!(decode_entries(b"XXXX"), Err(ProviderCode::BAD_KEYSET_PARAM));

        let mut data = encode_entries(&[(KeySpec::KeyExchange, vec![9; 16])]);
        data.truncate(data.len() - 1);
        assert_eq!(decode_entries(&data), Err(ProviderCode::BAD_KEYSET_PARAM));

        let mut data = encode_entries(&[(KeySpec::KeyExchange, vec![9; 16])]);
        data[8] = 7;
        assert_eq!(decode_entries(&data), Err(ProviderCode::BAD_KEYSET_PARAM));
    }
}
