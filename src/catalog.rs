//! Persisted name lists
//!
//! The database keeps the names of its namespaces, and each namespace the
//! names of its user buckets, under fixed metadata keys.

use serde::{Deserialize, Serialize};

use crate::engine::{Snapshot, Tx};
use crate::error::{ArchiveError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct NameList {
    names: Vec<Vec<u8>>,
}

impl NameList {
    fn decode(raw: Option<Vec<u8>>) -> Result<Self> {
        match raw {
            None => Ok(Self::default()),
            Some(raw) => bincode::deserialize(&raw)
                .map_err(|e| ArchiveError::Decode(format!("failed to decode name list: {}", e))),
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            ArchiveError::InvalidArgument(format!("failed to encode name list: {}", e))
        })
    }
}

/// Names stored at `key`, in the order they were first persisted
pub(crate) fn read_names(snapshot: &Snapshot, key: &[u8]) -> Result<Vec<Vec<u8>>> {
    Ok(NameList::decode(snapshot.get(key)?)?.names)
}

/// Add `name` to the list at `key`; returns false if it was already there
pub(crate) fn add_name(tx: &mut Tx<'_>, key: &[u8], name: &[u8]) -> Result<bool> {
    let mut list = NameList::decode(tx.get(key)?)?;
    if list.names.iter().any(|n| n.as_slice() == name) {
        return Ok(false);
    }
    list.names.push(name.to_vec());
    tx.set(key, &list.encode()?)?;
    Ok(true)
}
