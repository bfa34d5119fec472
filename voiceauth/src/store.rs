//! Persistence of trained models and template galleries.
//!
//! Layout in the key-value store:
//!
//! | key               | value                                |
//! |-------------------|--------------------------------------|
//! | `gmm/{identity}`  | MessagePack `{seq, model}`           |
//! | `dtw/{identity}`  | MessagePack `{seq, templates}`       |
//! | `meta/next_seq`   | MessagePack `u64`                    |
//!
//! `seq` is assigned on an identity's first save and kept on re-enrollment,
//! so reloading restores enrollment order.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use voxgate_features::FeatureSequence;
use voxgate_kv::{KVStore, MemoryStore, RedbStore};

use crate::dtw::TemplateGallery;
use crate::gmm::DiagGmm;
use crate::{AuthError, DtwEngine, GmmEngine};

const GMM_PREFIX: &str = "gmm/";
const DTW_PREFIX: &str = "dtw/";
const NEXT_SEQ_KEY: &str = "meta/next_seq";

#[derive(Serialize, Deserialize)]
struct Record<T> {
    seq: u64,
    data: T,
}

/// Model persistence over a [`KVStore`].
pub struct ModelStore {
    kv: Box<dyn KVStore>,
    write_lock: Mutex<()>,
}

impl ModelStore {
    pub fn new(kv: Box<dyn KVStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens (or creates) a redb-backed store.
    pub fn open(path: &Path) -> Result<Self, AuthError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AuthError::Store(format!("create {}: {e}", parent.display())))?;
        }
        Ok(Self::new(Box::new(RedbStore::open(path)?)))
    }

    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn save_gmm(&self, identity: &str, model: &DiagGmm) -> Result<(), AuthError> {
        self.save(GMM_PREFIX, identity, model)
    }

    pub fn save_dtw(&self, identity: &str, gallery: &TemplateGallery) -> Result<(), AuthError> {
        let templates: Vec<&FeatureSequence> = gallery.iter().map(|t| t.as_ref()).collect();
        self.save(DTW_PREFIX, identity, &templates)
    }

    /// Deletes both engines' data for `identity`. Returns true if anything
    /// was stored.
    pub fn remove(&self, identity: &str) -> Result<bool, AuthError> {
        let _guard = self.write_lock.lock();
        let gmm_key = format!("{GMM_PREFIX}{identity}");
        let dtw_key = format!("{DTW_PREFIX}{identity}");
        let existed = self.kv.get(&gmm_key)?.is_some() || self.kv.get(&dtw_key)?.is_some();
        self.kv.batch(&[], &[gmm_key.as_str(), dtw_key.as_str()])?;
        Ok(existed)
    }

    /// Stored mixture models in enrollment order.
    pub fn load_gmm(&self) -> Result<Vec<(String, DiagGmm)>, AuthError> {
        self.load(GMM_PREFIX)
    }

    /// Stored template galleries in enrollment order.
    pub fn load_dtw(&self) -> Result<Vec<(String, TemplateGallery)>, AuthError> {
        let galleries: Vec<(String, Vec<FeatureSequence>)> = self.load(DTW_PREFIX)?;
        Ok(galleries
            .into_iter()
            .map(|(name, t)| (name, t.into_iter().map(Arc::new).collect()))
            .collect())
    }

    /// Installs every stored model and gallery into the engines.
    pub fn restore(&self, gmm: &GmmEngine, dtw: &DtwEngine) -> Result<(), AuthError> {
        let models = self.load_gmm()?;
        let galleries = self.load_dtw()?;
        debug!(models = models.len(), galleries = galleries.len(), "restoring enrolled identities");
        for (name, model) in models {
            gmm.install(&name, Arc::new(model));
        }
        for (name, gallery) in galleries {
            dtw.install(&name, Arc::new(gallery));
        }
        Ok(())
    }

    fn save<T: Serialize>(&self, prefix: &str, identity: &str, data: &T) -> Result<(), AuthError> {
        let _guard = self.write_lock.lock();
        let key = format!("{prefix}{identity}");

        let (seq, next) = match self.kv.get(&key)? {
            Some(bytes) => (decode::<Record<serde::de::IgnoredAny>>(&bytes)?.seq, None),
            None => {
                let seq = self.next_seq()?;
                (seq, Some(seq + 1))
            }
        };

        let record = encode(&Record { seq, data })?;
        match next {
            Some(next) => {
                let next = encode(&next)?;
                self.kv.batch(
                    &[(key.as_str(), record.as_slice()), (NEXT_SEQ_KEY, next.as_slice())],
                    &[],
                )?;
            }
            None => self.kv.set(&key, &record)?,
        }
        debug!(key = %key, seq, bytes = record.len(), "saved");
        Ok(())
    }

    fn next_seq(&self) -> Result<u64, AuthError> {
        match self.kv.get(NEXT_SEQ_KEY)? {
            Some(bytes) => decode(&bytes),
            None => Ok(0),
        }
    }

    fn load<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<(String, T)>, AuthError> {
        let mut records: Vec<(u64, String, T)> = Vec::new();
        for (key, bytes) in self.kv.scan(prefix)? {
            let record: Record<T> = decode(&bytes)?;
            let name = key[prefix.len()..].to_string();
            records.push((record.seq, name, record.data));
        }
        records.sort_by_key(|(seq, _, _)| *seq);
        Ok(records.into_iter().map(|(_, n, d)| (n, d)).collect())
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, AuthError> {
    rmp_serde::to_vec_named(value).map_err(|e| AuthError::Store(format!("encode: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AuthError> {
    rmp_serde::from_slice(bytes).map_err(|e| AuthError::Store(format!("decode: {e}")))
}
