// src/storage.rs
//! Hashrate persistence. Samples are upserted by (pool, bucket, kind);
//! saving the same key twice leaves one row holding the latest value.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::hashrate::{HashrateSample, SampleKey};

#[async_trait::async_trait]
pub trait HashrateStore: Send + Sync {
    async fn save_hashrate(&self, sample: &HashrateSample) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryHashrateStore {
    rows: Mutex<BTreeMap<SampleKey, HashrateSample>>,
    save_calls: AtomicUsize,
}

impl InMemoryHashrateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<SampleKey, HashrateSample>> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn get(&self, key: &SampleKey) -> Option<HashrateSample> {
        self.rows().get(key).cloned()
    }

    /// All rows in key order.
    pub fn samples(&self) -> Vec<HashrateSample> {
        self.rows().values().cloned().collect()
    }

    pub fn samples_for_pool(&self, pool_id: u32) -> Vec<HashrateSample> {
        self.rows()
            .values()
            .filter(|s| s.pool_id == pool_id)
            .cloned()
            .collect()
    }

    /// Number of `save_hashrate` calls, including overwrites.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl HashrateStore for InMemoryHashrateStore {
    async fn save_hashrate(&self, sample: &HashrateSample) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.rows().insert(sample.key(), sample.clone());
        Ok(())
    }
}

/// Durable store backed by one JSON file holding every row. The file is
/// rewritten on each save through a temp file + rename.
#[derive(Debug)]
pub struct JsonFileHashrateStore {
    path: PathBuf,
    rows: tokio::sync::Mutex<BTreeMap<SampleKey, HashrateSample>>,
}

impl JsonFileHashrateStore {
    /// Opens `path`, loading existing rows. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = match tokio::fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => {
                let list: Vec<HashrateSample> = serde_json::from_str(&s)
                    .with_context(|| format!("parsing hashrate store {}", path.display()))?;
                list.into_iter().map(|r| (r.key(), r)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("reading hashrate store {}", path.display()))
            }
        };
        Ok(Self {
            path,
            rows: tokio::sync::Mutex::new(rows),
        })
    }

    pub async fn samples(&self) -> Vec<HashrateSample> {
        self.rows.lock().await.values().cloned().collect()
    }

    async fn flush(&self, rows: &BTreeMap<SampleKey, HashrateSample>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let list: Vec<&HashrateSample> = rows.values().collect();
        let data = serde_json::to_vec_pretty(&list).context("serializing hashrate rows")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl HashrateStore for JsonFileHashrateStore {
    async fn save_hashrate(&self, sample: &HashrateSample) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let prev = rows.insert(sample.key(), sample.clone());
        if let Err(e) = self.flush(&rows).await {
            // keep memory consistent with what is on disk
            match prev {
                Some(p) => rows.insert(p.key(), p),
                None => rows.remove(&sample.key()),
            };
            return Err(e);
        }
        Ok(())
    }
}
