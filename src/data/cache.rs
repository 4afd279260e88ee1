use super::loader::{resolve_price_path, DataLoader};
use super::Result;
use crate::types::{Instrument, InstrumentKind, PriceSeries};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Loads price files on first request and keeps them for the rest of the process.
///
/// Entries are keyed by `(symbol, kind)` and never invalidated: the dataset is static.
#[derive(Debug)]
pub struct DataSource {
    root: PathBuf,
    cache: HashMap<(String, InstrumentKind), PriceSeries>,
}

impl DataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn load(&mut self, instrument: &Instrument) -> Result<&PriceSeries> {
        let key = (instrument.symbol.clone(), instrument.kind);
        if self.cache.contains_key(&key) {
            debug!("Cache hit for {} ({})", instrument.symbol, instrument.kind);
        } else {
            let path = resolve_price_path(&self.root, instrument);
            let series = DataLoader::load_price_series(&path)?;
            self.cache.insert(key.clone(), series);
        }
        Ok(&self.cache[&key])
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
