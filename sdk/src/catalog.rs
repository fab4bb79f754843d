//! In-memory catalog of known pools.
//!
//! The pool list is shared read-mostly between concurrent swaps. Loads
//! replace the whole list behind an `Arc`; readers keep whatever snapshot
//! they took and are never affected by a later load.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::RwLock;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::{
    discovery::{PoolLocation, PoolLocator},
    error::ResolutionError,
    pool_keys::PoolKeys,
};

/// The two shapes a pool-list file may take.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PoolListDocument {
    List(Vec<PoolKeys>),
    /// At least one of the two lists must be present.
    Split {
        official:    Option<Vec<PoolKeys>>,
        #[serde(rename = "unOfficial")]
        un_official: Option<Vec<PoolKeys>>,
    },
}

impl PoolListDocument {
    fn into_pools(self) -> Result<Vec<PoolKeys>, ResolutionError> {
        match self {
            Self::List(pools) => Ok(pools),
            Self::Split { official: None, un_official: None } => Err(ResolutionError::Catalog(
                "document has neither an `official` nor an `unOfficial` list".into(),
            )),
            Self::Split { official, un_official } => {
                let mut pools = official.unwrap_or_default();
                pools.extend(un_official.unwrap_or_default());
                Ok(pools)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct PoolCatalog {
    pools: RwLock<Arc<Vec<PoolKeys>>>,
}

impl PoolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pools(pools: Vec<PoolKeys>) -> Self {
        let catalog = Self::new();
        catalog.load_pools(pools);
        catalog
    }

    /// Replace the catalog wholesale. Last write wins.
    ///
    /// Records failing [`PoolKeys::validate`] are skipped. Returns the number
    /// of pools kept.
    pub fn load_pools(&self, pools: Vec<PoolKeys>) -> usize {
        let total = pools.len();
        let kept: Vec<PoolKeys> = pools
            .into_iter()
            .filter(|p| match p.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("dropping pool {}: {e}", p.id);
                    false
                }
            })
            .collect();
        let count = kept.len();
        *self.pools.write() = Arc::new(kept);
        info!("loaded {count} of {total} pools into catalog");
        count
    }

    /// Parse a pool-list JSON document and load it.
    ///
    /// A document that is not a pool list leaves the catalog untouched.
    pub fn load_json(&self, json: &str) -> Result<usize, ResolutionError> {
        let doc: PoolListDocument =
            serde_json::from_str(json).map_err(|e| ResolutionError::Catalog(e.to_string()))?;
        Ok(self.load_pools(doc.into_pools()?))
    }

    pub fn load_json_file(&self, path: impl AsRef<Path>) -> Result<usize, ResolutionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ResolutionError::Catalog(format!("{}: {e}", path.display())))?;
        self.load_json(&json)
    }

    /// The current pool list. Unaffected by later loads.
    pub fn snapshot(&self) -> Arc<Vec<PoolKeys>> {
        self.pools.read().clone()
    }

    /// First pool trading `{a, b}` in either order. Exact address match only.
    pub fn find_pool(&self, a: &Pubkey, b: &Pubkey) -> Option<PoolKeys> {
        self.snapshot()
            .iter()
            .find(|p| p.matches_pair(a, b))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PoolLocator for PoolCatalog {
    async fn locate(&self, mint_a: &Pubkey, mint_b: &Pubkey) -> Result<PoolLocation, ResolutionError> {
        self.find_pool(mint_a, mint_b)
            .map(PoolLocation::Keys)
            .ok_or(ResolutionError::PoolNotFound(*mint_a, *mint_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool_keys::fixtures;
    use solana_sdk::pubkey;

    const SOL:  Pubkey = pubkey!("So11111111111111111111111111111111111111112");
    const USDC: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
    const DAI:  Pubkey = Pubkey::new_from_array([7; 32]);

    #[test]
    fn finds_pool_in_either_order() {
        let pool = fixtures::pool_keys(SOL, USDC);
        let catalog = PoolCatalog::from_pools(vec![pool.clone()]);

        assert_eq!(catalog.find_pool(&USDC, &SOL), Some(pool.clone()));
        assert_eq!(catalog.find_pool(&SOL, &USDC), Some(pool));
        assert_eq!(catalog.find_pool(&SOL, &DAI), None);
    }

    #[test]
    fn load_replaces_wholesale() {
        let catalog = PoolCatalog::from_pools(vec![fixtures::pool_keys(SOL, USDC)]);
        let before = catalog.snapshot();

        catalog.load_pools(vec![fixtures::pool_keys(SOL, DAI)]);

        assert_eq!(before.len(), 1);
        assert!(before[0].matches_pair(&SOL, &USDC));
        assert!(catalog.find_pool(&SOL, &USDC).is_none());
        assert!(catalog.find_pool(&DAI, &SOL).is_some());
    }

    #[test]
    fn invalid_records_are_dropped() {
        let catalog = PoolCatalog::new();
        let kept = catalog.load_pools(vec![fixtures::pool_keys(SOL, SOL), fixtures::pool_keys(SOL, USDC)]);
        assert_eq!(kept, 1);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn loads_both_document_shapes() {
        let a = fixtures::pool_keys(SOL, USDC);
        let b = fixtures::pool_keys(SOL, DAI);

        let list = serde_json::to_string(&vec![a.clone()]).unwrap();
        let catalog = PoolCatalog::new();
        assert_eq!(catalog.load_json(&list).unwrap(), 1);

        let split = serde_json::json!({ "official": [a], "unOfficial": [b] }).to_string();
        assert_eq!(catalog.load_json(&split).unwrap(), 2);
        assert!(catalog.find_pool(&DAI, &SOL).is_some());

        let only_unofficial = serde_json::json!({ "unOfficial": [b] }).to_string();
        assert_eq!(catalog.load_json(&only_unofficial).unwrap(), 1);
        assert!(matches!(catalog.load_json("not json"), Err(ResolutionError::Catalog(_))));
    }

    #[test]
    fn unrelated_object_does_not_clear_the_catalog() {
        let catalog = PoolCatalog::from_pools(vec![fixtures::pool_keys(SOL, USDC)]);

        assert!(matches!(catalog.load_json("{\"nope\": 1}"), Err(ResolutionError::Catalog(_))));
        assert!(matches!(catalog.load_json("{}"), Err(ResolutionError::Catalog(_))));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.find_pool(&USDC, &SOL).is_some());
    }
}
