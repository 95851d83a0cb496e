use std::sync::Arc;

use super::{CalibrationStrategy, ConstantStepper, DynamicStepper, Linear, StrategyKind};
use crate::config::CalibrationConfig;
use crate::storage::KeyValueStore;

/// Name/description pair for strategy selection lists
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StrategyInfo {
    pub kind: StrategyKind,
    pub name: String,
    pub description: String,
}

impl StrategyKind {
    /// Create a fresh strategy instance
    ///
    /// # Arguments
    /// * `store` - Persistence port shared by all baseline-aware strategies
    /// * `config` - Threshold, dead zone, and step parameters
    pub fn create(
        self,
        store: Arc<dyn KeyValueStore>,
        config: &CalibrationConfig,
    ) -> Box<dyn CalibrationStrategy> {
        match self {
            StrategyKind::DynamicStepper => Box::new(DynamicStepper::new(store, config)),
            StrategyKind::ConstantStepper => Box::new(ConstantStepper::new(store, config)),
            StrategyKind::Linear => Box::new(Linear::new()),
        }
    }

    /// Catalog of every built-in strategy
    pub fn catalog() -> Vec<StrategyInfo> {
        StrategyKind::ALL
            .into_iter()
            .map(|kind| StrategyInfo {
                kind,
                name: kind.display_name().to_string(),
                description: kind.description().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_create_matches_kind() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let config = CalibrationConfig::default();

        for kind in StrategyKind::ALL {
            let strategy = kind.create(store.clone(), &config);
            assert_eq!(strategy.name(), kind.display_name());
            assert_eq!(strategy.description(), kind.description());
        }
    }

    #[test]
    fn test_catalog_lists_all() {
        let catalog = StrategyKind::catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].kind, StrategyKind::DynamicStepper);
        assert_eq!(catalog[0].name, "Dynamic stepper");
    }
}
