// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Collective Configuration Library
//!
//! Resolves the tunables that steer collective algorithm selection into typed
//! enumerations before they reach the dispatcher. A [`CollConfig`] value is
//! owned by each communicator, so independently configured communicators never
//! share mutable state.

mod allreduce;
mod device;
mod reduce_scatter;
mod selection;
mod tree;

pub use allreduce::{AllreduceConfig, AllreduceInterAlgorithm, AllreduceIntraAlgorithm};
pub use device::{DeviceCollectivesMode, DeviceConfig};
pub use reduce_scatter::{
    ReduceScatterConfig, ReduceScatterInterAlgorithm, ReduceScatterIntraAlgorithm,
};
pub use selection::{FallbackMode, SelectionConfig};
pub use tree::TreeConfig;

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Json, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to extract configuration: {0}")]
    Extraction(#[from] Box<figment::Error>),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Configuration error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Top-level collective configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CollConfig {
    /// All-reduce algorithm choices.
    #[serde(default)]
    pub allreduce: AllreduceConfig,

    /// Reduce-scatter algorithm choices.
    #[serde(default)]
    pub reduce_scatter: ReduceScatterConfig,

    /// Device-layer collective override.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Automatic policy thresholds and manual fallback behavior.
    #[validate(nested)]
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Tree shape used by tree-based algorithms.
    #[validate(nested)]
    #[serde(default)]
    pub tree: TreeConfig,
}

impl CollConfig {
    /// Create a Figment configuration with all sources merged.
    ///
    /// Configuration sources in priority order (lowest to highest):
    /// 1. Code defaults
    /// 2. System config file at /opt/dynamo/etc/coll.toml
    /// 3. TOML file from DYN_COLL_CONFIG_PATH environment variable
    /// 4. Environment variables (DYN_COLL_* prefixed)
    pub fn figment() -> Figment {
        let config_path = std::env::var("DYN_COLL_CONFIG_PATH").unwrap_or_default();

        Figment::new()
            .merge(Serialized::defaults(CollConfig::default()))
            .merge(Toml::file("/opt/dynamo/etc/coll.toml"))
            .merge(Toml::file(&config_path))
            // DYN_COLL_ALLREDUCE_INTRA_ALGORITHM, DYN_COLL_ALLREDUCE_DEVICE_COLLECTIVE, ...
            .merge(
                Env::prefixed("DYN_COLL_ALLREDUCE_")
                    .map(|k| format!("allreduce.{}", k.as_str().to_lowercase()).into()),
            )
            // DYN_COLL_REDUCE_SCATTER_INTRA_ALGORITHM, ...
            .merge(
                Env::prefixed("DYN_COLL_REDUCE_SCATTER_")
                    .map(|k| format!("reduce_scatter.{}", k.as_str().to_lowercase()).into()),
            )
            // DYN_COLL_DEVICE_COLLECTIVES
            .merge(
                Env::prefixed("DYN_COLL_DEVICE_")
                    .map(|k| format!("device.{}", k.as_str().to_lowercase()).into()),
            )
            // DYN_COLL_SELECTION_FALLBACK, DYN_COLL_SELECTION_ALLREDUCE_SHORT_MSG_SIZE, ...
            .merge(
                Env::prefixed("DYN_COLL_SELECTION_")
                    .map(|k| format!("selection.{}", k.as_str().to_lowercase()).into()),
            )
            // DYN_COLL_TREE_TREE_TYPE, DYN_COLL_TREE_K
            .merge(
                Env::prefixed("DYN_COLL_TREE_")
                    .map(|k| format!("tree.{}", k.as_str().to_lowercase()).into()),
            )
    }

    /// Load configuration from default figment (env and files).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment())
    }

    /// Extract configuration from any provider.
    ///
    /// # Example
    /// ```rust,ignore
    /// let config = CollConfig::extract_from(
    ///     CollConfig::figment().merge(("allreduce.intra_algorithm", "recursive_doubling"))
    /// )?;
    /// ```
    pub fn extract_from<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(provider)
            .extract()
            .map_err(|e| ConfigError::Extraction(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build a figment from defaults, then merge a custom provider.
    pub fn figment_with<T: Provider>(extra: T) -> Figment {
        Self::figment().merge(extra)
    }

    /// Load configuration merging JSON overrides with the highest priority.
    pub fn from_figment_with_json(json: &str) -> Result<Self, ConfigError> {
        Self::extract_from(Self::figment().merge(Json::string(json)))
    }
}

/// Allows a `CollConfig` to seed another figment, e.g. to derive a
/// communicator's configuration from its parent's with a few overrides.
impl Provider for CollConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("CollConfig")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
