// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-communicator view consumed by the dispatcher.

use std::fmt;
use std::sync::Arc;

use derive_builder::Builder;
use dynamo_coll_config::CollConfig;
use dynamo_coll_tree::{Tree, TreeError};
use validator::Validate;

use crate::select::{CollSelector, RuleSelector};
use crate::types::{CommKind, Rank};

/// Error type for CommunicatorBuilder.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommunicatorBuilderError {
    #[error("Uninitialized field: {0}")]
    UninitializedField(&'static str),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<derive_builder::UninitializedFieldError> for CommunicatorBuilderError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        Self::UninitializedField(e.field_name())
    }
}

impl From<String> for CommunicatorBuilderError {
    fn from(s: String) -> Self {
        Self::ValidationError(s)
    }
}

/// This rank's view of a communicator.
///
/// Everything here is agreed on by all members (size, kind, configuration,
/// selector), so any decision derived from it is identical on every rank.
///
/// ```ignore
/// let comm = Communicator::builder()
///     .rank(3)
///     .size(8)
///     .config(Arc::new(CollConfig::from_env()?))
///     .build()?;
/// ```
#[derive(Builder, Clone)]
#[builder(
    pattern = "owned",
    build_fn(private, name = "build_inner", error = "CommunicatorBuilderError")
)]
pub struct Communicator {
    /// This process's rank in the local group.
    rank: Rank,

    /// Size of the local group.
    size: usize,

    #[builder(default)]
    kind: CommKind,

    /// Whether node-local topology is known, enabling SMP-aware algorithms.
    #[builder(default)]
    node_aware: bool,

    #[builder(default)]
    config: Arc<CollConfig>,

    /// Automatic-mode selector. If not set, a [`RuleSelector`] is precomputed
    /// from this communicator's shape and configuration.
    #[builder(setter(strip_option), default)]
    selector: Option<Arc<dyn CollSelector>>,
}

impl CommunicatorBuilder {
    pub fn build(self) -> Result<Communicator, CommunicatorBuilderError> {
        let mut comm = self.build_inner()?;

        if comm.size == 0 {
            return Err("communicator size must be at least 1".to_string().into());
        }
        if comm.rank >= comm.size {
            return Err(format!("rank {} out of range for size {}", comm.rank, comm.size).into());
        }
        if let CommKind::Inter { remote_size: 0 } = comm.kind {
            return Err("inter-communicator remote group must not be empty"
                .to_string()
                .into());
        }
        comm.config
            .validate()
            .map_err(|e| format!("invalid collective configuration: {e}"))?;

        if comm.selector.is_none() {
            comm.selector = Some(Arc::new(RuleSelector::new(&comm)));
        }

        Ok(comm)
    }
}

impl Communicator {
    pub fn builder() -> CommunicatorBuilder {
        CommunicatorBuilder::default()
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn kind(&self) -> CommKind {
        self.kind
    }

    pub fn is_node_aware(&self) -> bool {
        self.node_aware
    }

    pub fn config(&self) -> &CollConfig {
        &self.config
    }

    pub fn selector(&self) -> Option<&dyn CollSelector> {
        self.selector.as_deref()
    }

    /// Largest power of two not exceeding the group size.
    pub fn pof2(&self) -> usize {
        1 << self.size.ilog2()
    }

    /// The configured tree topology rooted at `root`, as seen from this rank.
    pub fn tree(&self, root: Rank) -> Result<Tree, TreeError> {
        let tree = &self.config.tree;
        dynamo_coll_tree::build(tree.tree_type, self.rank, self.size, tree.k, root)
    }
}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("node_aware", &self.node_aware)
            .field("config", &self.config)
            .field("has_selector", &self.selector.is_some())
            .finish()
    }
}
