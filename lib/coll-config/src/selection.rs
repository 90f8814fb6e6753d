// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Thresholds for the default automatic policy and the handling of manual
/// choices that cannot run on a given call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SelectionConfig {
    /// What to do when a manually selected algorithm is ineligible.
    #[serde(default)]
    pub fallback: FallbackMode,

    /// All-reduce messages up to this many bytes use recursive doubling.
    #[serde(default = "default_allreduce_short_msg_size")]
    pub allreduce_short_msg_size: usize,

    /// Commutative reduce-scatter messages of at least this many bytes use
    /// pairwise exchange instead of recursive halving.
    #[validate(range(min = 1))]
    #[serde(default = "default_reduce_scatter_commutative_long_msg_size")]
    pub reduce_scatter_commutative_long_msg_size: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackMode::default(),
            allreduce_short_msg_size: default_allreduce_short_msg_size(),
            reduce_scatter_commutative_long_msg_size:
                default_reduce_scatter_commutative_long_msg_size(),
        }
    }
}

fn default_allreduce_short_msg_size() -> usize {
    2048
}

fn default_reduce_scatter_commutative_long_msg_size() -> usize {
    524288
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Fail the call with a fatal error.
    Error,
    /// Log a warning and run the order-preserving fallback.
    Print,
    /// Run the order-preserving fallback.
    #[default]
    Silent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SelectionConfig::default();
        assert_eq!(config.fallback, FallbackMode::Silent);
        assert_eq!(config.allreduce_short_msg_size, 2048);
        assert_eq!(config.reduce_scatter_commutative_long_msg_size, 524288);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_long_threshold_invalid() {
        let config = SelectionConfig {
            reduce_scatter_commutative_long_msg_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
