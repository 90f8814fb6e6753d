// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reduce-scatter algorithm selection.

use serde::{Deserialize, Serialize};

/// Manual algorithm choices for reduce-scatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceScatterConfig {
    #[serde(default)]
    pub intra_algorithm: ReduceScatterIntraAlgorithm,

    #[serde(default)]
    pub inter_algorithm: ReduceScatterInterAlgorithm,

    #[serde(default = "default_device_collective")]
    pub device_collective: bool,
}

impl Default for ReduceScatterConfig {
    fn default() -> Self {
        Self {
            intra_algorithm: ReduceScatterIntraAlgorithm::default(),
            inter_algorithm: ReduceScatterInterAlgorithm::default(),
            device_collective: default_device_collective(),
        }
    }
}

fn default_device_collective() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceScatterIntraAlgorithm {
    #[default]
    Auto,
    /// Order-preserving; power-of-two groups with uniform counts only.
    Noncommutative,
    /// Requires a commutative operator.
    Pairwise,
    /// Requires a commutative operator.
    RecursiveHalving,
    RecursiveDoubling,
    Nb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceScatterInterAlgorithm {
    #[default]
    Auto,
    RemoteReduceLocalScatter,
    Nb,
}
