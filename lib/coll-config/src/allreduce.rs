// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! All-reduce algorithm selection.

use serde::{Deserialize, Serialize};

/// Manual algorithm choices for all-reduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllreduceConfig {
    /// Algorithm for single-group (intra) communicators.
    #[serde(default)]
    pub intra_algorithm: AllreduceIntraAlgorithm,

    /// Algorithm for two-group (inter) communicators.
    #[serde(default)]
    pub inter_algorithm: AllreduceInterAlgorithm,

    /// Route to the device-layer all-reduce when device collectives are
    /// enabled per collective.
    #[serde(default = "default_device_collective")]
    pub device_collective: bool,
}

impl Default for AllreduceConfig {
    fn default() -> Self {
        Self {
            intra_algorithm: AllreduceIntraAlgorithm::default(),
            inter_algorithm: AllreduceInterAlgorithm::default(),
            device_collective: default_device_collective(),
        }
    }
}

fn default_device_collective() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllreduceIntraAlgorithm {
    /// Defer to the communicator's automatic selector.
    #[default]
    Auto,
    RecursiveDoubling,
    ReduceScatterAllgather,
    /// Node-aware: intra-node reduce, inter-node all-reduce, intra-node bcast.
    Smp,
    /// Start the non-blocking all-reduce and wait for it.
    Nb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllreduceInterAlgorithm {
    #[default]
    Auto,
    ReduceExchangeBcast,
    Nb,
}
