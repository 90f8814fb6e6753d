// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Device-layer collective override.
//!
//! A device layer may provide its own implementation of a collective. When
//! enabled, the dispatcher hands the call to it instead of selecting one of the
//! host algorithms.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub collectives: DeviceCollectivesMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCollectivesMode {
    /// Always use the host algorithms.
    #[default]
    None,
    /// Always use the device layer.
    All,
    /// Use the device layer for collectives whose `device_collective` flag is set.
    Percoll,
}

impl DeviceCollectivesMode {
    /// Whether a collective with the given per-collective flag goes to the device layer.
    pub fn applies(&self, per_collective: bool) -> bool {
        match self {
            DeviceCollectivesMode::None => false,
            DeviceCollectivesMode::All => true,
            DeviceCollectivesMode::Percoll => per_collective,
        }
    }
}
