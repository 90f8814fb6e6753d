// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Tree shape configuration for tree-based algorithms.

use dynamo_coll_tree::TreeType;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TreeConfig {
    #[serde(default)]
    pub tree_type: TreeType,

    /// Radix of the tree. The k-nomial shapes need at least 2.
    #[validate(range(min = 2))]
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            tree_type: TreeType::default(),
            k: default_k(),
        }
    }
}

fn default_k() -> usize {
    2
}
