// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Logical spanning trees over the ranks of a communicator.
//!
//! Tree-shaped collective algorithms ask for the parent and the children of a
//! single rank in a tree rooted at `root`. Three shapes are available:
//!
//! - [`TreeType::Kary`]: logical rank `i` has children `i*k+1 ..= i*k+k`.
//!   Balanced, minimum hop count for a given fan-out.
//! - [`TreeType::Knomial1`]: the rank range is split into `k` contiguous blocks
//!   of geometrically shrinking size at every level; fills group sizes that are
//!   not a power of `k` more evenly than the k-ary shape.
//! - [`TreeType::Knomial2`]: digit-flip tree. The parent of a rank is the rank
//!   with its least significant non-zero base-`k` digit cleared; the radix-`k`
//!   generalization of a recursive-doubling hypercube.
//!
//! Every shape is computed on logical ranks where the root is rank 0, then
//! rotated back into communicator ranks with `(lrank + root) % nranks`.
//!
//! ```text
//!   knomial_1, 8 ranks        knomial_2, 8 ranks
//!          0                          0
//!      /   |   \                  /   |   \
//!     1    5    7                4    2    1
//!    / \   |                    / \   |
//!   2   4  6                   6   5  3
//!   |                          |
//!   3                          7
//! ```
//!
//! A [`Tree`] is built fresh for each collective call and owned by it.

mod digits;
mod kary;
mod knomial;

pub use kary::kary;
pub use knomial::{knomial_1, knomial_2};

use std::collections::TryReserveError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a process within a communicator.
pub type Rank = usize;

/// Errors produced while building a tree.
///
/// Malformed parameters (`k` below the shape's minimum, `root` or `rank`
/// outside the group) are programming errors and panic instead.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to allocate {requested} child slots for rank {rank}")]
    Allocation {
        rank: Rank,
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Shape of the spanning tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeType {
    #[serde(rename = "kary")]
    Kary,
    #[default]
    #[serde(rename = "knomial_1")]
    Knomial1,
    #[serde(rename = "knomial_2")]
    Knomial2,
}

impl TreeType {
    /// Smallest radix the shape accepts.
    pub fn min_k(&self) -> usize {
        match self {
            TreeType::Kary => 1,
            TreeType::Knomial1 | TreeType::Knomial2 => 2,
        }
    }
}

impl std::fmt::Display for TreeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeType::Kary => write!(f, "kary"),
            TreeType::Knomial1 => write!(f, "knomial_1"),
            TreeType::Knomial2 => write!(f, "knomial_2"),
        }
    }
}

/// The view of a spanning tree from one rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    rank: Rank,
    nranks: usize,
    parent: Option<Rank>,
    children: Vec<Rank>,
}

impl Tree {
    fn empty(rank: Rank, nranks: usize) -> Self {
        Self {
            rank,
            nranks,
            parent: None,
            children: Vec::new(),
        }
    }

    /// The rank this tree was built for.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of ranks spanned by the tree.
    pub fn nranks(&self) -> usize {
        self.nranks
    }

    /// Parent rank, `None` for the root.
    pub fn parent(&self) -> Option<Rank> {
        self.parent
    }

    /// Children in the order the shape emits them.
    pub fn children(&self) -> &[Rank] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn reserve_children(&mut self, requested: usize) -> Result<(), TreeError> {
        self.children
            .try_reserve_exact(requested)
            .map_err(|source| TreeError::Allocation {
                rank: self.rank,
                requested,
                source,
            })
    }

    fn add_child(&mut self, child: Rank) {
        tracing::trace!(rank = self.rank, child, "adding child");
        self.children.push(child);
    }
}

/// Build the tree of the given shape for `rank`.
///
/// `nranks == 0` yields an empty tree. Panics if `k` is below
/// [`TreeType::min_k`] or if `rank`/`root` are not in `0..nranks`.
pub fn build(
    tree_type: TreeType,
    rank: Rank,
    nranks: usize,
    k: usize,
    root: Rank,
) -> Result<Tree, TreeError> {
    match tree_type {
        TreeType::Kary => kary(rank, nranks, k, root),
        TreeType::Knomial1 => knomial_1(rank, nranks, k, root),
        TreeType::Knomial2 => knomial_2(rank, nranks, k, root),
    }
}

// Shared argument checks. Must only be called with nranks > 0.
fn check_ranks(rank: Rank, nranks: usize, root: Rank) {
    assert!(root < nranks, "root {root} outside of 0..{nranks}");
    assert!(rank < nranks, "rank {rank} outside of 0..{nranks}");
}

fn to_logical(rank: Rank, nranks: usize, root: Rank) -> Rank {
    (rank + (nranks - root)) % nranks
}

fn to_physical(lrank: Rank, nranks: usize, root: Rank) -> Rank {
    (lrank + root) % nranks
}
