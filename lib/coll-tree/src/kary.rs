// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::{Rank, Tree, TreeError, check_ranks, to_logical, to_physical};

/// Build a k-ary tree for `rank`.
///
/// Logical rank `i` has parent `(i - 1) / k` and children `i*k+1 ..= i*k+k`
/// clipped to the group, in increasing order. Panics if `k == 0`.
pub fn kary(rank: Rank, nranks: usize, k: usize, root: Rank) -> Result<Tree, TreeError> {
    let mut tree = Tree::empty(rank, nranks);
    if nranks == 0 {
        return Ok(tree);
    }

    assert!(k >= 1, "k-ary tree requires k >= 1, got {k}");
    check_ranks(rank, nranks, root);

    let lrank = to_logical(rank, nranks, root);

    tree.parent = (lrank != 0).then(|| to_physical((lrank - 1) / k, nranks, root));

    let first = lrank.saturating_mul(k).saturating_add(1);
    if first < nranks {
        let last = lrank.saturating_mul(k).saturating_add(k).min(nranks - 1);
        tree.reserve_children(last - first + 1)?;
        for child in first..=last {
            tree.add_child(to_physical(child, nranks, root));
        }
    }

    tracing::debug!(
        rank,
        parent = ?tree.parent,
        nranks,
        root,
        num_children = tree.num_children(),
        "built k-ary tree"
    );

    Ok(tree)
}
