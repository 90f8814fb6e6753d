// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::digits::{get_digit, ipow, num_digits, set_digit};
use super::{Rank, Tree, TreeError, check_ranks, to_logical, to_physical};

/// Build a block-partitioned k-nomial tree for `rank`.
///
/// With depth `D = ceil(log_k(nranks))`, the subtree entered at step `s`
/// owns `k^(D-s)` consecutive logical ranks: its head, followed at every later
/// step `i` by `k - 1` child blocks of `k^(D-i-1)` ranks each. Panics if
/// `k < 2`.
pub fn knomial_1(rank: Rank, nranks: usize, k: usize, root: Rank) -> Result<Tree, TreeError> {
    let mut tree = Tree::empty(rank, nranks);
    if nranks == 0 {
        return Ok(tree);
    }

    assert!(k >= 2, "k-nomial tree requires k >= 2, got {k}");
    check_ranks(rank, nranks, root);

    let lrank = to_logical(rank, nranks, root);
    let max_step = num_digits(k, nranks - 1);

    // Descend from the root into the block holding lrank.
    let mut parent = None;
    let mut current = 0;
    let mut running = 1;
    let mut step = 0;
    while current != lrank {
        assert!(
            step < max_step,
            "rank {lrank} not reached within {max_step} steps of a {k}-nomial tree over {nranks} ranks"
        );
        let block = ipow(k, max_step - step - 1);
        for _ in 1..k {
            if lrank >= running && lrank < running + block {
                parent = Some(current);
                current = running;
                running = current + 1;
                break;
            }
            running += block;
        }
        step += 1;
    }

    tree.parent = parent.map(|p| to_physical(p, nranks, root));

    // Expand the same block structure below lrank for the remaining steps.
    // Child ranks only grow, so the first one past the group ends the scan.
    tree.reserve_children((k - 1).saturating_mul(max_step - step).min(nranks - 1))?;
    let mut child = lrank + 1;
    'levels: for level in step..max_step {
        let block = ipow(k, max_step - level - 1);
        for _ in 1..k {
            if child >= nranks {
                break 'levels;
            }
            tree.add_child(to_physical(child, nranks, root));
            child += block;
        }
    }

    tracing::debug!(
        rank,
        parent = ?tree.parent,
        nranks,
        root,
        num_children = tree.num_children(),
        "built knomial_1 tree"
    );

    Ok(tree)
}

/// Build a digit-flip k-nomial tree for `rank`.
///
/// The parent of a logical rank clears its least significant non-zero base-`k`
/// digit. The children set each trailing zero digit to every non-zero value,
/// most significant position first and larger values first, skipping ranks
/// outside the group. Panics if `k < 2`.
pub fn knomial_2(rank: Rank, nranks: usize, k: usize, root: Rank) -> Result<Tree, TreeError> {
    let mut tree = Tree::empty(rank, nranks);
    if nranks == 0 {
        return Ok(tree);
    }

    assert!(k >= 2, "k-nomial tree requires k >= 2, got {k}");
    check_ranks(rank, nranks, root);

    let lrank = to_logical(rank, nranks, root);
    let depth = num_digits(k, nranks - 1);

    tree.parent = (0..depth)
        .find(|&pos| get_digit(k, lrank, pos) != 0)
        .map(|pos| to_physical(set_digit(k, lrank, pos, 0), nranks, root));

    let trailing_zeros = (0..depth)
        .take_while(|&pos| get_digit(k, lrank, pos) == 0)
        .count();

    tree.reserve_children((k - 1).saturating_mul(trailing_zeros).min(nranks - 1))?;
    for pos in (0..trailing_zeros).rev() {
        // The digit at pos is zero, so value v yields lrank + v * k^pos.
        let max_value = (k - 1).min((nranks - 1 - lrank) / ipow(k, pos));
        for value in (1..=max_value).rev() {
            let child = set_digit(k, lrank, pos, value);
            tree.add_child(to_physical(child, nranks, root));
        }
    }

    tracing::debug!(
        rank,
        parent = ?tree.parent,
        nranks,
        root,
        num_children = tree.num_children(),
        "built knomial_2 tree"
    );

    Ok(tree)
}
