// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::algorithm::AlgorithmId;
use crate::comm::Communicator;
use crate::signature::CollSignature;
use crate::types::{CollOp, CommKind};

use super::CollSelector;

/// Default automatic policy.
///
/// Everything it consults is either precomputed from the communicator at
/// construction or part of the call's globally agreed arguments, so all ranks
/// reach the same choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSelector {
    kind: CommKind,
    size: usize,
    pof2: usize,
    node_aware: bool,
    allreduce_short_msg_size: usize,
    reduce_scatter_long_msg_size: usize,
}

impl RuleSelector {
    pub fn new(comm: &Communicator) -> Self {
        let selection = &comm.config().selection;
        Self {
            kind: comm.kind(),
            size: comm.size(),
            pof2: comm.pof2(),
            node_aware: comm.is_node_aware(),
            allreduce_short_msg_size: selection.allreduce_short_msg_size,
            reduce_scatter_long_msg_size: selection.reduce_scatter_commutative_long_msg_size,
        }
    }

    fn allreduce_intra(&self, sig: &CollSignature<'_>) -> AlgorithmId {
        let commutative = sig.is_commutative();
        if self.node_aware && commutative {
            AlgorithmId::AllreduceIntraSmp
        } else if sig.message_bytes() <= self.allreduce_short_msg_size
            || sig.total_count() < self.pof2
            || !commutative
        {
            AlgorithmId::AllreduceIntraRecursiveDoubling
        } else {
            AlgorithmId::AllreduceIntraReduceScatterAllgather
        }
    }

    fn reduce_scatter_intra(&self, sig: &CollSignature<'_>) -> AlgorithmId {
        if sig.is_commutative() {
            if sig.message_bytes() < self.reduce_scatter_long_msg_size {
                AlgorithmId::ReduceScatterIntraRecursiveHalving
            } else {
                AlgorithmId::ReduceScatterIntraPairwise
            }
        } else if self.size.is_power_of_two() && sig.has_uniform_counts() {
            AlgorithmId::ReduceScatterIntraNoncommutative
        } else {
            AlgorithmId::ReduceScatterIntraRecursiveDoubling
        }
    }
}

impl CollSelector for RuleSelector {
    fn select(&self, sig: &CollSignature<'_>) -> Option<AlgorithmId> {
        let comm = sig.comm();
        if comm.kind() != self.kind || comm.size() != self.size {
            return None;
        }

        let algorithm = match (sig.op(), self.kind) {
            (CollOp::Allreduce, CommKind::Intra) => self.allreduce_intra(sig),
            (CollOp::Allreduce, CommKind::Inter { .. }) => {
                AlgorithmId::AllreduceInterReduceExchangeBcast
            }
            (CollOp::ReduceScatter, CommKind::Intra) => self.reduce_scatter_intra(sig),
            (CollOp::ReduceScatter, CommKind::Inter { .. }) => {
                AlgorithmId::ReduceScatterInterRemoteReduceLocalScatter
            }
        };
        Some(algorithm)
    }
}
