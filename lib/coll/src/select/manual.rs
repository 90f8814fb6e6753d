// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Manual-mode mapping from configured choices to algorithm identifiers.
//!
//! `None` means the configuration asked for `auto`.

use dynamo_coll_config::{
    AllreduceInterAlgorithm, AllreduceIntraAlgorithm, CollConfig, ReduceScatterInterAlgorithm,
    ReduceScatterIntraAlgorithm,
};

use crate::algorithm::AlgorithmId;
use crate::types::{CollOp, CommKind};

pub fn allreduce_intra(choice: AllreduceIntraAlgorithm) -> Option<AlgorithmId> {
    match choice {
        AllreduceIntraAlgorithm::Auto => None,
        AllreduceIntraAlgorithm::RecursiveDoubling => {
            Some(AlgorithmId::AllreduceIntraRecursiveDoubling)
        }
        AllreduceIntraAlgorithm::ReduceScatterAllgather => {
            Some(AlgorithmId::AllreduceIntraReduceScatterAllgather)
        }
        AllreduceIntraAlgorithm::Smp => Some(AlgorithmId::AllreduceIntraSmp),
        AllreduceIntraAlgorithm::Nb => Some(AlgorithmId::AllreduceAllcommNb),
    }
}

pub fn allreduce_inter(choice: AllreduceInterAlgorithm) -> Option<AlgorithmId> {
    match choice {
        AllreduceInterAlgorithm::Auto => None,
        AllreduceInterAlgorithm::ReduceExchangeBcast => {
            Some(AlgorithmId::AllreduceInterReduceExchangeBcast)
        }
        AllreduceInterAlgorithm::Nb => Some(AlgorithmId::AllreduceAllcommNb),
    }
}

pub fn reduce_scatter_intra(choice: ReduceScatterIntraAlgorithm) -> Option<AlgorithmId> {
    match choice {
        ReduceScatterIntraAlgorithm::Auto => None,
        ReduceScatterIntraAlgorithm::Noncommutative => {
            Some(AlgorithmId::ReduceScatterIntraNoncommutative)
        }
        ReduceScatterIntraAlgorithm::Pairwise => Some(AlgorithmId::ReduceScatterIntraPairwise),
        ReduceScatterIntraAlgorithm::RecursiveHalving => {
            Some(AlgorithmId::ReduceScatterIntraRecursiveHalving)
        }
        ReduceScatterIntraAlgorithm::RecursiveDoubling => {
            Some(AlgorithmId::ReduceScatterIntraRecursiveDoubling)
        }
        ReduceScatterIntraAlgorithm::Nb => Some(AlgorithmId::ReduceScatterAllcommNb),
    }
}

pub fn reduce_scatter_inter(choice: ReduceScatterInterAlgorithm) -> Option<AlgorithmId> {
    match choice {
        ReduceScatterInterAlgorithm::Auto => None,
        ReduceScatterInterAlgorithm::RemoteReduceLocalScatter => {
            Some(AlgorithmId::ReduceScatterInterRemoteReduceLocalScatter)
        }
        ReduceScatterInterAlgorithm::Nb => Some(AlgorithmId::ReduceScatterAllcommNb),
    }
}

/// The configured choice for `op` on a communicator of `kind`.
pub fn choice(config: &CollConfig, op: CollOp, kind: CommKind) -> Option<AlgorithmId> {
    match (op, kind) {
        (CollOp::Allreduce, CommKind::Intra) => allreduce_intra(config.allreduce.intra_algorithm),
        (CollOp::Allreduce, CommKind::Inter { .. }) => {
            allreduce_inter(config.allreduce.inter_algorithm)
        }
        (CollOp::ReduceScatter, CommKind::Intra) => {
            reduce_scatter_intra(config.reduce_scatter.intra_algorithm)
        }
        (CollOp::ReduceScatter, CommKind::Inter { .. }) => {
            reduce_scatter_inter(config.reduce_scatter.inter_algorithm)
        }
    }
}

/// Whether the device layer takes over `op` entirely.
pub fn device_override(config: &CollConfig, op: CollOp) -> bool {
    let per_collective = match op {
        CollOp::Allreduce => config.allreduce.device_collective,
        CollOp::ReduceScatter => config.reduce_scatter.device_collective,
    };
    config.device.collectives.applies(per_collective)
}
