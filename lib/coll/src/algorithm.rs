// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Algorithm identifiers and the id → implementation table.
//!
//! Algorithm bodies live outside this crate. They are registered once into an
//! [`AlgorithmTable`] and invoked by identifier; adding an algorithm is one
//! enum variant plus one table entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ErrorFlag;
use crate::signature::CollSignature;
use crate::types::{CollOp, CommKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlgorithmId {
    AllreduceIntraRecursiveDoubling,
    AllreduceIntraReduceScatterAllgather,
    AllreduceIntraSmp,
    AllreduceInterReduceExchangeBcast,
    AllreduceAllcommNb,
    AllreduceDevice,
    ReduceScatterIntraNoncommutative,
    ReduceScatterIntraPairwise,
    ReduceScatterIntraRecursiveDoubling,
    ReduceScatterIntraRecursiveHalving,
    ReduceScatterInterRemoteReduceLocalScatter,
    ReduceScatterAllcommNb,
    ReduceScatterDevice,
}

/// Communicator kinds an algorithm can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSupport {
    Intra,
    Inter,
    Any,
}

impl AlgorithmId {
    pub const ALL: [AlgorithmId; 13] = [
        AlgorithmId::AllreduceIntraRecursiveDoubling,
        AlgorithmId::AllreduceIntraReduceScatterAllgather,
        AlgorithmId::AllreduceIntraSmp,
        AlgorithmId::AllreduceInterReduceExchangeBcast,
        AlgorithmId::AllreduceAllcommNb,
        AlgorithmId::AllreduceDevice,
        AlgorithmId::ReduceScatterIntraNoncommutative,
        AlgorithmId::ReduceScatterIntraPairwise,
        AlgorithmId::ReduceScatterIntraRecursiveDoubling,
        AlgorithmId::ReduceScatterIntraRecursiveHalving,
        AlgorithmId::ReduceScatterInterRemoteReduceLocalScatter,
        AlgorithmId::ReduceScatterAllcommNb,
        AlgorithmId::ReduceScatterDevice,
    ];

    pub fn op(&self) -> CollOp {
        use AlgorithmId::*;
        match self {
            AllreduceIntraRecursiveDoubling
            | AllreduceIntraReduceScatterAllgather
            | AllreduceIntraSmp
            | AllreduceInterReduceExchangeBcast
            | AllreduceAllcommNb
            | AllreduceDevice => CollOp::Allreduce,
            ReduceScatterIntraNoncommutative
            | ReduceScatterIntraPairwise
            | ReduceScatterIntraRecursiveDoubling
            | ReduceScatterIntraRecursiveHalving
            | ReduceScatterInterRemoteReduceLocalScatter
            | ReduceScatterAllcommNb
            | ReduceScatterDevice => CollOp::ReduceScatter,
        }
    }

    pub fn group(&self) -> GroupSupport {
        use AlgorithmId::*;
        match self {
            AllreduceIntraRecursiveDoubling
            | AllreduceIntraReduceScatterAllgather
            | AllreduceIntraSmp
            | ReduceScatterIntraNoncommutative
            | ReduceScatterIntraPairwise
            | ReduceScatterIntraRecursiveDoubling
            | ReduceScatterIntraRecursiveHalving => GroupSupport::Intra,
            AllreduceInterReduceExchangeBcast | ReduceScatterInterRemoteReduceLocalScatter => {
                GroupSupport::Inter
            }
            AllreduceAllcommNb | AllreduceDevice | ReduceScatterAllcommNb | ReduceScatterDevice => {
                GroupSupport::Any
            }
        }
    }

    pub fn supports(&self, kind: CommKind) -> bool {
        match self.group() {
            GroupSupport::Any => true,
            GroupSupport::Intra => kind.is_intra(),
            GroupSupport::Inter => kind.is_inter(),
        }
    }

    /// Whether the algorithm may combine contributions out of rank order,
    /// which is only correct for commutative operators.
    pub fn reorders_operands(&self) -> bool {
        matches!(
            self,
            AlgorithmId::AllreduceIntraReduceScatterAllgather
                | AlgorithmId::AllreduceIntraSmp
                | AlgorithmId::ReduceScatterIntraPairwise
                | AlgorithmId::ReduceScatterIntraRecursiveHalving
        )
    }

    /// The device-layer override for `op`.
    pub fn device(op: CollOp) -> AlgorithmId {
        match op {
            CollOp::Allreduce => AlgorithmId::AllreduceDevice,
            CollOp::ReduceScatter => AlgorithmId::ReduceScatterDevice,
        }
    }

    pub fn name(&self) -> &'static str {
        use AlgorithmId::*;
        match self {
            AllreduceIntraRecursiveDoubling => "allreduce_intra_recursive_doubling",
            AllreduceIntraReduceScatterAllgather => "allreduce_intra_reduce_scatter_allgather",
            AllreduceIntraSmp => "allreduce_intra_smp",
            AllreduceInterReduceExchangeBcast => "allreduce_inter_reduce_exchange_bcast",
            AllreduceAllcommNb => "allreduce_allcomm_nb",
            AllreduceDevice => "allreduce_device",
            ReduceScatterIntraNoncommutative => "reduce_scatter_intra_noncommutative",
            ReduceScatterIntraPairwise => "reduce_scatter_intra_pairwise",
            ReduceScatterIntraRecursiveDoubling => "reduce_scatter_intra_recursive_doubling",
            ReduceScatterIntraRecursiveHalving => "reduce_scatter_intra_recursive_halving",
            ReduceScatterInterRemoteReduceLocalScatter => {
                "reduce_scatter_inter_remote_reduce_local_scatter"
            }
            ReduceScatterAllcommNb => "reduce_scatter_allcomm_nb",
            ReduceScatterDevice => "reduce_scatter_device",
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An externally implemented collective algorithm.
///
/// Implementations raise `errflag` for failures they absorbed locally and
/// return `Err` for failures they could not. Either way they must still take
/// part in every exchange the peers expect.
pub trait CollAlgorithm: Send + Sync {
    fn run(&self, sig: &CollSignature<'_>, errflag: &mut ErrorFlag) -> anyhow::Result<()>;
}

impl<F> CollAlgorithm for F
where
    F: Fn(&CollSignature<'_>, &mut ErrorFlag) -> anyhow::Result<()> + Send + Sync,
{
    fn run(&self, sig: &CollSignature<'_>, errflag: &mut ErrorFlag) -> anyhow::Result<()> {
        self(sig, errflag)
    }
}

/// Immutable id → algorithm table, built once and shared by dispatchers.
#[derive(Clone, Default)]
pub struct AlgorithmTable {
    entries: HashMap<AlgorithmId, Arc<dyn CollAlgorithm>>,
}

impl AlgorithmTable {
    pub fn builder() -> AlgorithmTableBuilder {
        AlgorithmTableBuilder::default()
    }

    pub fn get(&self, id: AlgorithmId) -> Option<&Arc<dyn CollAlgorithm>> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: AlgorithmId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for AlgorithmTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("AlgorithmTable").field("entries", &ids).finish()
    }
}

#[derive(Default)]
pub struct AlgorithmTableBuilder {
    entries: HashMap<AlgorithmId, Arc<dyn CollAlgorithm>>,
}

impl AlgorithmTableBuilder {
    /// Register `algorithm` under `id`, replacing any earlier entry.
    pub fn register(mut self, id: AlgorithmId, algorithm: Arc<dyn CollAlgorithm>) -> Self {
        if self.entries.insert(id, algorithm).is_some() {
            tracing::debug!(algorithm = %id, "replaced algorithm table entry");
        }
        self
    }

    pub fn register_fn<F>(self, id: AlgorithmId, f: F) -> Self
    where
        F: Fn(&CollSignature<'_>, &mut ErrorFlag) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(id, Arc::new(f))
    }

    pub fn build(self) -> AlgorithmTable {
        AlgorithmTable {
            entries: self.entries,
        }
    }
}
