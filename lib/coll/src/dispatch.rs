// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Collective entry points.

use std::sync::Arc;

use crate::algorithm::{AlgorithmId, AlgorithmTable};
use crate::comm::Communicator;
use crate::error::{CollError, ErrorFlag};
use crate::memory::{DeviceMemory, MemoryRegion, SystemMemory};
use crate::select::{self, Resolved};
use crate::signature::{CollSignature, SendBuffer};
use crate::staging::StagingAdapter;
use crate::types::{Datatype, ReduceOp};

/// Resolves, stages and invokes collective algorithms.
///
/// A dispatcher holds no per-call state and can be shared by any number of
/// communicators and threads.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<AlgorithmTable>,
    memory: Arc<dyn DeviceMemory>,
}

impl Dispatcher {
    pub fn new(table: Arc<AlgorithmTable>, memory: Arc<dyn DeviceMemory>) -> Self {
        Self { table, memory }
    }

    /// A dispatcher that stages through [`SystemMemory`].
    pub fn with_system_memory(table: Arc<AlgorithmTable>) -> Self {
        Self::new(table, Arc::new(SystemMemory::new()))
    }

    pub fn table(&self) -> &AlgorithmTable {
        &self.table
    }

    /// Combine `count` elements from every rank with `op` and deliver the
    /// result to every rank.
    #[allow(clippy::too_many_arguments)]
    pub fn allreduce(
        &self,
        comm: &Communicator,
        sendbuf: SendBuffer,
        recvbuf: MemoryRegion,
        count: usize,
        datatype: Datatype,
        op: ReduceOp,
        errflag: &mut ErrorFlag,
    ) -> Result<AlgorithmId, CollError> {
        let sig = CollSignature::Allreduce {
            comm,
            sendbuf,
            recvbuf,
            count,
            datatype,
            op,
        };
        self.run(&sig, errflag)
    }

    /// Combine `Σ recvcounts` elements from every rank with `op` and deliver
    /// block `i` of the result, `recvcounts[i]` elements long, to rank `i`.
    #[allow(clippy::too_many_arguments)]
    pub fn reduce_scatter(
        &self,
        comm: &Communicator,
        sendbuf: SendBuffer,
        recvbuf: MemoryRegion,
        recvcounts: &[usize],
        datatype: Datatype,
        op: ReduceOp,
        errflag: &mut ErrorFlag,
    ) -> Result<AlgorithmId, CollError> {
        let sig = CollSignature::ReduceScatter {
            comm,
            sendbuf,
            recvbuf,
            recvcounts,
            datatype,
            op,
        };
        self.run(&sig, errflag)
    }

    /// Resolve the algorithm `sig` would run, without running it.
    pub fn resolve(&self, sig: &CollSignature<'_>) -> Result<Resolved, CollError> {
        select::resolve(sig)
    }

    /// Run one collective call.
    ///
    /// The algorithm starts from the caller's `errflag` and anything it raises
    /// is kept whether or not it returned an error. Any error also raises
    /// `errflag` to the error's severity. A flag that was already raised on
    /// entry is not by itself an error.
    pub fn run(
        &self,
        sig: &CollSignature<'_>,
        errflag: &mut ErrorFlag,
    ) -> Result<AlgorithmId, CollError> {
        let result = self.execute(sig, errflag);
        if let Err(e) = &result {
            errflag.raise(e.flag());
        }
        result
    }

    fn execute(
        &self,
        sig: &CollSignature<'_>,
        errflag: &mut ErrorFlag,
    ) -> Result<AlgorithmId, CollError> {
        let rank = sig.comm().rank();
        let sizes = sig.validate()?;

        let algorithm = self.resolve(sig)?.algorithm;
        let implementation = self
            .table
            .get(algorithm)
            .ok_or(CollError::Unmapped { algorithm })?;

        let adapter = StagingAdapter::new(self.memory.as_ref(), rank);
        let (staged_sig, staged) = adapter.stage(sig, sizes)?;

        // The algorithm sees the caller's flag so it can forward an earlier
        // local failure to its peers.
        let incoming = *errflag;
        let mut local = incoming;
        let outcome = implementation.run(&staged_sig, &mut local);
        errflag.raise(local);

        // Copy back even after a failure so the device buffer matches what
        // the algorithm left in the mirror.
        let copied = staged.finish();

        let outcome = match outcome {
            Err(source) => {
                tracing::warn!(rank, %algorithm, flag = %local, error = %source, "collective algorithm failed");
                Err(CollError::Algorithm {
                    rank,
                    algorithm,
                    flag: local,
                    source,
                })
            }
            Ok(()) if local > incoming => {
                tracing::warn!(rank, %algorithm, flag = %local, "collective algorithm raised error flag");
                Err(CollError::Flagged {
                    rank,
                    algorithm,
                    flag: local,
                })
            }
            Ok(()) => Ok(algorithm),
        };

        match (outcome, copied) {
            (Err(e), Err(copy_err)) => {
                tracing::debug!(rank, error = %copy_err, "copy-out after failed algorithm also failed");
                Err(e)
            }
            (outcome, copied) => outcome.and_then(|id| copied.map(|()| id)),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
