// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures: recording algorithm tables and fault-injecting memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::algorithm::{AlgorithmId, AlgorithmTable};
use crate::error::ErrorFlag;
use crate::memory::{DeviceMemory, MemoryRegion, StorageError, SystemMemory};
use crate::signature::{CollSignature, SendBuffer};

/// Invocations observed by a recording table.
#[derive(Debug, Clone, Default)]
pub struct Invocations(Arc<Mutex<Vec<AlgorithmId>>>);

impl Invocations {
    pub fn take(&self) -> Vec<AlgorithmId> {
        std::mem::take(&mut *self.0.lock())
    }

    fn push(&self, id: AlgorithmId) {
        self.0.lock().push(id);
    }
}

/// A table where every algorithm records its id and succeeds.
pub fn recording_table() -> (AlgorithmTable, Invocations) {
    let invocations = Invocations::default();
    let table = AlgorithmId::ALL
        .into_iter()
        .fold(AlgorithmTable::builder(), |builder, id| {
            let log = invocations.clone();
            builder.register_fn(id, move |_, _| {
                log.push(id);
                Ok(())
            })
        })
        .build();
    (table, invocations)
}

/// Single-rank identity reduction: copies the input into the receive buffer.
///
/// Only valid on one-rank communicators, where every reduction is the
/// identity over the caller's own contribution.
pub fn identity_copy(sig: &CollSignature<'_>, _errflag: &mut ErrorFlag) -> anyhow::Result<()> {
    anyhow::ensure!(sig.comm().size() == 1, "identity_copy needs a single-rank communicator");
    let sizes = sig.validate()?;
    if let SendBuffer::Region(send) = sig.sendbuf() {
        // SAFETY: the dispatcher hands algorithms host-addressable buffers
        // of at least the validated sizes.
        unsafe {
            let src = &send.as_slice()[..sizes.send];
            sig.recvbuf().as_mut_slice()[..sizes.recv].copy_from_slice(&src[..sizes.recv]);
        }
    }
    Ok(())
}

/// [`SystemMemory`] that starts failing allocations after a fixed number of
/// successes.
#[derive(Debug)]
pub struct FlakyMemory {
    inner: SystemMemory,
    remaining: AtomicUsize,
}

impl FlakyMemory {
    pub fn failing_after(successes: usize) -> Self {
        Self {
            inner: SystemMemory::new(),
            remaining: AtomicUsize::new(successes),
        }
    }

    pub fn inner(&self) -> &SystemMemory {
        &self.inner
    }
}

impl DeviceMemory for FlakyMemory {
    fn alloc_host(&self, size: usize) -> Result<MemoryRegion, StorageError> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| StorageError::AllocationFailed { size })?;
        self.inner.alloc_host(size)
    }

    fn free_host(&self, region: MemoryRegion) -> Result<(), StorageError> {
        self.inner.free_host(region)
    }

    unsafe fn copy(&self, dst: &MemoryRegion, src: &MemoryRegion) -> Result<(), StorageError> {
        unsafe { self.inner.copy(dst, src) }
    }
}
