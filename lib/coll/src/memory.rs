// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Memory regions and the device-memory collaborator used for staging.
//!
//! A [`MemoryRegion`] is a plain descriptor (address, size, storage kind) in
//! the same spirit as the block-transfer memory descriptors: it does not own
//! the memory it describes. Reading or writing through it is `unsafe` and the
//! caller guarantees the memory stays alive for the duration of the call.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

/// Where a region physically resides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Pageable host memory.
    System,
    /// Page-locked host memory.
    Pinned,
    /// Accelerator memory on the given device ordinal.
    Device(u32),
}

impl StorageKind {
    pub fn is_host(&self) -> bool {
        matches!(self, StorageKind::System | StorageKind::Pinned)
    }

    pub fn is_device(&self) -> bool {
        matches!(self, StorageKind::Device(_))
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to allocate {size} bytes of host memory")]
    AllocationFailed { size: usize },

    #[error("copy size mismatch: src={src} bytes, dst={dst} bytes")]
    SizeMismatch { src: usize, dst: usize },

    #[error("address {0:#x} was not allocated by this allocator")]
    UnknownAllocation(usize),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// A contiguous memory region participating in a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRegion {
    addr: usize,
    size: usize,
    kind: StorageKind,
}

impl MemoryRegion {
    pub fn new(addr: usize, size: usize, kind: StorageKind) -> Self {
        Self { addr, size, kind }
    }

    /// Describe a host slice.
    pub fn from_slice(slice: &[u8]) -> Self {
        Self::new(slice.as_ptr() as usize, slice.len(), StorageKind::System)
    }

    /// Describe a writable host slice.
    pub fn from_mut_slice(slice: &mut [u8]) -> Self {
        Self::new(slice.as_mut_ptr() as usize, slice.len(), StorageKind::System)
    }

    /// The same address range, tagged with a different storage kind.
    pub fn with_kind(self, kind: StorageKind) -> Self {
        Self { kind, ..self }
    }

    pub fn addr(&self) -> usize {
        self.addr
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.kind
    }

    /// The first `len` bytes of the region, `None` if it is shorter.
    pub fn prefix(&self, len: usize) -> Option<MemoryRegion> {
        (len <= self.size).then_some(Self { size: len, ..*self })
    }

    /// View the region as a byte slice.
    ///
    /// # Safety
    /// The region must describe host-addressable memory that is valid for reads
    /// of `size` bytes and not mutated for the returned lifetime.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        if self.size == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.addr as *const u8, self.size) }
    }

    /// View the region as a mutable byte slice.
    ///
    /// # Safety
    /// The region must describe host-addressable memory that is valid for
    /// writes of `size` bytes and not aliased for the returned lifetime.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        if self.size == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.addr as *mut u8, self.size) }
    }
}

/// Host/device memory services needed to stage device-resident buffers.
pub trait DeviceMemory: Send + Sync {
    /// Locate the memory described by `region`.
    ///
    /// The default trusts the kind the caller attached to the region; device
    /// runtimes override this with a pointer-attribute query.
    fn storage_kind(&self, region: &MemoryRegion) -> StorageKind {
        region.storage_kind()
    }

    /// Allocate a host buffer of `size` bytes.
    fn alloc_host(&self, size: usize) -> Result<MemoryRegion, StorageError>;

    /// Release a buffer returned by [`DeviceMemory::alloc_host`].
    fn free_host(&self, region: MemoryRegion) -> Result<(), StorageError>;

    /// Copy `src` into `dst`. Both regions must have the same size.
    ///
    /// # Safety
    /// Both regions must describe live memory of their stated size and kind.
    unsafe fn copy(&self, dst: &MemoryRegion, src: &MemoryRegion) -> Result<(), StorageError>;
}

/// Host-only [`DeviceMemory`] backed by the global allocator.
///
/// Live staging allocations are tracked, and an optional byte limit bounds the
/// total so exhaustion surfaces as [`StorageError::AllocationFailed`] rather
/// than an abort. Copies are plain memcpy, which is also correct for "device"
/// regions that are host-addressable (unified memory, simulated devices).
#[derive(Debug, Default)]
pub struct SystemMemory {
    limit: Option<usize>,
    allocations: Mutex<HashMap<usize, Box<[u8]>>>,
}

impl SystemMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the total bytes of simultaneously live allocations.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Number of allocations not yet released.
    pub fn live_allocations(&self) -> usize {
        self.allocations.lock().len()
    }

    /// Total bytes held by live allocations.
    pub fn bytes_in_use(&self) -> usize {
        self.allocations.lock().values().map(|b| b.len()).sum()
    }
}

impl DeviceMemory for SystemMemory {
    fn alloc_host(&self, size: usize) -> Result<MemoryRegion, StorageError> {
        let mut allocations = self.allocations.lock();

        if let Some(limit) = self.limit {
            let in_use: usize = allocations.values().map(|b| b.len()).sum();
            if in_use.saturating_add(size) > limit {
                return Err(StorageError::AllocationFailed { size });
            }
        }

        // Zero-sized requests still get a distinct address so they can be
        // tracked and released like any other allocation.
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size.max(1))
            .map_err(|_| StorageError::AllocationFailed { size })?;
        buffer.resize(size.max(1), 0u8);
        let buffer = buffer.into_boxed_slice();

        let addr = buffer.as_ptr() as usize;
        allocations.insert(addr, buffer);

        Ok(MemoryRegion::new(addr, size, StorageKind::System))
    }

    fn free_host(&self, region: MemoryRegion) -> Result<(), StorageError> {
        self.allocations
            .lock()
            .remove(&region.addr())
            .map(drop)
            .ok_or(StorageError::UnknownAllocation(region.addr()))
    }

    unsafe fn copy(&self, dst: &MemoryRegion, src: &MemoryRegion) -> Result<(), StorageError> {
        if src.size() != dst.size() {
            return Err(StorageError::SizeMismatch {
                src: src.size(),
                dst: dst.size(),
            });
        }
        if src.size() == 0 {
            return Ok(());
        }
        unsafe {
            std::ptr::copy(src.addr() as *const u8, dst.addr() as *mut u8, src.size());
        }
        Ok(())
    }
}
