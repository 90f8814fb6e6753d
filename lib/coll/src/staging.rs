// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Host staging of device-resident collective buffers.
//!
//! Host-executed algorithms cannot address device memory. [`StagingAdapter`]
//! mirrors device-resident send/receive buffers into host memory and hands out
//! a signature that points at the mirrors. The returned [`StagedBuffers`] owns
//! the mirrors: [`StagedBuffers::finish`] copies the receive mirror back to the
//! device buffer, and dropping it releases every mirror on any exit path.

use crate::error::CollError;
use crate::memory::{DeviceMemory, MemoryRegion};
use crate::signature::{BufferSizes, CollSignature, SendBuffer};
use crate::types::Rank;

#[derive(Debug, Clone, Copy)]
struct Mirror {
    host: MemoryRegion,
    device: MemoryRegion,
}

pub struct StagingAdapter<'m> {
    memory: &'m dyn DeviceMemory,
    rank: Rank,
}

impl<'m> StagingAdapter<'m> {
    pub fn new(memory: &'m dyn DeviceMemory, rank: Rank) -> Self {
        Self { memory, rank }
    }

    /// Mirror the device-resident buffers of `sig`.
    ///
    /// `sizes` must come from [`CollSignature::validate`]. On error, mirrors
    /// allocated so far are released before returning.
    pub fn stage<'a>(
        &self,
        sig: &CollSignature<'a>,
        sizes: BufferSizes,
    ) -> Result<(CollSignature<'a>, StagedBuffers<'m>), CollError> {
        let mut staged = StagedBuffers {
            memory: self.memory,
            rank: self.rank,
            send: None,
            recv: None,
        };

        let mut sendbuf = sig.sendbuf();
        if let SendBuffer::Region(region) = sendbuf {
            if self.memory.storage_kind(&region).is_device() {
                let device = self.window(sig, region, sizes.send, "send")?;
                let host = self.alloc(sizes.send, "send")?;
                staged.send = Some(Mirror { host, device });
                self.copy(&host, &device, "send")?;
                sendbuf = SendBuffer::Region(host);
            }
        }

        let mut recvbuf = sig.recvbuf();
        if self.memory.storage_kind(&recvbuf).is_device() {
            let device = self.window(sig, recvbuf, sizes.recv, "recv")?;
            let host = self.alloc(sizes.recv, "recv")?;
            staged.recv = Some(Mirror { host, device });
            // in place: the receive buffer also carries the input
            if sig.sendbuf().is_in_place() {
                self.copy(&host, &device, "recv")?;
            }
            recvbuf = host;
        }

        if !staged.is_empty() {
            tracing::debug!(
                rank = self.rank,
                op = %sig.op(),
                send_bytes = staged.send.map(|m| m.host.size()),
                recv_bytes = staged.recv.map(|m| m.host.size()),
                "staged device buffers through host memory"
            );
        }

        Ok((sig.with_buffers(sendbuf, recvbuf), staged))
    }

    fn window(
        &self,
        sig: &CollSignature<'_>,
        region: MemoryRegion,
        len: usize,
        buffer: &'static str,
    ) -> Result<MemoryRegion, CollError> {
        region.prefix(len).ok_or_else(|| CollError::InvalidArgument {
            op: sig.op(),
            rank: self.rank,
            reason: format!(
                "{buffer} buffer holds {} bytes, {len} required",
                region.size()
            ),
        })
    }

    fn alloc(&self, bytes: usize, buffer: &'static str) -> Result<MemoryRegion, CollError> {
        self.memory
            .alloc_host(bytes)
            .map_err(|source| CollError::Allocation {
                rank: self.rank,
                buffer,
                bytes,
                source,
            })
    }

    fn copy(
        &self,
        dst: &MemoryRegion,
        src: &MemoryRegion,
        buffer: &'static str,
    ) -> Result<(), CollError> {
        // SAFETY: `src` is a window of a caller buffer checked against the
        // signature and `dst` a live mirror of the same size.
        unsafe { self.memory.copy(dst, src) }.map_err(|source| CollError::Staging {
            rank: self.rank,
            buffer,
            source,
        })
    }
}

/// Host mirrors owned for the duration of one collective call.
#[must_use = "dropping staged buffers discards the receive mirror without copying it back"]
pub struct StagedBuffers<'m> {
    memory: &'m dyn DeviceMemory,
    rank: Rank,
    send: Option<Mirror>,
    recv: Option<Mirror>,
}

impl StagedBuffers<'_> {
    /// Whether nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.send.is_none() && self.recv.is_none()
    }

    pub fn host_send(&self) -> Option<MemoryRegion> {
        self.send.map(|m| m.host)
    }

    pub fn host_recv(&self) -> Option<MemoryRegion> {
        self.recv.map(|m| m.host)
    }

    /// Copy the receive mirror back to the device buffer, then release all
    /// mirrors.
    pub fn finish(self) -> Result<(), CollError> {
        let Some(mirror) = self.recv else {
            return Ok(());
        };
        // SAFETY: the mirror is still allocated (released in Drop) and the
        // device window was validated at staging time.
        unsafe { self.memory.copy(&mirror.device, &mirror.host) }.map_err(|source| {
            CollError::Staging {
                rank: self.rank,
                buffer: "recv",
                source,
            }
        })
    }
}

impl Drop for StagedBuffers<'_> {
    fn drop(&mut self) {
        for (buffer, mirror) in [("send", self.send.take()), ("recv", self.recv.take())] {
            let Some(mirror) = mirror else { continue };
            if let Err(e) = self.memory.free_host(mirror.host) {
                tracing::warn!(
                    rank = self.rank,
                    buffer,
                    error = %e,
                    "failed to release host staging buffer"
                );
            }
        }
    }
}
