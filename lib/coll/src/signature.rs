// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Collective call signatures.
//!
//! A signature bundles one call's arguments. It borrows the communicator and
//! count vector for the duration of the call and is never retained.

use crate::comm::Communicator;
use crate::error::CollError;
use crate::memory::MemoryRegion;
use crate::types::{CollOp, Datatype, ReduceOp};

/// Source of a collective's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBuffer {
    /// Input is read from the receive buffer, which is then overwritten.
    InPlace,
    Region(MemoryRegion),
}

impl SendBuffer {
    pub fn is_in_place(&self) -> bool {
        matches!(self, SendBuffer::InPlace)
    }

    pub fn region(&self) -> Option<&MemoryRegion> {
        match self {
            SendBuffer::InPlace => None,
            SendBuffer::Region(region) => Some(region),
        }
    }
}

/// Byte sizes a signature requires of its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSizes {
    /// Bytes read from the send buffer. Zero for in-place calls.
    pub send: usize,
    /// Bytes of the receive buffer the collective reads or writes.
    pub recv: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum CollSignature<'a> {
    Allreduce {
        comm: &'a Communicator,
        sendbuf: SendBuffer,
        recvbuf: MemoryRegion,
        count: usize,
        datatype: Datatype,
        op: ReduceOp,
    },
    ReduceScatter {
        comm: &'a Communicator,
        sendbuf: SendBuffer,
        recvbuf: MemoryRegion,
        /// Elements delivered to each rank of the local group.
        recvcounts: &'a [usize],
        datatype: Datatype,
        op: ReduceOp,
    },
}

impl<'a> CollSignature<'a> {
    pub fn op(&self) -> CollOp {
        match self {
            CollSignature::Allreduce { .. } => CollOp::Allreduce,
            CollSignature::ReduceScatter { .. } => CollOp::ReduceScatter,
        }
    }

    pub fn comm(&self) -> &'a Communicator {
        match self {
            CollSignature::Allreduce { comm, .. } | CollSignature::ReduceScatter { comm, .. } => {
                comm
            }
        }
    }

    pub fn sendbuf(&self) -> SendBuffer {
        match self {
            CollSignature::Allreduce { sendbuf, .. }
            | CollSignature::ReduceScatter { sendbuf, .. } => *sendbuf,
        }
    }

    pub fn recvbuf(&self) -> MemoryRegion {
        match self {
            CollSignature::Allreduce { recvbuf, .. }
            | CollSignature::ReduceScatter { recvbuf, .. } => *recvbuf,
        }
    }

    pub fn datatype(&self) -> Datatype {
        match self {
            CollSignature::Allreduce { datatype, .. }
            | CollSignature::ReduceScatter { datatype, .. } => *datatype,
        }
    }

    pub fn reduce_op(&self) -> ReduceOp {
        match self {
            CollSignature::Allreduce { op, .. } | CollSignature::ReduceScatter { op, .. } => *op,
        }
    }

    pub fn is_commutative(&self) -> bool {
        self.reduce_op().is_commutative()
    }

    /// Elements reduced across the group: `count` for all-reduce, the sum of
    /// `recvcounts` for reduce-scatter.
    pub fn total_count(&self) -> usize {
        match self {
            CollSignature::Allreduce { count, .. } => *count,
            CollSignature::ReduceScatter { recvcounts, .. } => {
                recvcounts.iter().fold(0usize, |acc, c| acc.saturating_add(*c))
            }
        }
    }

    /// Bytes reduced across the group, saturating on overflow.
    pub fn message_bytes(&self) -> usize {
        self.total_count().saturating_mul(self.datatype().extent())
    }

    /// Whether every rank receives the same number of elements.
    pub fn has_uniform_counts(&self) -> bool {
        match self {
            CollSignature::Allreduce { .. } => true,
            CollSignature::ReduceScatter { recvcounts, .. } => {
                recvcounts.windows(2).all(|w| w[0] == w[1])
            }
        }
    }

    /// The same call with its buffers replaced.
    pub fn with_buffers(&self, sendbuf: SendBuffer, recvbuf: MemoryRegion) -> Self {
        let mut sig = *self;
        match &mut sig {
            CollSignature::Allreduce {
                sendbuf: s,
                recvbuf: r,
                ..
            }
            | CollSignature::ReduceScatter {
                sendbuf: s,
                recvbuf: r,
                ..
            } => {
                *s = sendbuf;
                *r = recvbuf;
            }
        }
        sig
    }

    /// Check the arguments and compute the buffer sizes the call touches.
    pub fn validate(&self) -> Result<BufferSizes, CollError> {
        let comm = self.comm();
        let invalid = |reason: String| CollError::InvalidArgument {
            op: self.op(),
            rank: comm.rank(),
            reason,
        };

        if let CollSignature::ReduceScatter { recvcounts, .. } = self {
            if recvcounts.len() != comm.size() {
                return Err(invalid(format!(
                    "expected {} receive counts, got {}",
                    comm.size(),
                    recvcounts.len()
                )));
            }
        }

        if self.sendbuf().is_in_place() && comm.kind().is_inter() {
            return Err(invalid(
                "in-place operation is not defined on inter-communicators".to_string(),
            ));
        }

        let datatype = self.datatype();
        let total = match self {
            CollSignature::Allreduce { count, .. } => Some(*count),
            CollSignature::ReduceScatter { recvcounts, .. } => recvcounts
                .iter()
                .try_fold(0usize, |acc, c| acc.checked_add(*c)),
        };
        let total_bytes = total
            .and_then(|n| datatype.bytes(n))
            .ok_or_else(|| invalid("message size overflows".to_string()))?;

        let own_bytes = match self {
            CollSignature::Allreduce { .. } => total_bytes,
            CollSignature::ReduceScatter { recvcounts, .. } => datatype
                .bytes(recvcounts[comm.rank()])
                .ok_or_else(|| invalid("receive size overflows".to_string()))?,
        };

        let sizes = match self.sendbuf() {
            SendBuffer::InPlace => BufferSizes {
                send: 0,
                recv: total_bytes,
            },
            SendBuffer::Region(_) => BufferSizes {
                send: total_bytes,
                recv: own_bytes,
            },
        };

        if let Some(send) = self.sendbuf().region() {
            if send.size() < sizes.send {
                return Err(invalid(format!(
                    "send buffer holds {} bytes, {} required",
                    send.size(),
                    sizes.send
                )));
            }
        }
        if self.recvbuf().size() < sizes.recv {
            return Err(invalid(format!(
                "receive buffer holds {} bytes, {} required",
                self.recvbuf().size(),
                sizes.recv
            )));
        }

        Ok(sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StorageKind;
    use crate::types::CommKind;

    fn comm(rank: usize, size: usize) -> Communicator {
        Communicator::builder().rank(rank).size(size).build().unwrap()
    }

    fn region(size: usize) -> MemoryRegion {
        MemoryRegion::new(0x1000, size, StorageKind::System)
    }

    #[test]
    fn test_reduce_scatter_sizes() {
        let comm = comm(1, 3);
        let counts = [2, 3, 4];
        let sig = CollSignature::ReduceScatter {
            comm: &comm,
            sendbuf: SendBuffer::Region(region(72)),
            recvbuf: region(24),
            recvcounts: &counts,
            datatype: Datatype::FLOAT64,
            op: ReduceOp::SUM,
        };
        assert_eq!(sig.validate().unwrap(), BufferSizes { send: 72, recv: 24 });
        assert_eq!(sig.total_count(), 9);
        assert_eq!(sig.message_bytes(), 72);
        assert!(!sig.has_uniform_counts());

        let in_place = sig.with_buffers(SendBuffer::InPlace, region(72));
        assert_eq!(in_place.validate().unwrap(), BufferSizes { send: 0, recv: 72 });
    }

    #[test]
    fn test_undersized_buffers_are_rejected() {
        let comm = comm(0, 2);
        let sig = CollSignature::Allreduce {
            comm: &comm,
            sendbuf: SendBuffer::Region(region(16)),
            recvbuf: region(15),
            count: 4,
            datatype: Datatype::INT32,
            op: ReduceOp::SUM,
        };
        let err = sig.validate().unwrap_err();
        assert!(matches!(err, CollError::InvalidArgument { rank: 0, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_count_vector_must_match_group() {
        let comm = comm(0, 4);
        let counts = [1, 1, 1];
        let sig = CollSignature::ReduceScatter {
            comm: &comm,
            sendbuf: SendBuffer::Region(region(64)),
            recvbuf: region(64),
            recvcounts: &counts,
            datatype: Datatype::INT32,
            op: ReduceOp::SUM,
        };
        assert!(matches!(
            sig.validate(),
            Err(CollError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_in_place_on_inter_communicator() {
        let comm = Communicator::builder()
            .rank(0)
            .size(2)
            .kind(CommKind::Inter { remote_size: 3 })
            .build()
            .unwrap();
        let sig = CollSignature::Allreduce {
            comm: &comm,
            sendbuf: SendBuffer::InPlace,
            recvbuf: region(8),
            count: 2,
            datatype: Datatype::INT32,
            op: ReduceOp::SUM,
        };
        assert!(sig.validate().is_err());
    }
}
