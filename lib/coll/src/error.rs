// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use thiserror::Error;

use crate::algorithm::AlgorithmId;
use crate::memory::StorageError;
use crate::types::{CollOp, CommKind, Rank};

/// Tri-state status threaded through every collective call.
///
/// Ordered by severity; [`ErrorFlag::raise`] only ever moves it upwards, so a
/// later success can never mask an earlier failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorFlag {
    #[default]
    Clear,
    /// A local failure: this rank's result is invalid but it still completed
    /// its part of the collective.
    Recoverable,
    Fatal,
}

impl ErrorFlag {
    pub fn raise(&mut self, other: ErrorFlag) {
        *self = (*self).max(other);
    }

    pub fn is_raised(&self) -> bool {
        *self != ErrorFlag::Clear
    }
}

impl fmt::Display for ErrorFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorFlag::Clear => write!(f, "clear"),
            ErrorFlag::Recoverable => write!(f, "recoverable"),
            ErrorFlag::Fatal => write!(f, "fatal"),
        }
    }
}

/// Constraint an algorithm places on the operation it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    /// The algorithm implements a different collective.
    WrongOperation,
    /// The algorithm targets the other communicator kind.
    WrongCommKind,
    /// The algorithm reorders operands and the operator is not commutative.
    NonCommutative,
    /// The algorithm needs node topology the communicator does not have.
    NotNodeAware,
    /// The algorithm needs a power-of-two group size.
    NotPowerOfTwo,
    /// The algorithm needs every rank to receive the same count.
    NonUniformCounts,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Ineligibility::WrongOperation => "implements a different collective",
            Ineligibility::WrongCommKind => "does not support this communicator kind",
            Ineligibility::NonCommutative => "reorders operands of a non-commutative operator",
            Ineligibility::NotNodeAware => "requires a node-aware communicator",
            Ineligibility::NotPowerOfTwo => "requires a power-of-two group size",
            Ineligibility::NonUniformCounts => "requires uniform receive counts",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error)]
pub enum CollError {
    #[error("{algorithm} has no entry in the algorithm table")]
    Unmapped { algorithm: AlgorithmId },

    #[error("selector has no algorithm for {op} on a {kind} communicator of size {size}")]
    SelectorMiss {
        op: CollOp,
        kind: CommKind,
        size: usize,
    },

    #[error("{algorithm} cannot run {op}: {reason}")]
    Ineligible {
        algorithm: AlgorithmId,
        op: CollOp,
        reason: Ineligibility,
    },

    #[error("invalid {op} arguments on rank {rank}: {reason}")]
    InvalidArgument {
        op: CollOp,
        rank: Rank,
        reason: String,
    },

    #[error("failed to allocate {bytes} byte {buffer} staging buffer on rank {rank}")]
    Allocation {
        rank: Rank,
        buffer: &'static str,
        bytes: usize,
        #[source]
        source: StorageError,
    },

    #[error("failed to stage {buffer} buffer on rank {rank}")]
    Staging {
        rank: Rank,
        buffer: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("{algorithm} failed on rank {rank}")]
    Algorithm {
        rank: Rank,
        algorithm: AlgorithmId,
        flag: ErrorFlag,
        #[source]
        source: anyhow::Error,
    },

    #[error("{algorithm} completed on rank {rank} with a {flag} error flag")]
    Flagged {
        rank: Rank,
        algorithm: AlgorithmId,
        flag: ErrorFlag,
    },
}

impl CollError {
    /// Severity this error contributes to the caller's [`ErrorFlag`].
    pub fn flag(&self) -> ErrorFlag {
        match self {
            CollError::Unmapped { .. }
            | CollError::SelectorMiss { .. }
            | CollError::Ineligible { .. }
            | CollError::InvalidArgument { .. } => ErrorFlag::Fatal,
            CollError::Allocation { .. } | CollError::Staging { .. } => ErrorFlag::Recoverable,
            CollError::Algorithm { flag, .. } | CollError::Flagged { flag, .. } => {
                (*flag).max(ErrorFlag::Recoverable)
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.flag() == ErrorFlag::Fatal
    }
}
