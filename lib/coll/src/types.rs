// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Descriptors shared by signatures, selectors and algorithms.

use std::fmt;

pub use dynamo_coll_tree::Rank;

/// Collective operations handled by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollOp {
    Allreduce,
    ReduceScatter,
}

impl fmt::Display for CollOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollOp::Allreduce => write!(f, "allreduce"),
            CollOp::ReduceScatter => write!(f, "reduce_scatter"),
        }
    }
}

/// Shape of a communicator's group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CommKind {
    /// A single flat group.
    #[default]
    Intra,
    /// Two disjoint groups exchanging with each other. The local group size is
    /// the communicator size; `remote_size` is the size of the other group.
    Inter { remote_size: usize },
}

impl CommKind {
    pub fn is_intra(&self) -> bool {
        matches!(self, CommKind::Intra)
    }

    pub fn is_inter(&self) -> bool {
        matches!(self, CommKind::Inter { .. })
    }
}

impl fmt::Display for CommKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommKind::Intra => write!(f, "intra"),
            CommKind::Inter { remote_size } => write!(f, "inter(remote_size={remote_size})"),
        }
    }
}

/// Element type descriptor: only the extent matters at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Datatype {
    name: &'static str,
    extent: usize,
}

impl Datatype {
    pub const BYTE: Datatype = Datatype::new("byte", 1);
    pub const INT32: Datatype = Datatype::new("int32", 4);
    pub const INT64: Datatype = Datatype::new("int64", 8);
    pub const UINT64: Datatype = Datatype::new("uint64", 8);
    pub const FLOAT32: Datatype = Datatype::new("float32", 4);
    pub const FLOAT64: Datatype = Datatype::new("float64", 8);

    pub const fn new(name: &'static str, extent: usize) -> Self {
        Self { name, extent }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Size in bytes of one element.
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Size in bytes of `count` elements, `None` on overflow.
    pub fn bytes(&self, count: usize) -> Option<usize> {
        count.checked_mul(self.extent)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOpKind {
    Sum,
    Prod,
    Max,
    Min,
    Band,
    Bor,
    Bxor,
    /// User-defined operator, identified by the caller.
    User(u32),
}

/// Reduction operator descriptor.
///
/// Its semantics belong to the algorithms; the dispatcher only looks at
/// commutativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReduceOp {
    kind: ReduceOpKind,
    commutative: bool,
}

impl ReduceOp {
    pub const SUM: ReduceOp = ReduceOp::builtin(ReduceOpKind::Sum);
    pub const PROD: ReduceOp = ReduceOp::builtin(ReduceOpKind::Prod);
    pub const MAX: ReduceOp = ReduceOp::builtin(ReduceOpKind::Max);
    pub const MIN: ReduceOp = ReduceOp::builtin(ReduceOpKind::Min);
    pub const BAND: ReduceOp = ReduceOp::builtin(ReduceOpKind::Band);
    pub const BOR: ReduceOp = ReduceOp::builtin(ReduceOpKind::Bor);
    pub const BXOR: ReduceOp = ReduceOp::builtin(ReduceOpKind::Bxor);

    const fn builtin(kind: ReduceOpKind) -> Self {
        Self {
            kind,
            commutative: true,
        }
    }

    pub const fn user(id: u32, commutative: bool) -> Self {
        Self {
            kind: ReduceOpKind::User(id),
            commutative,
        }
    }

    pub fn kind(&self) -> ReduceOpKind {
        self.kind
    }

    pub fn is_commutative(&self) -> bool {
        self.commutative
    }
}
