// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Collective algorithm dispatch.
//!
//! Every rank of a [`Communicator`] calls the same [`Dispatcher`] entry point.
//! The dispatcher resolves one [`AlgorithmId`] from globally agreed facts
//! (operation, communicator shape, operator commutativity, configuration),
//! stages device-resident buffers through host memory when needed, and
//! invokes the algorithm registered under that id in its [`AlgorithmTable`].
//!
//! Algorithm bodies are external: they are registered by identifier and may use
//! [`Communicator::tree`] to obtain their communication pattern.

pub mod algorithm;
pub mod comm;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod select;
pub mod signature;
pub mod staging;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use algorithm::{AlgorithmId, AlgorithmTable, AlgorithmTableBuilder, CollAlgorithm};
pub use comm::{Communicator, CommunicatorBuilder, CommunicatorBuilderError};
pub use dispatch::Dispatcher;
pub use error::{CollError, ErrorFlag, Ineligibility};
pub use memory::{DeviceMemory, MemoryRegion, StorageError, StorageKind, SystemMemory};
pub use select::{CollSelector, Resolution, Resolved, RuleSelector};
pub use signature::{BufferSizes, CollSignature, SendBuffer};
pub use staging::{StagedBuffers, StagingAdapter};
pub use types::{CollOp, CommKind, Datatype, Rank, ReduceOp, ReduceOpKind};

pub use dynamo_coll_config::CollConfig;
pub use dynamo_coll_tree::{Tree, TreeError, TreeType};
