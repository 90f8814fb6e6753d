// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Algorithm resolution.
//!
//! Resolution is a pure function of the signature and the communicator it
//! names. The order is fixed:
//!
//! 1. device-layer override, when configured for the operation;
//! 2. the manual choice for the operation and communicator kind, passed
//!    through the fallback policy if its constraints are not met;
//! 3. the communicator's automatic selector, whose answer must be eligible.

pub mod manual;
mod rules;

pub use rules::RuleSelector;

use std::fmt;

use dynamo_coll_config::FallbackMode;

use crate::algorithm::AlgorithmId;
use crate::error::{CollError, Ineligibility};
use crate::signature::CollSignature;
use crate::types::{CollOp, CommKind};

/// Automatic-mode strategy: signature → algorithm.
///
/// Implementations must be deterministic and depend only on facts every rank
/// agrees on. `None` is a miss and fails the call.
pub trait CollSelector: Send + Sync {
    fn select(&self, sig: &CollSignature<'_>) -> Option<AlgorithmId>;
}

/// How an algorithm was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Device,
    Manual,
    /// The manual choice was ineligible and replaced.
    Fallback,
    Automatic,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Device => write!(f, "device"),
            Resolution::Manual => write!(f, "manual"),
            Resolution::Fallback => write!(f, "fallback"),
            Resolution::Automatic => write!(f, "automatic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub algorithm: AlgorithmId,
    pub path: Resolution,
}

/// Check `algorithm` against the constraints of the call.
pub fn check_eligibility(
    algorithm: AlgorithmId,
    sig: &CollSignature<'_>,
) -> Result<(), Ineligibility> {
    let comm = sig.comm();

    if algorithm.op() != sig.op() {
        return Err(Ineligibility::WrongOperation);
    }
    if !algorithm.supports(comm.kind()) {
        return Err(Ineligibility::WrongCommKind);
    }
    if algorithm.reorders_operands() && !sig.is_commutative() {
        return Err(Ineligibility::NonCommutative);
    }
    match algorithm {
        AlgorithmId::AllreduceIntraSmp if !comm.is_node_aware() => {
            Err(Ineligibility::NotNodeAware)
        }
        AlgorithmId::ReduceScatterIntraNoncommutative if !comm.size().is_power_of_two() => {
            Err(Ineligibility::NotPowerOfTwo)
        }
        AlgorithmId::ReduceScatterIntraNoncommutative if !sig.has_uniform_counts() => {
            Err(Ineligibility::NonUniformCounts)
        }
        _ => Ok(()),
    }
}

/// The order-preserving algorithm used in place of an ineligible manual
/// choice.
pub fn order_preserving_fallback(sig: &CollSignature<'_>) -> AlgorithmId {
    match (sig.op(), sig.comm().kind()) {
        (CollOp::Allreduce, CommKind::Intra) => AlgorithmId::AllreduceIntraRecursiveDoubling,
        (CollOp::Allreduce, CommKind::Inter { .. }) => {
            AlgorithmId::AllreduceInterReduceExchangeBcast
        }
        (CollOp::ReduceScatter, CommKind::Intra) => {
            let candidate = AlgorithmId::ReduceScatterIntraNoncommutative;
            if check_eligibility(candidate, sig).is_ok() {
                candidate
            } else {
                AlgorithmId::ReduceScatterIntraRecursiveDoubling
            }
        }
        (CollOp::ReduceScatter, CommKind::Inter { .. }) => {
            AlgorithmId::ReduceScatterInterRemoteReduceLocalScatter
        }
    }
}

/// Resolve the algorithm for `sig`.
pub fn resolve(sig: &CollSignature<'_>) -> Result<Resolved, CollError> {
    let comm = sig.comm();
    let config = comm.config();
    let op = sig.op();

    let resolved = if manual::device_override(config, op) {
        Resolved {
            algorithm: AlgorithmId::device(op),
            path: Resolution::Device,
        }
    } else if let Some(algorithm) = manual::choice(config, op, comm.kind()) {
        match check_eligibility(algorithm, sig) {
            Ok(()) => Resolved {
                algorithm,
                path: Resolution::Manual,
            },
            Err(reason) => {
                let fallback = order_preserving_fallback(sig);
                match config.selection.fallback {
                    FallbackMode::Error => {
                        return Err(CollError::Ineligible {
                            algorithm,
                            op,
                            reason,
                        });
                    }
                    FallbackMode::Print => tracing::warn!(
                        rank = comm.rank(),
                        requested = %algorithm,
                        %reason,
                        %fallback,
                        "configured algorithm cannot be applied, using fallback"
                    ),
                    FallbackMode::Silent => {}
                }
                Resolved {
                    algorithm: fallback,
                    path: Resolution::Fallback,
                }
            }
        }
    } else {
        let miss = || CollError::SelectorMiss {
            op,
            kind: comm.kind(),
            size: comm.size(),
        };
        let algorithm = comm.selector().ok_or_else(miss)?.select(sig).ok_or_else(miss)?;
        check_eligibility(algorithm, sig).map_err(|reason| CollError::Ineligible {
            algorithm,
            op,
            reason,
        })?;
        Resolved {
            algorithm,
            path: Resolution::Automatic,
        }
    };

    tracing::debug!(
        rank = comm.rank(),
        %op,
        kind = %comm.kind(),
        size = comm.size(),
        algorithm = %resolved.algorithm,
        path = %resolved.path,
        "resolved collective algorithm"
    );

    Ok(resolved)
}
