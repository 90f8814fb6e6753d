// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Resolution must be identical on every rank and must never hand a
//! non-commutative reduction to an algorithm that reorders operands.

use std::sync::Arc;

use dynamo_coll::select::{manual, resolve};
use dynamo_coll::{
    AlgorithmId, CollConfig, CollSignature, CommKind, Communicator, Datatype, MemoryRegion,
    ReduceOp, Resolution, SendBuffer, StorageKind,
};
use dynamo_coll_config::{AllreduceIntraAlgorithm, FallbackMode, ReduceScatterIntraAlgorithm};
use rstest::rstest;

const BIG: usize = 1 << 30;

fn region(kind: StorageKind) -> MemoryRegion {
    MemoryRegion::new(0x10_0000, BIG, kind)
}

fn comm(rank: usize, size: usize, node_aware: bool, config: &CollConfig) -> Communicator {
    Communicator::builder()
        .rank(rank)
        .size(size)
        .node_aware(node_aware)
        .config(Arc::new(config.clone()))
        .build()
        .unwrap()
}

fn allreduce(
    comm: &Communicator,
    count: usize,
    datatype: Datatype,
    op: ReduceOp,
) -> CollSignature<'_> {
    CollSignature::Allreduce {
        comm,
        sendbuf: SendBuffer::Region(region(StorageKind::System)),
        recvbuf: region(StorageKind::System),
        count,
        datatype,
        op,
    }
}

fn reduce_scatter<'a>(
    comm: &'a Communicator,
    counts: &'a [usize],
    sendbuf: SendBuffer,
    op: ReduceOp,
) -> CollSignature<'a> {
    CollSignature::ReduceScatter {
        comm,
        sendbuf,
        recvbuf: region(StorageKind::Device(0)),
        recvcounts: counts,
        datatype: Datatype::FLOAT32,
        op,
    }
}

#[rstest]
fn test_manual_allreduce_ignores_signature_contents(
    #[values(
        AllreduceIntraAlgorithm::RecursiveDoubling,
        AllreduceIntraAlgorithm::ReduceScatterAllgather,
        AllreduceIntraAlgorithm::Smp,
        AllreduceIntraAlgorithm::Nb
    )]
    choice: AllreduceIntraAlgorithm,
    #[values(1, 6, 8)] size: usize,
) {
    let mut config = CollConfig::default();
    config.allreduce.intra_algorithm = choice;
    config.selection.fallback = FallbackMode::Error;
    let expected = manual::allreduce_intra(choice).unwrap();

    for rank in 0..size {
        let comm = comm(rank, size, true, &config);
        for count in [0, 1, 7, 1 << 20] {
            for datatype in [Datatype::BYTE, Datatype::FLOAT64] {
                for op in [ReduceOp::SUM, ReduceOp::MAX, ReduceOp::user(4, true)] {
                    let resolved = resolve(&allreduce(&comm, count, datatype, op)).unwrap();
                    assert_eq!(resolved.algorithm, expected);
                    assert_eq!(resolved.path, Resolution::Manual);
                }
            }
        }
    }
}

#[rstest]
fn test_manual_reduce_scatter_ignores_signature_contents(
    #[values(
        ReduceScatterIntraAlgorithm::Noncommutative,
        ReduceScatterIntraAlgorithm::Pairwise,
        ReduceScatterIntraAlgorithm::RecursiveHalving,
        ReduceScatterIntraAlgorithm::RecursiveDoubling,
        ReduceScatterIntraAlgorithm::Nb
    )]
    choice: ReduceScatterIntraAlgorithm,
) {
    let mut config = CollConfig::default();
    config.reduce_scatter.intra_algorithm = choice;
    config.selection.fallback = FallbackMode::Error;
    let expected = manual::reduce_scatter_intra(choice).unwrap();

    let comm = comm(2, 4, false, &config);
    for count in [0, 3, 4096] {
        let counts = [count; 4];
        for sendbuf in [SendBuffer::InPlace, SendBuffer::Region(region(StorageKind::System))] {
            let sig = reduce_scatter(&comm, &counts, sendbuf, ReduceOp::SUM);
            let resolved = resolve(&sig).unwrap();
            assert_eq!(resolved.algorithm, expected);
        }
    }
}

#[rstest]
fn test_automatic_choice_agrees_across_ranks(
    #[values(1, 2, 3, 8, 12)] size: usize,
    #[values(false, true)] node_aware: bool,
    #[values(0, 1, 100, 513, 100_000)] count: usize,
    #[values(ReduceOp::SUM, ReduceOp::user(7, false))] op: ReduceOp,
) {
    let config = CollConfig::default();
    let counts = vec![count; size];

    let reference = comm(0, size, node_aware, &config);
    let expected_allreduce = resolve(&allreduce(&reference, count, Datatype::FLOAT32, op)).unwrap();
    let expected_rs =
        resolve(&reduce_scatter(&reference, &counts, SendBuffer::InPlace, op)).unwrap();
    assert_eq!(expected_allreduce.path, Resolution::Automatic);

    for rank in 0..size {
        let comm = comm(rank, size, node_aware, &config);
        for _ in 0..3 {
            assert_eq!(
                resolve(&allreduce(&comm, count, Datatype::FLOAT32, op)).unwrap(),
                expected_allreduce
            );
            assert_eq!(
                resolve(&reduce_scatter(&comm, &counts, SendBuffer::InPlace, op)).unwrap(),
                expected_rs
            );
        }
    }
}

#[rstest]
fn test_noncommutative_reduce_scatter_keeps_operand_order(
    #[values(
        ReduceScatterIntraAlgorithm::Auto,
        ReduceScatterIntraAlgorithm::Noncommutative,
        ReduceScatterIntraAlgorithm::Pairwise,
        ReduceScatterIntraAlgorithm::RecursiveHalving,
        ReduceScatterIntraAlgorithm::RecursiveDoubling,
        ReduceScatterIntraAlgorithm::Nb
    )]
    choice: ReduceScatterIntraAlgorithm,
    #[values(FallbackMode::Print, FallbackMode::Silent)] fallback: FallbackMode,
    #[values(1, 2, 5, 8, 16)] size: usize,
    #[values(false, true)] uniform: bool,
) {
    let mut config = CollConfig::default();
    config.reduce_scatter.intra_algorithm = choice;
    config.selection.fallback = fallback;

    let counts: Vec<usize> = (0..size)
        .map(|i| if uniform { 1024 } else { 1024 + i })
        .collect();
    let noncomm = ReduceOp::user(11, false);

    for rank in 0..size {
        let comm = comm(rank, size, false, &config);
        let sig = reduce_scatter(&comm, &counts, SendBuffer::InPlace, noncomm);
        let resolved = resolve(&sig).unwrap();
        assert!(
            !resolved.algorithm.reorders_operands(),
            "{choice:?} resolved to {}",
            resolved.algorithm
        );
        assert_ne!(resolved.algorithm, AlgorithmId::ReduceScatterIntraPairwise);
        assert_ne!(resolved.algorithm, AlgorithmId::ReduceScatterIntraRecursiveHalving);
    }
}

#[rstest]
fn test_inter_communicators_use_inter_algorithms(#[values(1, 3, 4)] size: usize) {
    let config = CollConfig::default();
    for rank in 0..size {
        let comm = Communicator::builder()
            .rank(rank)
            .size(size)
            .kind(CommKind::Inter { remote_size: 2 })
            .config(Arc::new(config.clone()))
            .build()
            .unwrap();
        let counts = vec![2; size];
        let sendbuf = SendBuffer::Region(region(StorageKind::System));

        assert_eq!(
            resolve(&allreduce(&comm, 10, Datatype::INT32, ReduceOp::SUM))
                .unwrap()
                .algorithm,
            AlgorithmId::AllreduceInterReduceExchangeBcast
        );
        assert_eq!(
            resolve(&reduce_scatter(&comm, &counts, sendbuf, ReduceOp::user(1, false)))
                .unwrap()
                .algorithm,
            AlgorithmId::ReduceScatterInterRemoteReduceLocalScatter
        );
    }
}
