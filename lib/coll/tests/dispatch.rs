// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end dispatch: staging transparency, copy-out, failure propagation
//! and release of staging memory.

use std::sync::Arc;

use dynamo_coll::{
    AlgorithmId, AlgorithmTable, CollError, CollSignature, Communicator, Datatype, Dispatcher,
    ErrorFlag, MemoryRegion, ReduceOp, SendBuffer, StorageKind, SystemMemory,
};
use parking_lot::Mutex;
use rstest::rstest;

/// Reduction over a single rank: the result is the rank's own input.
fn identity(sig: &CollSignature<'_>, _errflag: &mut ErrorFlag) -> anyhow::Result<()> {
    anyhow::ensure!(sig.comm().size() == 1);
    let sizes = sig.validate()?;
    if let SendBuffer::Region(send) = sig.sendbuf() {
        unsafe {
            let input = &send.as_slice()[..sizes.recv];
            sig.recvbuf().as_mut_slice()[..sizes.recv].copy_from_slice(input);
        }
    }
    Ok(())
}

fn identity_table() -> Arc<AlgorithmTable> {
    let table = AlgorithmId::ALL
        .into_iter()
        .fold(AlgorithmTable::builder(), |builder, id| {
            builder.register_fn(id, identity)
        })
        .build();
    Arc::new(table)
}

fn solo() -> Communicator {
    Communicator::builder().rank(0).size(1).build().unwrap()
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

fn tag(region: MemoryRegion, device: bool) -> MemoryRegion {
    if device {
        region.with_kind(StorageKind::Device(0))
    } else {
        region
    }
}

/// Run one all-reduce and return the receive buffer contents.
fn run_allreduce(
    dispatcher: &Dispatcher,
    input: &[u8],
    send_on_device: bool,
    recv_on_device: bool,
    in_place: bool,
) -> Vec<u8> {
    let comm = solo();
    let mut send = input.to_vec();
    let mut recv = if in_place {
        input.to_vec()
    } else {
        vec![0u8; input.len()]
    };

    let sendbuf = if in_place {
        SendBuffer::InPlace
    } else {
        SendBuffer::Region(tag(MemoryRegion::from_mut_slice(&mut send), send_on_device))
    };
    let recvbuf = tag(MemoryRegion::from_mut_slice(&mut recv), recv_on_device);

    let mut errflag = ErrorFlag::default();
    dispatcher
        .allreduce(
            &comm,
            sendbuf,
            recvbuf,
            input.len() / 8,
            Datatype::FLOAT64,
            ReduceOp::SUM,
            &mut errflag,
        )
        .unwrap();
    assert!(!errflag.is_raised());
    recv
}

#[rstest]
fn test_staged_allreduce_matches_unstaged(
    #[values(false, true)] send_on_device: bool,
    #[values(false, true)] recv_on_device: bool,
    #[values(false, true)] in_place: bool,
    #[values(0, 8, 4096)] len: usize,
) {
    let memory = Arc::new(SystemMemory::new());
    let dispatcher = Dispatcher::new(identity_table(), memory.clone());
    let input = pattern(len, 3);

    let unstaged = run_allreduce(&dispatcher, &input, false, false, in_place);
    let staged = run_allreduce(&dispatcher, &input, send_on_device, recv_on_device, in_place);

    assert_eq!(staged, unstaged);
    assert_eq!(staged, input);
    assert_eq!(memory.live_allocations(), 0);
}

#[test]
fn test_staged_reduce_scatter_matches_unstaged() {
    let memory = Arc::new(SystemMemory::new());
    let dispatcher = Dispatcher::new(identity_table(), memory.clone());
    let comm = solo();
    let input = pattern(96, 17);

    let mut results = Vec::new();
    for device in [false, true] {
        let mut send = input.clone();
        let mut recv = vec![0u8; 96];
        let mut errflag = ErrorFlag::default();
        dispatcher
            .reduce_scatter(
                &comm,
                SendBuffer::Region(tag(MemoryRegion::from_mut_slice(&mut send), device)),
                tag(MemoryRegion::from_mut_slice(&mut recv), device),
                &[24],
                Datatype::FLOAT32,
                ReduceOp::SUM,
                &mut errflag,
            )
            .unwrap();
        results.push(recv);
    }

    assert_eq!(results[0], results[1]);
    assert_eq!(results[1], input);
    assert_eq!(memory.live_allocations(), 0);
}

#[test]
fn test_copy_out_after_algorithm_failure() {
    let table = AlgorithmTable::builder()
        .register_fn(AlgorithmId::AllreduceIntraRecursiveDoubling, |sig, errflag| {
            unsafe { sig.recvbuf().as_mut_slice() }.fill(0xAB);
            errflag.raise(ErrorFlag::Recoverable);
            anyhow::bail!("peer 3 dropped out")
        })
        .build();
    let memory = Arc::new(SystemMemory::new());
    let dispatcher = Dispatcher::new(Arc::new(table), memory.clone());
    let comm = Communicator::builder().rank(1).size(4).build().unwrap();

    let mut recv = vec![0u8; 32];
    let mut errflag = ErrorFlag::default();
    let err = dispatcher
        .allreduce(
            &comm,
            SendBuffer::InPlace,
            tag(MemoryRegion::from_mut_slice(&mut recv), true),
            8,
            Datatype::INT32,
            ReduceOp::SUM,
            &mut errflag,
        )
        .unwrap_err();

    match &err {
        CollError::Algorithm {
            rank,
            algorithm,
            flag,
            source,
        } => {
            assert_eq!(*rank, 1);
            assert_eq!(*algorithm, AlgorithmId::AllreduceIntraRecursiveDoubling);
            assert_eq!(*flag, ErrorFlag::Recoverable);
            assert!(source.to_string().contains("peer 3"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(errflag, ErrorFlag::Recoverable);
    assert!(recv.iter().all(|&b| b == 0xAB));
    assert_eq!(memory.live_allocations(), 0);
}

#[rstest]
fn test_per_rank_failure_is_flagged_and_staging_released(#[values(0, 2, 4)] failing: usize) {
    let table = AlgorithmTable::builder()
        .register_fn(AlgorithmId::ReduceScatterIntraPairwise, move |sig, _| {
            anyhow::ensure!(sig.comm().rank() != failing, "transport fault");
            Ok(())
        })
        .build();
    let memory = Arc::new(SystemMemory::new());
    let dispatcher = Dispatcher::new(Arc::new(table), memory.clone());

    // 5 ranks × 40 000 floats per rank is past the long-message threshold
    let size = 5;
    let counts = vec![40_000; size];
    let mut flags = Vec::new();

    for rank in 0..size {
        let comm = Communicator::builder().rank(rank).size(size).build().unwrap();
        let mut send = vec![1u8; 40_000 * 4 * size];
        let mut recv = vec![0u8; 40_000 * 4];
        let mut errflag = ErrorFlag::default();

        let result = dispatcher.reduce_scatter(
            &comm,
            SendBuffer::Region(tag(MemoryRegion::from_mut_slice(&mut send), true)),
            tag(MemoryRegion::from_mut_slice(&mut recv), true),
            &counts,
            Datatype::FLOAT32,
            ReduceOp::SUM,
            &mut errflag,
        );

        assert_eq!(result.is_err(), rank == failing);
        assert_eq!(memory.live_allocations(), 0, "rank {rank} leaked staging memory");
        flags.push(errflag);
    }

    for (rank, flag) in flags.into_iter().enumerate() {
        let expected = if rank == failing {
            ErrorFlag::Recoverable
        } else {
            ErrorFlag::Clear
        };
        assert_eq!(flag, expected, "rank {rank}");
    }
}

#[test]
fn test_staging_pool_exhaustion() {
    let memory = Arc::new(SystemMemory::with_limit(1024));
    let dispatcher = Dispatcher::new(identity_table(), memory.clone());
    let comm = solo();

    let mut send = vec![0u8; 2048];
    let mut recv = vec![0u8; 2048];
    let mut errflag = ErrorFlag::default();
    let err = dispatcher
        .allreduce(
            &comm,
            SendBuffer::Region(tag(MemoryRegion::from_mut_slice(&mut send), true)),
            tag(MemoryRegion::from_mut_slice(&mut recv), true),
            512,
            Datatype::INT32,
            ReduceOp::SUM,
            &mut errflag,
        )
        .unwrap_err();

    assert!(matches!(
        err,
        CollError::Allocation {
            rank: 0,
            bytes: 2048,
            ..
        }
    ));
    assert!(!err.is_fatal());
    assert_eq!(errflag, ErrorFlag::Recoverable);
    assert_eq!(memory.live_allocations(), 0);
}

#[test]
fn test_invalid_arguments_allocate_nothing() {
    let memory = Arc::new(SystemMemory::new());
    let dispatcher = Dispatcher::new(identity_table(), memory.clone());
    let comm = Communicator::builder().rank(0).size(2).build().unwrap();

    let mut recv = vec![0u8; 4];
    let mut errflag = ErrorFlag::default();
    let err = dispatcher
        .reduce_scatter(
            &comm,
            SendBuffer::InPlace,
            tag(MemoryRegion::from_mut_slice(&mut recv), true),
            &[1, 1],
            Datatype::INT32,
            ReduceOp::SUM,
            &mut errflag,
        )
        .unwrap_err();

    assert!(matches!(err, CollError::InvalidArgument { .. }));
    assert_eq!(errflag, ErrorFlag::Fatal);
    assert_eq!(memory.live_allocations(), 0);
}

#[rstest]
#[case::earlier_failure_forwarded(ErrorFlag::Recoverable, ErrorFlag::Clear, false)]
#[case::raised_by_algorithm(ErrorFlag::Clear, ErrorFlag::Recoverable, true)]
#[case::escalated_by_algorithm(ErrorFlag::Recoverable, ErrorFlag::Fatal, true)]
#[case::same_severity(ErrorFlag::Fatal, ErrorFlag::Recoverable, false)]
fn test_errflag_is_threaded_through_algorithm(
    #[case] incoming: ErrorFlag,
    #[case] raised: ErrorFlag,
    #[case] flagged: bool,
) {
    let observed = Arc::new(Mutex::new(None));
    let seen = observed.clone();
    let table = AlgorithmTable::builder()
        .register_fn(AlgorithmId::AllreduceIntraRecursiveDoubling, move |_, flag| {
            *seen.lock() = Some(*flag);
            flag.raise(raised);
            Ok(())
        })
        .build();
    let dispatcher = Dispatcher::with_system_memory(Arc::new(table));
    let comm = Communicator::builder().rank(0).size(4).build().unwrap();

    let mut recv = vec![0u8; 16];
    let mut errflag = incoming;
    let result = dispatcher.allreduce(
        &comm,
        SendBuffer::InPlace,
        MemoryRegion::from_mut_slice(&mut recv),
        4,
        Datatype::INT32,
        ReduceOp::SUM,
        &mut errflag,
    );

    assert_eq!(*observed.lock(), Some(incoming));
    assert_eq!(errflag, incoming.max(raised));
    if flagged {
        match result.unwrap_err() {
            CollError::Flagged { flag, .. } => assert_eq!(flag, incoming.max(raised)),
            other => panic!("unexpected error: {other}"),
        }
    } else {
        assert_eq!(result.unwrap(), AlgorithmId::AllreduceIntraRecursiveDoubling);
    }
}
