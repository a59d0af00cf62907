// crates/cp_transform/tests/concurrency.rs

//! 并发访问操作缓存

mod common;

use common::{counted, service, shift, switchable, ScriptedEngine};
use cp_transform::prelude::*;
use std::sync::atomic::Ordering;

const THREADS: usize = 16;

#[test]
fn test_parallel_first_resolution_single_entry() {
    let service = TransformService::builtin().expect("service");

    let results: Vec<TransformResult> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let service = &service;
                // 不同写法的同一 CRS
                let source = ["EPSG:4326", "epsg:4326", "WGS84", "urn:ogc:def:crs:EPSG::4326"][i % 4];
                s.spawn(move || {
                    service
                        .transform_point(source, "EPSG:32631", 2.2945, 48.8584, None)
                        .expect("transform")
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("join")).collect()
    });

    assert_eq!(service.cache_len(), 1);
    let first = &results[0];
    for r in &results {
        assert_eq!(r.operation, first.operation);
        assert!((r.x - first.x).abs() < 1e-12);
        assert!((r.y - first.y).abs() < 1e-12);
    }
}

#[test]
fn test_parallel_resolution_queries_engine_once() {
    let (op, calls) = counted("only", Some(1.0), 1.0);
    let engine = ScriptedEngine::new()
        .with_crs(&[3001, 3002])
        .with_candidates(3001, 3002, vec![op]);
    let svc = service(engine, ServiceConfig::empty());

    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                svc.transform_point("EPSG:3001", "EPSG:3002", 0.0, 0.0, None)
                    .expect("transform");
            });
        }
    });

    assert_eq!(svc.cache_len(), 1);
    assert_eq!(svc.engine().candidate_queries(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), THREADS);
}

#[test]
fn test_parallel_eviction_converges() {
    let (flaky, broken) = switchable("flaky", Some(1.0), 1.0);
    let stable = shift("stable", Some(2.0), 2.0);
    let engine = ScriptedEngine::new()
        .with_crs(&[3001, 3002])
        .with_candidates(3001, 3002, vec![flaky, stable]);
    let svc = service(engine, ServiceConfig::empty());

    svc.transform_point("EPSG:3001", "EPSG:3002", 0.0, 0.0, None).expect("warm-up");
    broken.store(true, Ordering::SeqCst);

    let shared = &svc;
    let operations: Vec<Option<String>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(move || {
                    shared
                        .transform_point("EPSG:3001", "EPSG:3002", 0.0, 0.0, None)
                        .expect("transform")
                        .operation
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("join")).collect()
    });

    assert!(operations.iter().all(|op| op.as_deref() == Some("stable")));
    assert_eq!(svc.cache_len(), 1);

    // 收敛后不再重新解析
    let queries = svc.engine().candidate_queries();
    for _ in 0..4 {
        let r = svc.transform_point("EPSG:3001", "EPSG:3002", 0.0, 0.0, None).expect("transform");
        assert_eq!(r.operation.as_deref(), Some("stable"));
    }
    assert_eq!(svc.engine().candidate_queries(), queries);
}
