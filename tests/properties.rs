//! End-to-end behaviour of the memory and the radius optimizers.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sdm_swarm::diagnostics::run_memory_test;
use sdm_swarm::{
    BitVector, EngineConfig, MemoryEngine, PerformanceMetric, RadiusOptimizer, RadiusRange,
    SearchStrategy, SearchTrace, SwarmConfig, SwarmMode, SwarmRadiusOptimizer,
};

fn recall_after(engine: &mut MemoryEngine, pattern: &BitVector, writes: usize) -> f64 {
    for _ in 0..writes {
        engine.write(pattern).unwrap();
    }
    engine.read(pattern).unwrap().output.match_ratio(pattern).unwrap()
}

#[test]
fn test_fresh_engine_reads_zero() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for dim in [8, 32, 100] {
        let config = EngineConfig::new(dim, 300, dim / 2).with_sparsity(0.5).with_seed(dim as u64);
        let mut engine = MemoryEngine::new(&config).unwrap();
        for _ in 0..5 {
            let query = BitVector::random_dense(dim, &mut rng);
            let result = engine.read(&query).unwrap();
            assert_eq!(result.output, BitVector::zeros(dim), "dim {}", dim);
            assert_eq!(result.confidence, 0.0);
        }
    }
}

#[test]
fn test_reinforcement_is_monotone() {
    let config = EngineConfig::new(32, 3000, 18).with_seed(21);
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let pattern = BitVector::random_sparse(32, 1, &mut rng);

    let ratios: Vec<f64> = [1, 5, 30]
        .iter()
        .map(|&n| {
            let mut engine = MemoryEngine::new(&config).unwrap();
            recall_after(&mut engine, &pattern, n)
        })
        .collect();

    assert!(ratios.windows(2).all(|w| w[0] <= w[1]), "Ratios {:?}", ratios);
    assert!(ratios[2] > 0.9, "Plateau near 1.0, got {}", ratios[2]);
}

#[test]
fn test_sparse_pattern_regression() {
    let config = EngineConfig::new(32, 3000, 18).with_sparsity(0.03).with_seed(0);
    for seed in 0..5 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let report = run_memory_test(&config, 30, &mut rng).unwrap();
        assert!(
            report.summary.match_ratio > 0.9,
            "seed {} gave {}",
            seed,
            report.summary.match_ratio
        );
    }
}

#[test]
fn test_activation_monotone_in_radius() {
    let config = EngineConfig::new(24, 500, 0).with_sparsity(0.5).with_seed(8);
    let mut engine = MemoryEngine::new(&config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let query = BitVector::random_dense(24, &mut rng);

    let mut previous = 0;
    for radius in 0..=24 {
        engine.set_access_radius(radius).unwrap();
        let count = engine.activation_count(&query).unwrap();
        assert!(count >= previous, "radius {}: {} < {}", radius, count, previous);
        previous = count;
    }
    assert_eq!(previous, 500);
}

#[test]
fn test_radius_zero_misses_nearby_queries() {
    let config = EngineConfig::new(32, 1000, 0).with_sparsity(0.5).with_seed(4);
    let mut engine = MemoryEngine::new(&config).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let pattern = BitVector::random_dense(32, &mut rng);
    engine.write(&pattern).unwrap();

    let mut bits = pattern.bits().to_vec();
    bits[0] ^= 1;
    let query = BitVector::from_bits(bits).unwrap();
    assert_eq!(
        engine.activation_count(&query).unwrap(),
        0,
        "No address equals the one-bit-off query"
    );
    let result = engine.read(&query).unwrap();
    assert!(result.is_miss());
    assert_eq!(result.output, BitVector::zeros(32));
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_exhaustive_search_is_deterministic() {
    let config = EngineConfig::new(32, 800, 8).with_seed(5);
    let patterns = vec![
        BitVector::from_indices(32, &[1, 30]).unwrap(),
        BitVector::from_indices(32, &[12]).unwrap(),
    ];

    let run = || {
        let mut engine = MemoryEngine::new(&config).unwrap();
        RadiusOptimizer::new(SearchStrategy::Exhaustive)
            .optimize(&mut engine, &patterns, PerformanceMetric::MatchRatio, None)
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.radius, b.radius);
    assert_eq!(a.score, b.score);
    assert_eq!(a.trace, b.trace);
}

#[test]
fn test_every_strategy_stays_in_range() {
    let range = RadiusRange::new(2, 12);
    let patterns = vec![BitVector::from_indices(32, &[4, 5]).unwrap()];
    for strategy in [
        SearchStrategy::Exhaustive,
        SearchStrategy::evolutionary(),
        SearchStrategy::gradient_ascent(),
    ] {
        for metric in PerformanceMetric::ALL {
            let mut engine = MemoryEngine::new(&EngineConfig::new(32, 200, 8).with_seed(6)).unwrap();
            let result = RadiusOptimizer::with_seed(strategy, 6)
                .optimize(&mut engine, &patterns, metric, Some(range))
                .unwrap();
            assert!(
                range.contains(result.radius),
                "{} / {} gave {}",
                strategy.name(),
                metric,
                result.radius
            );
            assert_eq!(engine.access_radius(), 8, "Optimizing leaves the radius alone");
        }
    }
}

#[test]
fn test_swarm_terminates_in_union_of_ranges() {
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let patterns: Vec<BitVector> = (0..3)
        .map(|_| BitVector::random_sparse(32, 2, &mut rng))
        .collect();

    for mode in [SwarmMode::Consensus, SwarmMode::Hierarchical, SwarmMode::Independent] {
        let mut agents: Vec<MemoryEngine> = (0..7)
            .map(|i| {
                let sparsity = if i % 2 == 0 { 0.03 } else { 0.5 };
                let config = EngineConfig::new(32, 300, 8)
                    .with_sparsity(sparsity)
                    .with_label_seed(&format!("agent-{}", i));
                MemoryEngine::new(&config).unwrap()
            })
            .collect();

        let config = SwarmConfig {
            mode,
            max_iterations: 4,
            ..SwarmConfig::default()
        };
        let result = SwarmRadiusOptimizer::new(config)
            .optimize_across_swarm(&mut agents, &patterns, PerformanceMetric::MatchRatio)
            .unwrap();

        assert!(RadiusRange::default_for(32).contains(result.radius), "{:?}", mode);
        match result.trace {
            SearchTrace::Consensus { iterations, proposals, .. } => {
                assert!(iterations <= 4);
                assert_eq!(proposals.len(), 7);
            }
            SearchTrace::Hierarchical { iterations, cluster_radii, .. } => {
                assert!(iterations <= 4);
                // max(3, 7 / 3) = 3 agents per cluster
                assert_eq!(cluster_radii.len(), 3);
            }
            SearchTrace::Independent { radii } => assert_eq!(radii.len(), 7),
            other => panic!("Unexpected trace {:?}", other),
        }
    }
}
