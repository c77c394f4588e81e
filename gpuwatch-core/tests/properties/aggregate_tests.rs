//! Property tests for fleet aggregation

use gpuwatch_core::monitoring::{FleetSnapshot, GpuMetric, host_stats, summarize};
use proptest::prelude::*;

fn arb_gpu() -> impl Strategy<Value = GpuMetric> {
    (0u32..16, 0u64..=100_000, 0u8..=100, "[A-Za-z0-9 -]{1,24}").prop_flat_map(
        |(index, total, utilization, model)| {
            (0u64..=total).prop_map(move |used| GpuMetric {
                index,
                memory_used: used,
                memory_total: total,
                utilization,
                model: model.clone(),
            })
        },
    )
}

fn arb_snapshot() -> impl Strategy<Value = FleetSnapshot> {
    prop::collection::btree_map("[a-z][a-z0-9-]{0,10}", prop::collection::vec(arb_gpu(), 0..6), 0..8)
        .prop_map(|hosts| {
            let mut snapshot = FleetSnapshot::new();
            for (alias, gpus) in hosts {
                snapshot.insert_success(alias, gpus);
            }
            snapshot
        })
}

proptest! {
    /// Property: summarizing never panics, whatever the threshold
    #[test]
    fn summarize_never_panics(
        snapshot in arb_snapshot(),
        threshold in prop_oneof![any::<f64>(), 0.0f64..=100.0],
    ) {
        let _ = summarize(&snapshot, threshold);
    }

    /// Property: the same snapshot always yields the same summary
    #[test]
    fn summarize_is_idempotent(snapshot in arb_snapshot(), threshold in 0.0f64..=100.0) {
        prop_assert_eq!(summarize(&snapshot, threshold), summarize(&snapshot, threshold));
    }

    /// Property: means are present iff at least one accelerator exists
    #[test]
    fn means_present_iff_metrics_exist(snapshot in arb_snapshot()) {
        let summary = summarize(&snapshot, 5.0);
        prop_assert_eq!(summary.means.is_some(), snapshot.metrics().next().is_some());
    }

    /// Property: means stay within the observed bounds
    #[test]
    fn means_are_bounded(snapshot in arb_snapshot()) {
        if let Some(means) = summarize(&snapshot, 5.0).means {
            let max_total = snapshot.metrics().map(|g| g.memory_total).max().unwrap_or(0) as f64;
            prop_assert!(means.mean_utilization >= 0.0 && means.mean_utilization <= 100.0);
            prop_assert!(means.mean_memory_used <= means.mean_memory_total + 1e-6);
            prop_assert!(means.mean_memory_total <= max_total + 1e-6);
        }
    }

    /// Property: idle reports are sorted, unique and well-formed
    #[test]
    fn idle_reports_are_consistent(snapshot in arb_snapshot(), threshold in 0.0f64..=100.0) {
        let summary = summarize(&snapshot, threshold);

        for pair in summary.idle.windows(2) {
            prop_assert!(pair[0].host < pair[1].host);
        }
        for report in &summary.idle {
            prop_assert!(report.idle_count >= 1);
            prop_assert!(report.idle_count <= report.total_count);
            let gpus = snapshot.get(&report.host).unwrap();
            prop_assert!(report.total_count <= gpus.len());
            prop_assert!(gpus.iter().any(|g| g.model == report.model));
        }
    }

    /// Property: a zero threshold never marks anything idle
    #[test]
    fn zero_threshold_has_no_idle(snapshot in arb_snapshot()) {
        prop_assert!(summarize(&snapshot, 0.0).idle.is_empty());
    }

    /// Property: host stats exist iff the host has accelerators
    #[test]
    fn host_stats_match_device_count(gpus in prop::collection::vec(arb_gpu(), 0..8)) {
        match host_stats(&gpus) {
            Some(stats) => {
                prop_assert_eq!(stats.gpu_count, gpus.len());
                prop_assert!(stats.memory_used <= stats.memory_total);
            }
            None => prop_assert!(gpus.is_empty()),
        }
    }
}
