//! Property tests for the metrics parser

use gpuwatch_core::monitoring::MetricsParser;
use proptest::prelude::*;

fn arb_line() -> impl Strategy<Value = (u32, u64, u64, u8, String)> {
    (1u64..=200_000).prop_flat_map(|total| {
        (
            0u32..64,
            0u64..=total,
            Just(total),
            0u8..=100,
            "[A-Za-z][A-Za-z0-9 ,-]{0,30}[A-Za-z0-9]",
        )
    })
}

proptest! {
    /// Property: well-formed lines parse back to their fields
    #[test]
    fn well_formed_lines_parse(lines in prop::collection::vec(arb_line(), 0..8)) {
        let output: String = lines
            .iter()
            .map(|(i, used, total, util, model)| format!("{i}, {used}, {total}, {util}, {model}\n"))
            .collect();

        let metrics = MetricsParser::parse(&output).unwrap();
        prop_assert_eq!(metrics.len(), lines.len());
        for (metric, (i, used, total, util, model)) in metrics.iter().zip(&lines) {
            prop_assert_eq!(metric.index, *i);
            prop_assert_eq!(metric.memory_used, *used);
            prop_assert_eq!(metric.memory_total, *total);
            prop_assert_eq!(metric.utilization, *util);
            prop_assert_eq!(&metric.model, model);
        }
    }

    /// Property: a non-integer numeric field rejects the whole output
    #[test]
    fn malformed_numeric_field_rejected(
        field in 0usize..4,
        junk in "[A-Za-z_%\\[\\]/.-]{1,8}",
        prefix in prop::collection::vec(arb_line(), 0..4),
    ) {
        let mut values = vec!["0".to_string(), "10".to_string(), "100".to_string(), "5".to_string()];
        values[field] = junk;
        let bad = format!("{}, Tesla T4", values.join(", "));

        let mut output: String = prefix
            .iter()
            .map(|(i, used, total, util, model)| format!("{i}, {used}, {total}, {util}, {model}\n"))
            .collect();
        output.push_str(&bad);

        let err = MetricsParser::parse(&output).unwrap_err();
        prop_assert_eq!(err.line_number, prefix.len() + 1);
        prop_assert_eq!(err.line, bad);
    }

    /// Property: the parser never panics on arbitrary input
    #[test]
    fn parse_never_panics(input in ".{0,200}") {
        let _ = MetricsParser::parse(&input);
    }
}
