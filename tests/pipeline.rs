use std::collections::BTreeMap;
use std::path::PathBuf;

use foodclub_logit::affinity::AffinityTables;
use foodclub_logit::coefficients::{CoefficientTables, FittedCoefficients};
use foodclub_logit::design_matrix::{DesignSpec, Feature, build_design_matrix};
use foodclub_logit::estimator::{ChoiceEstimator, ConditionalLogit};
use foodclub_logit::history::{assemble_history, load_raw_rounds};
use foodclub_logit::long_format::{LongFormatRow, POSITION_FACTORS, expand_long_format};
use foodclub_logit::render::{CoefficientRenderer, default_renderers};
use foodclub_logit::round_record::ArenaOutcome;

fn wide_fixture() -> Vec<ArenaOutcome> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("rounds");
    let rounds = load_raw_rounds(&path).expect("fixture rounds should load");
    assemble_history(&rounds, AffinityTables::standard()).expect("fixture history")
}

fn by_match(rows: &[LongFormatRow]) -> BTreeMap<u64, Vec<&LongFormatRow>> {
    let mut out: BTreeMap<u64, Vec<&LongFormatRow>> = BTreeMap::new();
    for row in rows {
        out.entry(row.match_id).or_default().push(row);
    }
    out
}

#[test]
fn long_format_has_four_rows_per_match() {
    let wide = wide_fixture();
    let long = expand_long_format(&wide).unwrap();
    assert_eq!(long.len(), wide.len() * 4);

    for (match_id, rows) in by_match(&long) {
        assert_eq!(rows.len(), 4, "match {match_id}");
        for k in 1..=4u8 {
            let count: u8 = rows.iter().map(|r| r.is_pos(k)).sum();
            assert_eq!(count, 1, "match {match_id} position {k}");
        }
        let wins: u8 = rows.iter().map(|r| r.win).sum();
        assert_eq!(wins, 1, "match {match_id}");
        for row in rows {
            assert_eq!(
                row.position_factor,
                POSITION_FACTORS[usize::from(row.position) - 1]
            );
        }
    }
}

#[test]
fn long_format_preserves_wide_order() {
    let wide = wide_fixture();
    let long = expand_long_format(&wide).unwrap();
    for (chunk, outcome) in long.chunks(4).zip(&wide) {
        let positions: Vec<u8> = chunk.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert!(chunk.iter().all(|r| r.match_id == outcome.match_id()));
    }
}

#[test]
fn grouping_long_rows_recovers_wide_rows() {
    let wide = wide_fixture();
    let long = expand_long_format(&wide).unwrap();
    let groups = by_match(&long);

    for outcome in &wide {
        let mut rows = groups[&outcome.match_id()].clone();
        // Order within a group is not part of the contract.
        rows.reverse();
        rows.sort_by_key(|r| r.position);

        let pirates: Vec<u8> = rows.iter().map(|r| r.pirate).collect();
        assert_eq!(pirates, outcome.pirates.to_vec());
        for (idx, row) in rows.iter().enumerate() {
            assert_eq!(row.opening_odds, outcome.opening_odds[idx]);
            assert_eq!(row.closing_odds, outcome.closing_odds[idx]);
            assert_eq!(row.fa, outcome.adjustments[idx].fa);
            assert_eq!(row.pfa, outcome.adjustments[idx].pfa);
            assert_eq!(row.nfa, outcome.adjustments[idx].nfa);
        }
        let winner = rows.iter().find(|r| r.win == 1).map(|r| r.position);
        assert_eq!(winner, Some(outcome.winner));
    }
}

#[test]
fn design_rows_have_one_nonzero_per_block() {
    let long = expand_long_format(&wide_fixture()).unwrap();
    let spec = DesignSpec::default();
    let matrix = build_design_matrix(&long, &spec).unwrap();
    assert_eq!(matrix.n_rows(), long.len());
    assert_eq!(matrix.n_cols(), 119);

    for (r, row) in long.iter().enumerate() {
        let values = matrix.row(r);
        let mut offset = 0;
        for feature in Feature::ALL {
            let width = spec.pirates_for(feature).len();
            let block = &values[offset..offset + width];
            let expected_col = spec
                .pirates_for(feature)
                .iter()
                .position(|p| *p == row.pirate);
            for (c, v) in block.iter().enumerate() {
                if Some(c) != expected_col {
                    assert_eq!(*v, 0.0, "row {r} {feature:?} column {c}");
                }
            }
            if feature == Feature::Asc {
                assert_eq!(expected_col.is_none(), row.pirate == spec.baseline());
            }
            offset += width;
        }
        assert_eq!(matrix.response[r], row.win);
        assert_eq!(matrix.match_ids[r], row.match_id);
        assert_eq!(matrix.alternatives[r], row.pirate);
    }
}

#[test]
fn fit_to_rendered_tables_end_to_end() {
    let long = expand_long_format(&wide_fixture()).unwrap();
    let spec = DesignSpec::default();
    let matrix = build_design_matrix(&long, &spec).unwrap();

    let fit = ConditionalLogit::with_max_iters(200).fit(&matrix).unwrap();
    assert_eq!(fit.coefficients.len(), 119);
    assert!(fit.log_likelihood >= fit.null_log_likelihood);

    let fitted = FittedCoefficients::from_fit(&fit, &spec);
    let reloaded: FittedCoefficients =
        serde_json::from_str(&serde_json::to_string(&fitted).unwrap()).unwrap();
    let tables = reloaded.to_tables().unwrap();
    assert_eq!(
        tables,
        CoefficientTables::from_flat(&fit.coefficients, &spec).unwrap()
    );
    assert_eq!(tables.intercepts[14], 0.0);

    for renderer in default_renderers() {
        let text = renderer.render(&tables);
        assert!(!text.is_empty(), "{}", renderer.language());
        assert!(text.contains("LOGIT_IS_POS4"));
    }
}
