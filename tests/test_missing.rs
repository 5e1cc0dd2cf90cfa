//! Tests for missing value substitution and interpolation

use varflow::pipeline::{
    interpolate_missing, resolve_missing, substitute_missing, ErrorKind, MissingMethod,
    PipelineError, Value, Variable,
};

#[path = "common/mod.rs"]
mod common;

use common::{assert_close, column_values, numeric_rows, reference_rows, row};

fn with_method(method: MissingMethod) -> Vec<Variable> {
    vec![
        Variable::new("ref"),
        Variable::new("target").with_missing_method(method, Some("ref")),
    ]
}

#[test]
fn test_substitution_uses_loose_equality() {
    let columns = vec![Variable::new("code").with_missing_values(vec![Value::Number(-99.0)])];
    let mut rows = vec![
        row([("code", Value::Number(-99.0))]),
        row([("code", Value::from("-99"))]),
        row([("code", Value::from(" -99 "))]),
        row([("code", Value::Number(7.0))]),
    ];

    let replaced = substitute_missing(&columns, &mut rows);

    assert_eq!(replaced, 3);
    assert!(rows[0]["code"].is_absent());
    assert!(rows[1]["code"].is_absent());
    assert!(rows[2]["code"].is_absent());
    assert_eq!(rows[3]["code"], Value::Number(7.0));
}

#[test]
fn test_text_missing_code_matches_numbers() {
    let columns = vec![Variable::new("code").with_missing_values(vec![Value::from("0")])];
    let mut rows = vec![row([("code", Value::Number(0.0))]), row([("code", Value::from(""))])];

    substitute_missing(&columns, &mut rows);

    assert!(rows[0]["code"].is_absent());
    assert_eq!(rows[1]["code"], Value::from(""), "empty text is not zero");
}

#[test]
fn test_mean_and_median_fill() {
    let values = [Some(1.0), None, Some(2.0), Some(9.0)];

    let columns = vec![Variable::new("x").with_missing_method(MissingMethod::Mean, None)];
    let (_, rows) = resolve_missing(&columns, numeric_rows("x", &values)).unwrap();
    assert_close(column_values(&rows, "x")[1].unwrap(), 4.0);

    let columns = vec![Variable::new("x").with_missing_method(MissingMethod::Median, None)];
    let (_, rows) = resolve_missing(&columns, numeric_rows("x", &values)).unwrap();
    assert_close(column_values(&rows, "x")[1].unwrap(), 2.0);
}

#[test]
fn test_substituted_codes_are_interpolated() {
    let columns = vec![Variable::new("x")
        .with_missing_values(vec![Value::Number(-1.0)])
        .with_missing_method(MissingMethod::Mean, None)];
    let rows = numeric_rows("x", &[Some(2.0), Some(-1.0), Some(4.0)]);

    let (_, resolved) = resolve_missing(&columns, rows).unwrap();

    assert_eq!(column_values(&resolved, "x"), vec![Some(2.0), Some(3.0), Some(4.0)]);
}

#[test]
fn test_nearest_tie_prefers_first_row_in_scan() {
    let rows = reference_rows(&[1.0, 2.0, 3.0, 4.0], &[Some(10.0), None, Some(30.0), Some(40.0)]);

    let (_, resolved) = resolve_missing(&with_method(MissingMethod::Nearest), rows).unwrap();

    // References 1 and 3 are both at distance 1 from 2; row 0 comes first
    assert_eq!(column_values(&resolved, "target")[1], Some(10.0));
}

#[test]
fn test_nearest_skips_rows_without_reference() {
    let mut rows = reference_rows(&[1.0, 5.0, 6.0], &[Some(10.0), None, Some(60.0)]);
    rows[2].insert("ref".to_string(), Value::Absent);

    let (_, resolved) = resolve_missing(&with_method(MissingMethod::Nearest), rows).unwrap();

    assert_eq!(column_values(&resolved, "target")[1], Some(10.0));
}

#[test]
fn test_lagrange_interpolates_between_points() {
    // target = ref^2
    let rows = reference_rows(
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        &[Some(1.0), Some(4.0), None, Some(16.0), Some(25.0)],
    );

    let (_, resolved) = resolve_missing(&with_method(MissingMethod::Lagrange), rows).unwrap();

    assert_close(column_values(&resolved, "target")[2].unwrap(), 9.0);
}

#[test]
fn test_lagrange_uses_one_side_only() {
    // No reference point above 4: the polynomial through the points below is used
    let rows = reference_rows(&[1.0, 2.0, 3.0, 4.0], &[Some(2.0), Some(4.0), Some(6.0), None]);

    let (_, resolved) = resolve_missing(&with_method(MissingMethod::Lagrange), rows).unwrap();

    assert_close(column_values(&resolved, "target")[3].unwrap(), 8.0);
}

#[test]
fn test_lagrange_without_points_stays_absent() {
    let rows = reference_rows(&[1.0, 2.0], &[None, None]);

    let (_, resolved) = resolve_missing(&with_method(MissingMethod::Lagrange), rows).unwrap();

    assert_eq!(column_values(&resolved, "target"), vec![None, None]);
}

#[test]
fn test_interpolation_is_noop_without_missing_values() {
    let reference = [1.0, 2.0, 3.0, 4.0];
    let target = [Some(3.0), Some(1.0), Some(4.0), Some(1.5)];

    for method in [
        MissingMethod::Mean,
        MissingMethod::Median,
        MissingMethod::Nearest,
        MissingMethod::Lagrange,
    ] {
        let rows = reference_rows(&reference, &target);
        let (_, resolved) = resolve_missing(&with_method(method), rows.clone()).unwrap();
        assert_eq!(resolved, rows, "{:?} changed a complete column", method);
    }
}

#[test]
fn test_interpolation_leaves_input_rows_untouched() {
    let rows = numeric_rows("x", &[Some(1.0), None]);
    let columns = vec![Variable::new("x").with_missing_method(MissingMethod::Mean, None)];

    let resolved = interpolate_missing(&columns, &rows).unwrap();

    assert!(rows[1]["x"].is_absent());
    assert_eq!(resolved[1]["x"], Value::Number(1.0));
}

#[test]
fn test_non_numeric_target_fails() {
    let rows = vec![row([("x", Value::from("high"))]), row([("x", Value::Absent)])];
    let columns = vec![Variable::new("x").with_missing_method(MissingMethod::Mean, None)];

    let err = resolve_missing(&columns, rows).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NonNumericInterpolation);
}

#[test]
fn test_reference_method_requires_existing_reference() {
    let rows = numeric_rows("target", &[Some(1.0), None]);

    let columns = vec![Variable::new("target").with_missing_method(MissingMethod::Nearest, None)];
    let err = resolve_missing(&columns, rows.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingReferenceVariable);

    let columns =
        vec![Variable::new("target").with_missing_method(MissingMethod::Lagrange, Some("nope"))];
    match resolve_missing(&columns, rows).unwrap_err() {
        PipelineError::MissingReferenceVariable { column, reference } => {
            assert_eq!(column, "target");
            assert_eq!(reference.as_deref(), Some("nope"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
