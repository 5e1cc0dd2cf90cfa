//! Tests for row filtering and computed-column evaluation

use varflow::pipeline::{
    add_computed_column, apply_filter, compute_column, describe, filter_indices, DataRow,
    ErrorKind, PipelineError, Value, Variable,
};

#[path = "common/mod.rs"]
mod common;

use common::{column_values, create_survey_rows, row};

fn ages() -> (Vec<Variable>, Vec<DataRow>) {
    let rows = vec![
        row([("age", Value::Number(25.0))]),
        row([("age", Value::Number(35.0))]),
        row([("age", Value::Absent)]),
    ];
    (describe(&[Variable::new("age")], &rows), rows)
}

fn survey() -> (Vec<Variable>, Vec<DataRow>) {
    let rows = create_survey_rows();
    let columns = describe(
        &[
            Variable::new("age"),
            Variable::new("income"),
            Variable::new("city"),
        ],
        &rows,
    );
    (columns, rows)
}

#[test]
fn test_absent_values_exclude_the_row() {
    let (columns, rows) = ages();

    let kept = apply_filter(&columns, &rows, Some(":::age::: > 30")).unwrap();

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0]["age"], Value::Number(35.0));
}

#[test]
fn test_negated_comparison_still_excludes_absent() {
    let (columns, rows) = ages();

    let kept = filter_indices(&columns, &rows, Some("!(:::age::: > 30)")).unwrap();

    assert_eq!(kept, vec![0]);
}

#[test]
fn test_empty_expression_keeps_every_row() {
    let (columns, rows) = ages();

    assert_eq!(filter_indices(&columns, &rows, None).unwrap(), vec![0, 1, 2]);
    assert_eq!(filter_indices(&columns, &rows, Some("   ")).unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_text_and_boolean_operators() {
    let (columns, rows) = survey();

    let kept = filter_indices(
        &columns,
        &rows,
        Some(r#":::city::: == "Bergen" || (:::city::: == "Oslo" && :::income::: >= 30000)"#),
    )
    .unwrap();

    // Row 2 is in Oslo but has no income
    assert_eq!(kept, vec![0, 1, 4]);
}

#[test]
fn test_filter_keeps_original_order() {
    let (columns, rows) = survey();

    let kept = apply_filter(&columns, &rows, Some(":::income::: % 2 == 0")).unwrap();
    let incomes: Vec<Option<f64>> = column_values(&kept, "income");

    assert_eq!(
        incomes,
        vec![Some(30_000.0), Some(52_000.0), Some(41_000.0), Some(75_000.0)]
    );
}

#[test]
fn test_unknown_variable_is_reported() {
    let (columns, rows) = ages();

    let err = filter_indices(&columns, &rows, Some(":::height::: > 1")).unwrap_err();

    match err {
        PipelineError::UndefinedVariableReference { name } => assert_eq!(name, "height"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_filter_is_reported() {
    let (columns, rows) = ages();

    let err = filter_indices(&columns, &rows, Some(":::age::: >")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FilterEvaluationError);
}

#[test]
fn test_nominal_columns_read_numbers_as_text() {
    let rows = vec![
        row([("age", Value::Number(25.0))]),
        row([("age", Value::Text("35".to_string()))]),
    ];
    let columns = vec![Variable::new("age")];

    let kept = filter_indices(&columns, &rows, Some(r#":::age::: + 10 == "2510""#)).unwrap();

    assert_eq!(kept, vec![0]);
}

#[test]
fn test_deeply_nested_filter_is_rejected() {
    let (columns, rows) = ages();
    let nested = format!("{}:::age:::{} > 1", "(".repeat(100_000), ")".repeat(100_000));

    let err = filter_indices(&columns, &rows, Some(&nested)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FilterEvaluationError);
}

#[test]
fn test_long_computed_chain_is_rejected() {
    let (columns, rows) = ages();
    let chain = vec![":::age:::"; 200_000].join(" + ");

    let err = compute_column(&columns, &rows, &chain).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpressionEvaluationError);

    let values = compute_column(&columns, &rows, &vec![":::age:::"; 100].join(" + ")).unwrap();
    assert_eq!(values[0], Value::Number(2500.0));
}

#[test]
fn test_unsafe_expression_rejected_on_empty_dataset() {
    for expression in ["fetch('http://example.com')", "eval(\"1 + 1\")"] {
        let err = compute_column(&[], &[], expression).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafeExpression, "{}", expression);

        let err = add_computed_column(&[], &[], "x", expression).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafeExpression, "{}", expression);
    }
}

#[test]
fn test_column_named_like_forbidden_identifier_is_allowed() {
    let rows = vec![row([("process", Value::Number(2.0))])];
    let columns = describe(&[Variable::new("process")], &rows);

    let values = compute_column(&columns, &rows, ":::process::: * 2").unwrap();

    assert_eq!(values, vec![Value::Number(4.0)]);
}

#[test]
fn test_computed_values() {
    let (columns, rows) = survey();

    let values = compute_column(&columns, &rows, ":::income::: / 1000 + :::age:::").unwrap();
    assert_eq!(values[0], Value::Number(55.0));
    assert!(values[2].is_absent(), "absent income propagates");

    let flags = compute_column(&columns, &rows, ":::income::: > 50000").unwrap();
    assert_eq!(flags[0], Value::Number(0.0));
    assert_eq!(flags[1], Value::Number(1.0));

    let labels = compute_column(&columns, &rows, r#":::city::: + "-" + :::age:::"#).unwrap();
    assert_eq!(labels[0], Value::from("Oslo-25"));
}

#[test]
fn test_division_by_zero_yields_absent() {
    let (columns, rows) = survey();

    let values = compute_column(&columns, &rows, ":::income::: / 0").unwrap();

    assert!(values.iter().all(Value::is_absent));
}

#[test]
fn test_add_computed_column_prepends_and_describes() {
    let (columns, rows) = survey();

    let (columns, rows) =
        add_computed_column(&columns, &rows, "income_k", ":::income::: / 1000").unwrap();

    assert_eq!(columns[0].name, "income_k");
    assert!(columns[0].is_numeric());
    assert_eq!(columns[0].missing, 1);
    assert_eq!(columns.len(), 4);
    assert_eq!(rows[1]["income_k"], Value::Number(52.0));
}

#[test]
fn test_add_computed_column_rejects_duplicate_name() {
    let (columns, rows) = survey();

    let err = add_computed_column(&columns, &rows, "city", "1 + 1").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateColumnName);
}

#[test]
fn test_add_computed_column_reports_evaluation_errors() {
    let (columns, rows) = survey();

    let err = add_computed_column(&columns, &rows, "bad", "sqrt(1, 2)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpressionEvaluationError);

    let err = add_computed_column(&columns, &rows, "bad", ":::weight::: * 2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UndefinedVariableReference);
}
