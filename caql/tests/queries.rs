//! Query-level behaviour: validation results and canonical printing.

use caql::{parse, validate};

#[test]
fn validate_accepts_ticket_filters() {
    for query in [
        "status == 'open'",
        "owner IN ['alice', 'bob'] AND NOT open",
        "LENGTH(tags) > 0 || name =~ '^INC-[0-9]+$'",
        "state.severity >= 3 ? 'high' : 'low'",
        "created > '2024-01-01' /* inclusive */ // trailing",
    ] {
        assert_eq!(validate(query), None, "{query}");
    }
}

#[test]
fn validate_reports_structured_error() {
    let err = validate("name == ").expect("should fail");
    assert_eq!(err.symbol, "<EOF>");
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 8);
    assert!(err.message.starts_with("mismatched input '<EOF>'"));
    assert!(!err.payload.is_empty());
    assert_eq!(err.to_string(), format!("line 1:8 {}", err.message));
}

#[test]
fn syntax_error_serializes_to_editor_shape() {
    let err = validate("(1,2,3)").expect("should fail");
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["symbol"], ",");
    assert_eq!(json["line"], 1);
    assert_eq!(json["column"], 2);
    assert_eq!(json["payload"], serde_json::json!(["')'"]));
}

#[test]
fn printing_normalises_spelling() {
    let cases = [
        ("active == true && age < 39", "active == true AND age < 39"),
        ("(attr == 10) AND foo == 'bar' OR NOT baz", r#"(attr == 10) AND foo == "bar" OR NOT baz"#),
        ("!active", "NOT active"),
        ("not active", "NOT active"),
        ("1 || ! 0", "1 OR NOT 0"),
        ("+1", "1"),
        ("-42", "-42"),
        ("25 > 1  &&  42 != 7", "25 > 1 AND 42 != 7"),
        ("[1, 2, 3,]", "[1, 2, 3]"),
        ("{a: 1,}", "{a: 1}"),
        ("{'a': 1}", r#"{"a": 1}"#),
        (r#"{'it\'s': 1}"#, r#"{"it's": 1}"#),
        ("u.value ? : 'x'", r#"u.value ? : "x""#),
        ("2010..2013", "2010..2013"),
        ("length(tags)", "LENGTH(tags)"),
        ("x not in [1]", "x NOT IN [1]"),
        ("[1] all in [1]", "[1] ALL IN [1]"),
        (r#""a_b_foo" LIKE "a\\_b\\_foo""#, r#""a_b_foo" LIKE "a\\_b\\_foo""#),
        ("u[\"friends\"][0]", "u[\"friends\"][0]"),
    ];
    for (input, want) in cases {
        let query = parse(input).expect(input);
        assert_eq!(query.to_string(), want, "{input}");
    }
}

#[test]
fn printed_query_parses_to_same_tree() {
    for input in [
        "a && (b || c) ? -d : e[0].f",
        "{k, 'q': [1, 2], [x]: y ? : z}",
        "NOT a LIKE 'x%' AND b NOT IN [1, 2]",
    ] {
        let first = parse(input).expect(input);
        let second = parse(&first.to_string()).expect("reparse");
        assert_eq!(first, second, "{input}");
    }
}

#[test]
fn validate_bounds_pathological_nesting() {
    let deep = format!("{}1{}", "(".repeat(400), ")".repeat(400));
    let err = validate(&deep).expect("too deep");
    assert!(err.message.contains("nested deeper than"), "{}", err.message);
    assert!(validate(&"[".repeat(100_000)).is_some());
}

#[test]
fn deepest_accepted_query_evaluates_and_prints() {
    let depth = caql::MAX_DEPTH - 1;
    let input = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let query = parse(&input).expect("within budget");
    assert_eq!(query.eval_value(&serde_json::json!({})).unwrap(), serde_json::json!(1));
    assert_eq!(query.to_string(), input);

    let chain = format!("x{}", " + x".repeat(caql::MAX_DEPTH - 2));
    let query = parse(&chain).expect("within budget");
    assert_eq!(
        query.eval_value(&serde_json::json!({"x": 1})).unwrap().as_f64(),
        Some(f64::from(u32::try_from(caql::MAX_DEPTH - 1).unwrap()))
    );
}
