use sable::{
    Analysis, Diagnostic, DiagnosticKind, SourceSpan, analyze,
    ast::Node,
    checker::{DeferredCheck, TypeRegistry},
    value::{FIRST_USER_TYPE_ID, ValueType},
};

fn analyze_ok(source: &str) -> Analysis {
    let analysis = analyze(source);
    assert!(
        analysis.is_ok(),
        "expected clean analysis, found {:?}",
        analysis.diagnostics
    );
    analysis
}

fn messages(analysis: &Analysis) -> Vec<&str> {
    analysis
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.message.as_str())
        .collect()
}

#[test]
fn declaration_with_initializer_yields_declare_then_set() {
    let analysis = analyze_ok("var a int = 12");
    assert_eq!(
        analysis.program.nodes,
        vec![
            Node::declare("a", ValueType::Int),
            Node::set("a", ValueType::Int, Node::Int(12)),
        ]
    );
}

#[test]
fn every_builtin_declaration_yields_two_nodes() {
    for (source, ty, literal) in [
        ("var b bool = true", ValueType::Bool, Node::Bool(true)),
        ("var f float = 2.5", ValueType::Float, Node::Float(2.5)),
        ("var t tuple = ()", ValueType::Tuple, Node::Tuple(Vec::new())),
    ] {
        let analysis = analyze_ok(source);
        let name = source.split_whitespace().nth(1).unwrap();
        assert_eq!(
            analysis.program.nodes,
            vec![Node::declare(name, ty), Node::set(name, ty, literal)],
            "{source}"
        );
    }
}

#[test]
fn bare_declaration_yields_only_declare() {
    let analysis = analyze_ok("var a int");
    assert_eq!(analysis.program.nodes, vec![Node::declare("a", ValueType::Int)]);
}

#[test]
fn forward_type_reference_is_satisfied_by_later_declaration() {
    let analysis = analyze_ok("var p point\nvar q point = 3\ntype point");
    let point = ValueType::User(FIRST_USER_TYPE_ID);
    assert_eq!(analysis.program.nodes[0], Node::declare("p", point));
    assert_eq!(analysis.program.types.lookup("point"), Some(point));
    assert!(analysis.program.types.is_declared("point"));
    assert_eq!(analysis.program.types.pending_count(), 0);
}

#[test]
fn undeclared_type_reports_at_declaration_site() {
    let analysis = analyze("var a structA = 0");
    assert_eq!(analysis.diagnostics.len(), 1);
    let diagnostic = &analysis.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::Analysis);
    assert!(diagnostic.message.contains("structA"));
    assert_eq!(diagnostic.span, Some(SourceSpan::new(1, 6, 13)));
    assert_eq!(
        diagnostic.to_string(),
        "var a structA = 0\n      ^\ntype structA was never declared"
    );
    // The statement itself is still built.
    assert_eq!(analysis.program.nodes.len(), 2);
}

#[test]
fn undeclared_types_report_once_per_use_sorted_by_name() {
    let analysis = analyze("var x zeta\nvar y alpha\nvar z zeta");
    let lines: Vec<usize> = analysis
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.span.unwrap().line)
        .collect();
    assert_eq!(lines, vec![2, 1, 3]);
    assert!(messages(&analysis)[0].contains("alpha"));
    assert!(messages(&analysis)[1].contains("zeta"));
}

#[test]
fn type_declared_before_use_needs_no_watcher() {
    let analysis = analyze_ok("type box\nvar b box = 1");
    assert_eq!(
        analysis.program.nodes[0],
        Node::declare("b", ValueType::User(FIRST_USER_TYPE_ID))
    );
}

#[test]
fn redeclaring_a_type_is_an_error() {
    let analysis = analyze("type box\ntype box");
    assert_eq!(messages(&analysis), vec!["type `box` is already declared"]);
    assert_eq!(analysis.diagnostics[0].span, Some(SourceSpan::new(2, 5, 8)));
}

#[test]
fn missing_name_and_type_are_anchored_at_previous_token_end() {
    let analysis = analyze("var\nvar a");
    assert_eq!(
        messages(&analysis),
        vec!["expected variable name", "expected variable type"]
    );
    assert_eq!(analysis.diagnostics[0].span, Some(SourceSpan::point(1, 3)));
    assert_eq!(analysis.diagnostics[1].span, Some(SourceSpan::point(2, 5)));
    assert!(analysis.program.nodes.is_empty());
    assert!(!analysis.stopped);
}

#[test]
fn missing_assignment_stops_the_compilation() {
    let analysis = analyze("var a int 5\nvar b int = 1");
    assert!(analysis.stopped);
    assert_eq!(messages(&analysis), vec!["expected `=` or end of line"]);
    assert_eq!(analysis.diagnostics[0].span, Some(SourceSpan::point(1, 6)));
    assert_eq!(analysis.program.nodes, vec![Node::declare("a", ValueType::Int)]);
}

#[test]
fn deferred_diagnostics_come_before_general_ones() {
    let analysis = analyze("var q\nvar a ghost");
    assert_eq!(analysis.diagnostics.len(), 2);
    assert!(messages(&analysis)[0].contains("ghost"));
    assert_eq!(messages(&analysis)[1], "expected variable type");
}

#[test]
fn binary_expressions_pick_node_by_static_type() {
    let analysis =
        analyze_ok("var a int = 1\nvar b int = a + 2\nvar c float = a + 1.5\nvar d int = a - 1");
    let nodes = &analysis.program.nodes;
    let get_a = || Box::new(Node::get("a", ValueType::Int));
    assert_eq!(
        nodes[3],
        Node::set(
            "b",
            ValueType::Int,
            Node::AddInt {
                left: get_a(),
                right: Box::new(Node::Int(2)),
            }
        )
    );
    assert_eq!(
        nodes[5],
        Node::set(
            "c",
            ValueType::Float,
            Node::AddAny {
                left: get_a(),
                right: Box::new(Node::Float(1.5)),
            }
        )
    );
    assert_eq!(
        nodes[7],
        Node::set(
            "d",
            ValueType::Int,
            Node::SubInt {
                left: get_a(),
                right: Box::new(Node::Int(1)),
            }
        )
    );
}

#[test]
fn addition_is_left_associative() {
    let analysis = analyze_ok("var a int = 1 + 2 + 3");
    assert_eq!(
        analysis.program.nodes[1],
        Node::set(
            "a",
            ValueType::Int,
            Node::AddInt {
                left: Box::new(Node::AddInt {
                    left: Box::new(Node::Int(1)),
                    right: Box::new(Node::Int(2)),
                }),
                right: Box::new(Node::Int(3)),
            }
        )
    );
}

#[test]
fn tuple_elements_may_be_separated_by_spaces_or_commas() {
    let analysis = analyze_ok("var t tuple = (1, true 2)");
    assert_eq!(
        analysis.program.nodes[1],
        Node::set(
            "t",
            ValueType::Tuple,
            Node::Tuple(vec![Node::Int(1), Node::Bool(true), Node::Int(2)])
        )
    );
}

#[test]
fn expression_errors_drop_the_set_node() {
    for (source, message) in [
        ("var a int = b", "unknown variable `b`"),
        ("var a int = 1e", "malformed number literal `1e`"),
        ("var a int = \"s\"", "string values are not supported yet"),
        ("var a int = (1 2", "expected `)` to close tuple"),
        ("var a int = 1 2", "unexpected `2` after expression"),
        ("var a int = ", "expected expression"),
    ] {
        let analysis = analyze(source);
        assert_eq!(messages(&analysis), vec![message], "{source}");
        assert_eq!(
            analysis.program.nodes,
            vec![Node::declare("a", ValueType::Int)],
            "{source}"
        );
    }
}

#[test]
fn print_statement() {
    let analysis = analyze_ok("var a int = 1\nprint a");
    assert_eq!(
        analysis.program.nodes[2],
        Node::Print(Box::new(Node::get("a", ValueType::Int)))
    );
    let analysis = analyze("print");
    assert_eq!(messages(&analysis), vec!["expected expression after `print`"]);
}

#[test]
fn unsupported_statements_are_reported() {
    let analysis = analyze("a = 5");
    assert_eq!(messages(&analysis), vec!["unsupported statement starting with `a`"]);
    assert!(analysis.program.nodes.is_empty());
}

#[test]
fn vector_types_are_recognised_but_unsupported() {
    let analysis = analyze("var v vec<int> = 1");
    assert_eq!(messages(&analysis), vec!["vector types are not supported yet"]);
    assert!(analysis.program.nodes.is_empty());

    let analysis = analyze("var v vec int");
    assert_eq!(messages(&analysis), vec!["expected `vec<type>`"]);
}

#[test]
fn string_type_has_no_runtime_representation() {
    let analysis = analyze("var s string");
    assert_eq!(messages(&analysis), vec!["builtin type `string` is not supported"]);
    assert_eq!(analysis.program.nodes, vec![Node::declare("s", ValueType::None)]);
}

#[test]
fn blocks_collect_their_statements() {
    let analysis = analyze_ok("var a int = 1\n{\nvar b int = a\n}\nprint a");
    assert_eq!(analysis.program.nodes.len(), 4);
    assert_eq!(
        analysis.program.nodes[2],
        Node::Block(vec![
            Node::declare("b", ValueType::Int),
            Node::set("b", ValueType::Int, Node::get("a", ValueType::Int)),
        ])
    );
}

#[test]
fn block_variables_are_not_visible_after_the_block() {
    let analysis = analyze("{\nvar b int = 1\n}\nprint b");
    assert_eq!(messages(&analysis), vec!["unknown variable `b`"]);
}

#[test]
fn unbalanced_braces_are_reported() {
    let analysis = analyze("}\n{\nvar a int");
    assert_eq!(
        messages(&analysis),
        vec!["unmatched `}`", "block is never closed with `}`"]
    );
    assert_eq!(analysis.diagnostics[1].span, Some(SourceSpan::new(2, 0, 1)));
}

#[test]
fn comments_and_blank_lines_produce_nothing() {
    let analysis = analyze_ok("// header\n\n   \nvar a int = 1 // trailing");
    assert_eq!(analysis.program.nodes.len(), 2);
}

#[test]
fn lexer_errors_are_collected() {
    let analysis = analyze("var a int = 1 | 2");
    assert!(messages(&analysis)[0].contains("did you mean `||`?"));
}

#[test]
fn registry_allocates_ids_after_builtins() {
    let mut registry = TypeRegistry::new();
    let a = registry.type_of("a");
    let b = registry.type_of("b");
    assert_eq!(a, ValueType::User(FIRST_USER_TYPE_ID));
    assert_eq!(b, ValueType::User(FIRST_USER_TYPE_ID + 1));
    assert_eq!(registry.type_of("a"), a);
    assert_eq!(registry.name_of(b), Some("b"));
    assert_eq!(registry.describe(ValueType::Int), "int");
    assert_eq!(registry.describe(b), "b");
    assert!(ValueType::Function.id() < FIRST_USER_TYPE_ID);
}

#[test]
fn declaring_a_type_discards_its_watchers() {
    let mut registry = TypeRegistry::new();
    let watcher = |name: &str| {
        DeferredCheck::new(name, Diagnostic::new(DiagnosticKind::Analysis, name.to_string()))
    };
    registry.type_of("later");
    registry.ensure_declared(watcher("later"));
    registry.ensure_declared(watcher("later"));
    registry.ensure_declared(watcher("never"));
    assert_eq!(registry.pending_count(), 3);

    assert!(registry.declare("later").is_ok());
    assert_eq!(registry.pending_count(), 1);
    registry.ensure_declared(watcher("later"));
    assert_eq!(registry.pending_count(), 1);
    assert!(registry.declare("later").is_err());

    let unresolved = registry.take_unresolved();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].message, "never");
    assert_eq!(registry.pending_count(), 0);
}

#[test]
fn diagnostics_fall_back_to_line_and_column() {
    let diagnostic =
        Diagnostic::new(DiagnosticKind::Parser, "boom").with_span(SourceSpan::point(3, 4));
    assert_eq!(diagnostic.to_string(), "line 3:4 : boom");
    let bare = Diagnostic::new(DiagnosticKind::Runtime, "plain").with_note("context");
    assert_eq!(bare.to_string(), "plain\n  note: context");
}

#[test]
fn type_declared_after_a_fatal_error_still_satisfies_forward_references() {
    let analysis = analyze("var a structA\nvar b int 5\ntype structA\nprint 1");
    assert!(analysis.stopped);
    assert_eq!(messages(&analysis), vec!["expected `=` or end of line"]);
    assert_eq!(
        analysis.program.nodes,
        vec![
            Node::declare("a", ValueType::User(FIRST_USER_TYPE_ID)),
            Node::declare("b", ValueType::Int),
        ]
    );
}

#[test]
fn caret_is_placed_by_character_count() {
    let mut diagnostic =
        Diagnostic::new(DiagnosticKind::Parser, "bad").with_span(SourceSpan::point(1, 5));
    diagnostic.attach_source(&["(é) x"]);
    assert_eq!(diagnostic.to_string(), "(é) x\n    ^\nbad");
}
