use sable::{
    DiagnosticKind, ErrorCollector, SourceSpan,
    lexer::{Lexer, Token, TokenKind, tokenize},
};

fn lex(line: &str) -> (Vec<Token>, ErrorCollector) {
    let mut errors = ErrorCollector::new();
    let tokens = Lexer::new(line, 1).tokenize(&mut errors);
    (tokens, errors)
}

fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
    tokens.iter().map(|token| token.kind).collect()
}

fn lexemes(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|token| token.lexeme.as_str()).collect()
}

#[test]
fn tokenizes_declaration_with_positions() {
    let (tokens, errors) = lex("var a int = 12");
    assert!(errors.is_empty());
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Var,
            TokenKind::Name,
            TokenKind::BuiltinType,
            TokenKind::Assign,
            TokenKind::Number,
        ]
    );
    assert_eq!(lexemes(&tokens), vec!["var", "a", "int", "=", "12"]);
    assert_eq!(tokens[0].span, SourceSpan::new(1, 0, 3));
    assert_eq!(tokens[2].span, SourceSpan::new(1, 6, 9));
    assert_eq!(tokens[4].span, SourceSpan::new(1, 12, 14));
}

#[test]
fn longest_match_for_two_character_operators() {
    let (tokens, errors) = lex("a == b && c || !d & e = f");
    assert!(errors.is_empty());
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Name,
            TokenKind::EqualEqual,
            TokenKind::Name,
            TokenKind::DoubleAmpersand,
            TokenKind::Name,
            TokenKind::DoublePipe,
            TokenKind::Bang,
            TokenKind::Name,
            TokenKind::Ampersand,
            TokenKind::Name,
            TokenKind::Assign,
            TokenKind::Name,
        ]
    );
    assert_eq!(tokens[5].lexeme, "||");
    assert_eq!(tokens[5].span, SourceSpan::new(1, 12, 14));
}

#[test]
fn lone_bar_is_rejected_and_scanning_continues() {
    let (tokens, errors) = lex("a | b");
    assert_eq!(lexemes(&tokens), vec!["a", "b"]);
    assert_eq!(errors.len(), 1);
    let diagnostic = &errors.diagnostics()[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::Lexer);
    assert!(diagnostic.message.contains("`||`"));
    assert_eq!(diagnostic.span, Some(SourceSpan::point(1, 2)));
}

#[test]
fn slash_is_division_and_double_slash_is_comment() {
    let (tokens, errors) = lex("x / y // the rest / of it");
    assert!(errors.is_empty());
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Name,
            TokenKind::Slash,
            TokenKind::Name,
            TokenKind::Comment,
        ]
    );
    assert_eq!(tokens[3].lexeme, " the rest / of it");
    assert_eq!(tokens[3].span.end, 25);
}

#[test]
fn leading_dot_starts_a_number() {
    let (tokens, _) = lex(".25 a.b");
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Number,
            TokenKind::Name,
            TokenKind::Dot,
            TokenKind::Name,
        ]
    );
    assert_eq!(tokens[0].lexeme, ".25");
}

#[test]
fn numbers_take_one_decimal_point_and_unvalidated_exponents() {
    let (tokens, errors) = lex("1.5 1e5 2ee 3.4.5");
    assert!(errors.is_empty());
    assert_eq!(lexemes(&tokens), vec!["1.5", "1e5", "2ee", "3.4", ".5"]);
}

#[test]
fn keywords_are_classified() {
    let (tokens, _) = lex("var print type true false int float string bool tuple vec name");
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Var,
            TokenKind::Print,
            TokenKind::Type,
            TokenKind::True,
            TokenKind::False,
            TokenKind::BuiltinType,
            TokenKind::BuiltinType,
            TokenKind::BuiltinType,
            TokenKind::BuiltinType,
            TokenKind::BuiltinType,
            TokenKind::Vec,
            TokenKind::Name,
        ]
    );
}

#[test]
fn identifiers_allow_digits_and_underscores_after_first_letter() {
    let (tokens, _) = lex("var_2x vec<int>");
    assert_eq!(
        kinds(&tokens),
        vec![
            TokenKind::Name,
            TokenKind::Vec,
            TokenKind::LAngle,
            TokenKind::BuiltinType,
            TokenKind::RAngle,
        ]
    );
    assert_eq!(tokens[0].lexeme, "var_2x");
}

#[test]
fn string_escapes() {
    let (tokens, errors) = lex(r#""a\tb\nc\qd""#);
    assert!(errors.is_empty());
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].lexeme, "a\tb\ncqd");
    assert_eq!(tokens[0].span, SourceSpan::new(1, 0, 12));
}

#[test]
fn unterminated_string_stops_the_line() {
    let (tokens, errors) = lex(r#"var s = "abc"#);
    assert_eq!(
        kinds(&tokens),
        vec![TokenKind::Var, TokenKind::Name, TokenKind::Assign]
    );
    assert_eq!(errors.len(), 1);
    assert!(errors.diagnostics()[0].message.contains("no closing"));
}

#[test]
fn unknown_character_stops_the_line() {
    let (tokens, errors) = lex("var a int = 1 $ 2");
    assert_eq!(tokens.len(), 5);
    assert_eq!(errors.len(), 1);
    let diagnostic = &errors.diagnostics()[0];
    assert!(diagnostic.message.contains('$'));
    assert_eq!(diagnostic.span, Some(SourceSpan::point(1, 14)));
}

#[test]
fn whitespace_produces_no_tokens() {
    let (tokens, errors) = lex(" \t  \t");
    assert!(tokens.is_empty());
    assert!(errors.is_empty());
}

#[test]
fn tokenize_numbers_lines_from_one() {
    let mut errors = ErrorCollector::new();
    let lines = tokenize("var a int\n\n\tprint a", &mut errors);
    assert_eq!(lines.len(), 3);
    assert!(lines[1].is_empty());
    assert!(lines[0].iter().all(|token| token.line() == 1));
    assert_eq!(lines[2][0].span, SourceSpan::new(3, 1, 6));
    assert_eq!(lines[2][1].span, SourceSpan::new(3, 7, 8));
}
