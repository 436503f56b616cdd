use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    ast::Node,
    checker::{AlreadyDeclared, DeferredCheck, TypeRegistry},
    diagnostics::{Diagnostic, DiagnosticKind, ErrorCollector, SourceSpan},
    lexer::{Lexer, Token, TokenKind},
    operators::{Combine, OperatorTable},
    value::ValueType,
};

/// Everything the runtime needs to execute an analysed unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<Node>,
    pub types: TypeRegistry,
    pub operators: OperatorTable,
}

/// Outcome of analysing a whole unit.
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    /// Deferred type diagnostics first (sorted by type name), then the rest in the order
    /// they were recorded.
    pub diagnostics: Vec<Diagnostic>,
    /// Set when a fatal syntax error cut statement emission short.
    pub stopped: bool,
}

impl Analysis {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Lexes and parses `source`, then runs the end-of-analysis checks.
pub fn analyze(source: &str) -> Analysis {
    let mut parser = Parser::new();
    let nodes = parser.parse_source(source);
    parser.into_analysis(nodes)
}

#[derive(Clone)]
struct OpenBlock {
    nodes: Vec<Node>,
    span: SourceSpan,
}

/// Parser state saved before some input so that rejected input leaves no trace.
pub struct Checkpoint {
    types: TypeRegistry,
    symbols: Vec<IndexMap<String, ValueType>>,
    blocks: Vec<OpenBlock>,
}

/// Line-at-a-time tree builder.
///
/// Statements are dispatched on their first token. User type names may be used before
/// their `type` statement; the [`TypeRegistry`] remembers those uses until the end of
/// analysis.
pub struct Parser {
    types: TypeRegistry,
    operators: OperatorTable,
    errors: ErrorCollector,
    symbols: Vec<IndexMap<String, ValueType>>,
    blocks: Vec<OpenBlock>,
    lines: Vec<String>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_operators(OperatorTable::standard())
    }

    pub fn with_operators(operators: OperatorTable) -> Self {
        Self {
            types: TypeRegistry::new(),
            operators,
            errors: ErrorCollector::new(),
            symbols: vec![IndexMap::new()],
            blocks: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    pub fn register_operator(
        &mut self,
        left: ValueType,
        right: ValueType,
        result: ValueType,
        apply: Combine,
    ) {
        self.operators.register(left, right, result, apply);
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn should_stop(&self) -> bool {
        self.errors.should_stop()
    }

    /// Clears a fatal stop so that later input is parsed again.
    pub fn resume(&mut self) {
        self.errors.resume();
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            types: self.types.clone(),
            symbols: self.symbols.clone(),
            blocks: self.blocks.clone(),
        }
    }

    /// Forgets the types, variables and block contents recorded since `checkpoint`.
    /// Source lines are kept so that line numbers keep counting.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        debug!(lines = self.lines.len(), "rolling back rejected input");
        self.types = checkpoint.types;
        self.symbols = checkpoint.symbols;
        self.blocks = checkpoint.blocks;
    }

    /// Parses every line of `source`, returning the completed top-level statements.
    ///
    /// After a fatal error later lines are still scanned so that their `type`
    /// declarations satisfy earlier forward references, but no statements are emitted.
    pub fn parse_source(&mut self, source: &str) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut stopped = false;
        for line in source.lines() {
            nodes.extend(self.push_line(line));
            if !stopped && self.errors.should_stop() {
                debug!(line = self.lines.len(), "statement emission stopped");
                stopped = true;
            }
        }
        nodes
    }

    /// Lexes and parses the next source line.
    pub fn push_line(&mut self, text: &str) -> Vec<Node> {
        self.lines.push(text.to_string());
        let tokens = Lexer::new(text, self.lines.len()).tokenize(&mut self.errors);
        self.parse_line(&tokens)
    }

    /// Parses one line worth of tokens. Statements inside an open block are held back
    /// until the block closes.
    pub fn parse_line(&mut self, tokens: &[Token]) -> Vec<Node> {
        let mut cursor = Cursor::new(tokens);
        let Some(first) = cursor.peek() else {
            return Vec::new();
        };
        if self.errors.should_stop() {
            // Only declarations are honoured once emission has stopped.
            if first.kind == TokenKind::Type {
                self.parse_type_declaration(&mut cursor);
            }
            return Vec::new();
        }
        debug!(line = first.line(), kind = ?first.kind, "parsing statement");
        let nodes = match first.kind {
            TokenKind::Var => self.parse_var(&mut cursor),
            TokenKind::Print => self.parse_print(&mut cursor),
            TokenKind::Type => {
                self.parse_type_declaration(&mut cursor);
                Vec::new()
            }
            TokenKind::LBrace => {
                self.open_block(&mut cursor);
                Vec::new()
            }
            TokenKind::RBrace => self.close_block(&mut cursor),
            _ => {
                let message = format!("unsupported statement starting with `{}`", first.lexeme);
                self.error(first.span, message);
                Vec::new()
            }
        };
        self.emit(nodes)
    }

    /// Diagnostics recorded so far, with source lines attached. Deferred type checks stay
    /// pending.
    pub fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = self.errors.drain();
        for diagnostic in &mut diagnostics {
            diagnostic.attach_source(&self.lines);
        }
        diagnostics
    }

    /// End-of-analysis pass: reports unclosed blocks and every unsatisfied deferred
    /// check, followed by the diagnostics not drained yet.
    pub fn finish(&mut self) -> Vec<Diagnostic> {
        while let Some(block) = self.blocks.pop() {
            self.symbols.pop();
            self.errors.push(
                Diagnostic::new(DiagnosticKind::Parser, "block is never closed with `}`")
                    .with_span(block.span),
            );
        }
        let mut diagnostics = self.types.take_unresolved();
        diagnostics.extend(self.errors.drain());
        for diagnostic in &mut diagnostics {
            diagnostic.attach_source(&self.lines);
        }
        diagnostics
    }

    pub fn into_analysis(mut self, nodes: Vec<Node>) -> Analysis {
        let diagnostics = self.finish();
        Analysis {
            stopped: self.errors.should_stop(),
            diagnostics,
            program: Program {
                nodes,
                types: self.types,
                operators: self.operators,
            },
        }
    }

    fn emit(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        match self.blocks.last_mut() {
            Some(block) => {
                block.nodes.extend(nodes);
                Vec::new()
            }
            None => nodes,
        }
    }

    fn error(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.errors
            .push(Diagnostic::new(DiagnosticKind::Parser, message).with_span(span));
    }

    fn error_at(&mut self, line: usize, column: usize, message: impl Into<String>) {
        self.error(SourceSpan::point(line, column), message);
    }

    fn expect_end(&mut self, cursor: &mut Cursor<'_>, what: &str) -> bool {
        match cursor.peek() {
            None => true,
            Some(token) => {
                let message = format!("unexpected `{}` after {what}", token.lexeme);
                self.error(token.span, message);
                false
            }
        }
    }

    fn parse_var(&mut self, cursor: &mut Cursor<'_>) -> Vec<Node> {
        let mut nodes = Vec::new();
        let var_token = cursor.advance();
        let line = var_token.line();

        let Some(name_token) = cursor.advance_if(TokenKind::Name) else {
            self.error_at(line, var_token.span.end, "expected variable name");
            return nodes;
        };
        let Some(type_token) =
            cursor.advance_if_any(&[TokenKind::BuiltinType, TokenKind::Name, TokenKind::Vec])
        else {
            self.error_at(line, name_token.span.end, "expected variable type");
            return nodes;
        };

        let ty = match type_token.kind {
            TokenKind::BuiltinType => match ValueType::from_builtin_name(&type_token.lexeme) {
                Some(ty) => ty,
                None => {
                    let message = format!("builtin type `{}` is not supported", type_token.lexeme);
                    self.error(type_token.span, message);
                    ValueType::None
                }
            },
            TokenKind::Vec => {
                self.parse_vector_type(cursor, type_token);
                return nodes;
            }
            _ => self.user_type_reference(type_token),
        };

        let name = name_token.lexeme.clone();
        nodes.push(Node::declare(name.clone(), ty));
        self.bind_symbol(name.clone(), ty);

        if cursor.is_at_end() {
            return nodes;
        }
        if cursor.advance_if(TokenKind::Assign).is_none() {
            self.error_at(line, type_token.span.start, "expected `=` or end of line");
            self.errors.stop();
            return nodes;
        }
        let Some(value) = self.parse_expression(cursor) else {
            return nodes;
        };
        if self.expect_end(cursor, "expression") {
            nodes.push(Node::set(name, ty, value));
        }
        nodes
    }

    /// Resolves a type written as a plain name, leaving a deferred check behind when the
    /// name has not been declared yet.
    fn user_type_reference(&mut self, type_token: &Token) -> ValueType {
        let name = type_token.lexeme.as_str();
        let ty = self.types.type_of(name);
        let diagnostic = Diagnostic::new(
            DiagnosticKind::Analysis,
            format!("type {name} was never declared"),
        )
        .with_span(type_token.span);
        self.types.ensure_declared(DeferredCheck::new(name, diagnostic));
        ty
    }

    // `vec<T>` is recognised but has no runtime representation yet.
    fn parse_vector_type(&mut self, cursor: &mut Cursor<'_>, vec_token: &Token) {
        let structured = cursor.advance_if(TokenKind::LAngle).is_some()
            && cursor
                .advance_if_any(&[TokenKind::BuiltinType, TokenKind::Name])
                .is_some()
            && cursor.advance_if(TokenKind::RAngle).is_some();
        if !structured {
            self.error(vec_token.span, "expected `vec<type>`");
            return;
        }
        self.error(vec_token.span, "vector types are not supported yet");
    }

    fn parse_print(&mut self, cursor: &mut Cursor<'_>) -> Vec<Node> {
        let print_token = cursor.advance();
        if cursor.is_at_end() {
            self.error_at(
                print_token.line(),
                print_token.span.end,
                "expected expression after `print`",
            );
            return Vec::new();
        }
        let Some(argument) = self.parse_expression(cursor) else {
            return Vec::new();
        };
        if !self.expect_end(cursor, "expression") {
            return Vec::new();
        }
        vec![Node::Print(Box::new(argument))]
    }

    fn parse_type_declaration(&mut self, cursor: &mut Cursor<'_>) {
        let type_token = cursor.advance();
        let Some(name_token) = cursor.advance_if(TokenKind::Name) else {
            self.error_at(
                type_token.line(),
                type_token.span.end,
                "expected type name after `type`",
            );
            return;
        };
        if !self.expect_end(cursor, "type declaration") {
            return;
        }
        if let Err(AlreadyDeclared(_)) = self.types.declare(&name_token.lexeme) {
            let message = format!("type `{}` is already declared", name_token.lexeme);
            self.error(name_token.span, message);
        }
    }

    fn open_block(&mut self, cursor: &mut Cursor<'_>) {
        let brace = cursor.advance();
        self.expect_end(cursor, "`{`");
        self.blocks.push(OpenBlock {
            nodes: Vec::new(),
            span: brace.span,
        });
        self.symbols.push(IndexMap::new());
    }

    fn close_block(&mut self, cursor: &mut Cursor<'_>) -> Vec<Node> {
        let brace = cursor.advance();
        self.expect_end(cursor, "`}`");
        match self.blocks.pop() {
            Some(block) => {
                self.symbols.pop();
                vec![Node::Block(block.nodes)]
            }
            None => {
                self.error(brace.span, "unmatched `}`");
                Vec::new()
            }
        }
    }

    fn bind_symbol(&mut self, name: String, ty: ValueType) {
        if let Some(frame) = self.symbols.last_mut() {
            frame.insert(name, ty);
        }
    }

    fn lookup_symbol(&self, name: &str) -> Option<ValueType> {
        self.symbols
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    /// `operand (('+' | '-') operand)*`, left associative.
    fn parse_expression(&mut self, cursor: &mut Cursor<'_>) -> Option<Node> {
        let mut left = self.parse_operand(cursor)?;
        while let Some(operator) = cursor.advance_if_any(&[TokenKind::Plus, TokenKind::Minus]) {
            let right = self.parse_operand(cursor)?;
            left = self.combine(operator.kind, left, right);
        }
        Some(left)
    }

    fn combine(&self, operator: TokenKind, left: Node, right: Node) -> Node {
        let left_type = left.static_type(&self.operators);
        let right_type = right.static_type(&self.operators);
        let (left, right) = (Box::new(left), Box::new(right));
        match operator {
            TokenKind::Minus => Node::SubInt { left, right },
            _ if left_type == ValueType::Int && right_type == ValueType::Int => {
                Node::AddInt { left, right }
            }
            _ => Node::AddAny { left, right },
        }
    }

    fn parse_operand(&mut self, cursor: &mut Cursor<'_>) -> Option<Node> {
        let Some(token) = cursor.peek() else {
            let (line, column) = cursor.end_position();
            self.error_at(line, column, "expected expression");
            return None;
        };
        trace!(token = %token, "parsing operand");
        match token.kind {
            TokenKind::Number => {
                cursor.advance();
                self.parse_number(token)
            }
            TokenKind::True => {
                cursor.advance();
                Some(Node::Bool(true))
            }
            TokenKind::False => {
                cursor.advance();
                Some(Node::Bool(false))
            }
            TokenKind::Name => {
                cursor.advance();
                match self.lookup_symbol(&token.lexeme) {
                    Some(ty) => Some(Node::get(token.lexeme.clone(), ty)),
                    None => {
                        let message = format!("unknown variable `{}`", token.lexeme);
                        self.error(token.span, message);
                        None
                    }
                }
            }
            TokenKind::LParen => self.parse_tuple(cursor),
            TokenKind::String => {
                self.error(token.span, "string values are not supported yet");
                None
            }
            _ => {
                let message = format!("unexpected `{}` in expression", token.lexeme);
                self.error(token.span, message);
                None
            }
        }
    }

    fn parse_number(&mut self, token: &Token) -> Option<Node> {
        let text = token.lexeme.as_str();
        let node = if text.contains(['.', 'e']) {
            text.parse::<f64>().ok().map(Node::Float)
        } else {
            text.parse::<i64>().ok().map(Node::Int)
        };
        if node.is_none() {
            self.error(token.span, format!("malformed number literal `{text}`"));
        }
        node
    }

    /// `'(' expression* ')'`, elements separated by whitespace or commas.
    fn parse_tuple(&mut self, cursor: &mut Cursor<'_>) -> Option<Node> {
        cursor.advance();
        let mut elements = Vec::new();
        loop {
            match cursor.peek().map(|token| token.kind) {
                Some(TokenKind::RParen) => {
                    cursor.advance();
                    return Some(Node::Tuple(elements));
                }
                Some(TokenKind::Comma) => {
                    cursor.advance();
                }
                Some(_) => elements.push(self.parse_expression(cursor)?),
                None => {
                    let (line, column) = cursor.end_position();
                    self.error_at(line, column, "expected `)` to close tuple");
                    return None;
                }
            }
        }
    }
}

/// Walks the tokens of one line, skipping comments.
struct Cursor<'t> {
    tokens: Vec<&'t Token>,
    current: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .filter(|token| token.kind != TokenKind::Comment)
                .collect(),
            current: 0,
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.current).copied()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    // Only called after `peek` has confirmed a token is available.
    fn advance(&mut self) -> &'t Token {
        let token = self.tokens[self.current];
        self.current += 1;
        token
    }

    fn advance_if(&mut self, kind: TokenKind) -> Option<&'t Token> {
        self.advance_if_any(&[kind])
    }

    fn advance_if_any(&mut self, kinds: &[TokenKind]) -> Option<&'t Token> {
        let token = self.peek()?;
        if kinds.contains(&token.kind) {
            self.current += 1;
            Some(token)
        } else {
            None
        }
    }

    /// Line and column just past the last consumed token.
    fn end_position(&self) -> (usize, usize) {
        self.current
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|token| (token.line(), token.span.end))
            .unwrap_or((0, 0))
    }
}
