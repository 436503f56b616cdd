use std::io::{self, Write};

use tracing::{debug, warn};

use crate::{
    ast::Node,
    checker::TypeRegistry,
    diagnostics::{Diagnostic, DiagnosticKind, Result, SableError},
    environment::Scope,
    operators::{Combine, OperatorTable},
    parser::{self, Parser, Program},
    value::{Value, ValueType},
};

/// Knobs for statement execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Abort `run` on the first evaluation error instead of moving to the next statement.
    pub halt_on_error: bool,
}

/// Tree-walking evaluator.
///
/// Every evaluated node leaves its result in a single "last value" register which the
/// enclosing node reads back. Variables live in a stack of [`Scope`] frames whose bottom
/// frame is the global scope.
pub struct Runtime<W: Write = io::Stdout> {
    program: Vec<Node>,
    types: TypeRegistry,
    operators: OperatorTable,
    scopes: Vec<Scope>,
    last: Option<Value>,
    pc: usize,
    options: RuntimeOptions,
    diagnostics: Vec<Diagnostic>,
    out: W,
}

impl Runtime {
    pub fn new(program: Program) -> Self {
        Self::with_output(program, io::stdout(), RuntimeOptions::default())
    }
}

impl<W: Write> Runtime<W> {
    pub fn with_output(program: Program, out: W, options: RuntimeOptions) -> Self {
        Self {
            program: program.nodes,
            types: program.types,
            operators: program.operators,
            scopes: vec![Scope::new()],
            last: None,
            pc: 0,
            options,
            diagnostics: Vec::new(),
            out,
        }
    }

    /// Appends statements to the program; the next `run` picks up where the last stopped.
    pub fn extend(&mut self, nodes: Vec<Node>, types: &TypeRegistry) {
        self.program.extend(nodes);
        self.types = types.clone();
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

    /// Executes statements from the program counter to the end of the program.
    ///
    /// Evaluation errors are recorded and execution continues with the next statement
    /// unless `halt_on_error` is set.
    pub fn run(&mut self) -> Result<()> {
        while self.pc < self.program.len() {
            let index = self.pc;
            debug!(statement = index, "executing");
            let node = self.program[index].clone();
            let outcome = self.execute(&node);
            self.pc += 1;
            if let Err(diagnostic) = outcome {
                let diagnostic = diagnostic.with_note(format!("while executing statement {index}"));
                warn!(statement = index, message = %diagnostic.message, "evaluation error");
                if self.options.halt_on_error {
                    return Err(SableError::Diagnostic(diagnostic));
                }
                self.diagnostics.push(diagnostic);
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn last_value(&self) -> Option<&Value> {
        self.last.as_ref()
    }

    pub fn program_counter(&self) -> usize {
        self.pc
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn global_scope(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn current_scope(&self) -> &Scope {
        self.top()
    }

    pub fn current_scope_mut(&mut self) -> &mut Scope {
        self.top_mut()
    }

    /// Value bound to `name` in the current frame, if it has been assigned.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.top().get(name).flatten()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn top(&self) -> &Scope {
        // The global frame is never popped, so the stack is never empty.
        &self.scopes[self.scopes.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Pushes a frame holding a snapshot of the enclosing frame's bindings. Later writes
    /// to the enclosing frame are not visible through it.
    pub fn push_inheriting_scope(&mut self) {
        let mut scope = Scope::new();
        scope.merge(self.top());
        self.scopes.push(scope);
    }

    /// Pushes a frame that only sees the global bindings, as a function body would.
    pub fn push_isolated_scope(&mut self) {
        let mut scope = Scope::new();
        scope.merge(&self.scopes[0]);
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> std::result::Result<Scope, Diagnostic> {
        if self.scopes.len() <= 1 {
            return Err(Diagnostic::new(
                DiagnosticKind::Runtime,
                "cannot pop the global scope",
            ));
        }
        self.scopes
            .pop()
            .ok_or_else(|| Diagnostic::new(DiagnosticKind::Runtime, "scope stack is empty"))
    }

    fn error(&self, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Runtime, message)
    }

    fn describe(&self, ty: ValueType) -> String {
        self.types.describe(ty)
    }

    fn execute(&mut self, node: &Node) -> std::result::Result<(), Diagnostic> {
        match node {
            Node::Declare { name, .. } => {
                self.top_mut().define(name.clone(), None);
            }
            Node::Set { name, value, .. } => {
                self.execute(value)?;
                let result = self.last.clone();
                self.top_mut().define(name.clone(), result);
            }
            Node::Get { name, .. } => {
                let binding = self.top().get(name).map(|value| value.cloned());
                match binding {
                    Some(value) => self.last = value,
                    None => {
                        self.last = None;
                        return Err(self.error(format!("undefined variable `{name}`")));
                    }
                }
            }
            Node::Bool(value) => self.last = Some(Value::Bool(*value)),
            Node::Int(value) => self.last = Some(Value::Int(*value)),
            Node::Float(value) => self.last = Some(Value::Float(*value)),
            Node::Tuple(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    self.execute(element)?;
                    values.push(self.last.clone());
                }
                self.last = Some(Value::Tuple(values));
            }
            Node::AddInt { left, right } => {
                let (lhs, rhs) = self.int_operands(left, right)?;
                self.last = Some(Value::Int(lhs.wrapping_add(rhs)));
            }
            Node::SubInt { left, right } => {
                let (lhs, rhs) = self.int_operands(left, right)?;
                self.last = Some(Value::Int(lhs.wrapping_sub(rhs)));
            }
            Node::AddAny { left, right } => self.add_any(left, right)?,
            Node::Print(argument) => {
                self.execute(argument)?;
                self.print_last()?;
            }
            Node::Block(statements) => {
                self.push_inheriting_scope();
                let outcome = self.execute_block(statements);
                self.pop_scope()?;
                outcome?;
            }
        }
        Ok(())
    }

    // A failing entry is recorded and the block moves on, unless `halt_on_error` is set.
    fn execute_block(&mut self, statements: &[Node]) -> std::result::Result<(), Diagnostic> {
        for (entry, statement) in statements.iter().enumerate() {
            if let Err(diagnostic) = self.execute(statement) {
                if self.options.halt_on_error {
                    return Err(diagnostic);
                }
                let diagnostic = diagnostic.with_note(format!(
                    "while executing block entry {entry} of statement {}",
                    self.pc
                ));
                warn!(
                    statement = self.pc,
                    entry,
                    message = %diagnostic.message,
                    "evaluation error in block"
                );
                self.diagnostics.push(diagnostic);
            }
        }
        Ok(())
    }

    // Non-integer or absent operands count as zero.
    fn int_operands(
        &mut self,
        left: &Node,
        right: &Node,
    ) -> std::result::Result<(i64, i64), Diagnostic> {
        self.execute(left)?;
        let lhs = self.last.as_ref().and_then(Value::as_int).unwrap_or(0);
        self.execute(right)?;
        let rhs = self.last.as_ref().and_then(Value::as_int).unwrap_or(0);
        Ok((lhs, rhs))
    }

    fn add_any(&mut self, left: &Node, right: &Node) -> std::result::Result<(), Diagnostic> {
        let left_type = left.static_type(&self.operators);
        let right_type = right.static_type(&self.operators);
        let Some(operation) = self.operators.lookup(left_type, right_type).copied() else {
            return Err(self.error(format!(
                "no overloaded operator exists between {} and {}",
                self.describe(left_type),
                self.describe(right_type)
            )));
        };
        self.execute(left)?;
        let lhs = self.last.take();
        self.execute(right)?;
        let rhs = self.last.take();
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                self.last = Some((operation.apply)(&lhs, &rhs));
                Ok(())
            }
            _ => Err(self.error("operand of `+` has no value")),
        }
    }

    fn print_last(&mut self) -> std::result::Result<(), Diagnostic> {
        let text = match &self.last {
            Some(Value::Int(n)) => n.to_string(),
            Some(Value::Float(n)) => n.to_string(),
            Some(Value::Tuple(values)) => Value::tuple_text(values),
            Some(other) => {
                return Err(self.error(format!(
                    "printing a {} value is not supported yet",
                    other.value_type()
                )));
            }
            None => return Err(self.error("cannot print a value that was never assigned")),
        };
        writeln!(self.out, "{text}")
            .map_err(|err| self.error(format!("failed to write output: {err}")))
    }
}

/// Ties the parser and the runtime together for whole scripts and for line-by-line use.
pub struct Interpreter<W: Write = io::Stdout> {
    parser: Parser,
    runtime: Runtime<W>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(io::stdout(), RuntimeOptions::default())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(out: W, options: RuntimeOptions) -> Self {
        let parser = Parser::new();
        let program = Program {
            nodes: Vec::new(),
            types: parser.types().clone(),
            operators: parser.operators().clone(),
        };
        Self {
            runtime: Runtime::with_output(program, out, options),
            parser,
        }
    }

    pub fn runtime(&self) -> &Runtime<W> {
        &self.runtime
    }

    pub fn into_output(self) -> W {
        self.runtime.into_output()
    }

    /// Makes an overload visible to both static typing and evaluation.
    pub fn register_operator(
        &mut self,
        left: ValueType,
        right: ValueType,
        result: ValueType,
        apply: Combine,
    ) {
        self.parser.register_operator(left, right, result, apply);
        self.runtime.register_operator(left, right, result, apply);
    }

    /// Analyses a complete unit and runs it when analysis reported nothing.
    ///
    /// The unit shares variables and types with earlier calls and with
    /// [`Interpreter::eval_line`]. Deferred checks still open from earlier lines are
    /// judged together with the unit's own. A rejected unit is forgotten entirely.
    ///
    /// Returns the evaluation diagnostics that did not halt execution.
    pub fn eval_source(&mut self, source: &str) -> Result<Vec<Diagnostic>> {
        let checkpoint = self.parser.checkpoint();
        let nodes = self.parser.parse_source(source);
        let diagnostics = self.parser.finish();
        self.parser.resume();
        if !diagnostics.is_empty() {
            self.parser.rollback(checkpoint);
            return Err(SableError::Diagnostics(diagnostics));
        }
        self.runtime.extend(nodes, self.parser.types());
        self.runtime.run()?;
        Ok(self.runtime.take_diagnostics())
    }

    /// Feeds one line to the long-lived parser and executes whatever it completes.
    /// Deferred type checks stay open until [`Interpreter::finish`]. A line with
    /// diagnostics is discarded along with the variables it declared.
    pub fn eval_line(&mut self, line: &str) -> Result<Vec<Diagnostic>> {
        let checkpoint = self.parser.checkpoint();
        let nodes = self.parser.push_line(line);
        let diagnostics = self.parser.drain_diagnostics();
        self.parser.resume();
        if !diagnostics.is_empty() {
            self.parser.rollback(checkpoint);
            return Err(SableError::Diagnostics(diagnostics));
        }
        self.runtime.extend(nodes, self.parser.types());
        self.runtime.run()?;
        Ok(self.runtime.take_diagnostics())
    }

    /// Reports deferred checks that are still unsatisfied and unclosed blocks.
    pub fn finish(&mut self) -> Vec<Diagnostic> {
        self.parser.finish()
    }
}

/// Analyses and runs `source` against standard output.
pub fn run_source(source: &str, options: RuntimeOptions) -> Result<Vec<Diagnostic>> {
    let analysis = parser::analyze(source);
    if !analysis.is_ok() {
        return Err(SableError::Diagnostics(analysis.diagnostics));
    }
    let mut runtime = Runtime::with_output(analysis.program, io::stdout(), options);
    runtime.run()?;
    Ok(runtime.take_diagnostics())
}
