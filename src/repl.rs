use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    diagnostics::{Result, SableError},
    runtime::{Interpreter, RuntimeOptions},
};

pub struct Repl {
    interpreter: Interpreter,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new(RuntimeOptions::default())
    }
}

impl Repl {
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            interpreter: Interpreter::with_output(std::io::stdout(), options),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| {
            SableError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
        })?;
        loop {
            match editor.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed == ":scope" {
                        println!("{}", self.interpreter.runtime().current_scope());
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.interpreter.eval_line(&line) {
                        Ok(diagnostics) => {
                            for diagnostic in diagnostics {
                                eprintln!("{diagnostic}");
                            }
                        }
                        Err(err) => eprintln!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    return Err(SableError::from(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        err,
                    )));
                }
            }
        }
        for diagnostic in self.interpreter.finish() {
            eprintln!("{diagnostic}");
        }
        Ok(())
    }
}
