// 🖥️ Console - the command dispatcher
//
// Reads one line at a time, resolves it to one of the six store commands
// (canonical or dotted spelling), validates class and id against the
// registry, applies the change and prints the result. User mistakes are
// printed and the loop continues; store failures end the session.

use crate::config::DEFAULT_PROMPT;
use crate::entities::{registry_key, resolve_kind, Kind};
use crate::error::{CommandError, ConsoleError};
use crate::grammar::{self, Verb};
use crate::literal;
use crate::registry::Registry;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};
use tracing::debug;

/// Whether the loop keeps reading after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const QUIT_HELP: &str = "Quit command to exit the program.";
const EOF_HELP: &str = "EOF signal to exit the program.";
const HELP_HELP: &str = "List available commands with \"help\" or detailed help with \"help cmd\".";

pub struct Console<'a, W: Write> {
    registry: &'a mut Registry,
    out: W,
    prompt: String,
}

impl<'a, W: Write> Console<'a, W> {
    pub fn new(registry: &'a mut Registry, out: W) -> Self {
        Console {
            registry,
            out,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    /// Builder: replace the prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    // ========================================================================
    // LOOP
    // ========================================================================

    /// Prompt, read, execute until `quit` or end of input
    pub fn run<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        let mut line = String::new();
        loop {
            write!(self.out, "{}", self.prompt)?;
            self.out.flush()?;

            line.clear();
            let read = input.read_line(&mut line).context("failed to read input")?;
            if read == 0 {
                writeln!(self.out)?;
                return Ok(());
            }

            if self.execute(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Execute a single input line
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        let (name, arg) = grammar::split_command(line);
        debug!(command = name, "dispatching");

        let result = match name {
            "quit" => return Ok(Flow::Quit),
            "EOF" => {
                writeln!(self.out)?;
                return Ok(Flow::Quit);
            }
            "help" => self.do_help(arg),
            _ => match Verb::from_name(name) {
                Some(verb) => self.dispatch(verb, arg),
                None => self.default(line),
            },
        };

        match result {
            Ok(()) => Ok(Flow::Continue),
            Err(ConsoleError::Command(err)) => {
                writeln!(self.out, "{}", err)?;
                Ok(Flow::Continue)
            }
            Err(ConsoleError::Syntax(_)) => {
                writeln!(self.out, "{}", CommandError::UnknownSyntax(line.to_string()))?;
                Ok(Flow::Continue)
            }
            Err(err) => Err(anyhow::Error::new(err).context(format!("command failed: {}", line))),
        }
    }

    /// Lines that are not a known command: try the dotted spelling
    fn default(&mut self, line: &str) -> Result<(), ConsoleError> {
        match grammar::rewrite_dotted(line) {
            Some((verb, args)) => self.dispatch(verb, &args),
            None => Err(CommandError::UnknownSyntax(line.to_string()).into()),
        }
    }

    fn dispatch(&mut self, verb: Verb, arg: &str) -> Result<(), ConsoleError> {
        let args = grammar::parse_args(arg)?;
        match verb {
            Verb::Create => self.do_create(&args),
            Verb::Show => self.do_show(&args),
            Verb::Destroy => self.do_destroy(&args),
            Verb::All => self.do_all(&args),
            Verb::Count => self.do_count(&args),
            Verb::Update => self.do_update(&args),
        }
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    fn require_kind(args: &[String]) -> Result<Kind, CommandError> {
        let name = args.first().ok_or(CommandError::ClassNameMissing)?;
        resolve_kind(name).ok_or(CommandError::ClassDoesntExist)
    }

    fn require_instance(&self, args: &[String]) -> Result<(Kind, String), CommandError> {
        let kind = Self::require_kind(args)?;
        let id = args.get(1).ok_or(CommandError::InstanceIdMissing)?;
        if !self.registry.contains(kind, id) {
            return Err(CommandError::NoInstanceFound);
        }
        Ok((kind, id.clone()))
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    fn do_create(&mut self, args: &[String]) -> Result<(), ConsoleError> {
        let kind = Self::require_kind(args)?;
        let id = self.registry.create(kind).id.clone();
        writeln!(self.out, "{}", id)?;
        self.registry.persist()?;
        Ok(())
    }

    fn do_show(&mut self, args: &[String]) -> Result<(), ConsoleError> {
        let (kind, id) = self.require_instance(args)?;
        if let Some(entity) = self.registry.get(kind, &id) {
            writeln!(self.out, "{}", entity.describe())?;
        }
        Ok(())
    }

    fn do_destroy(&mut self, args: &[String]) -> Result<(), ConsoleError> {
        let (kind, id) = self.require_instance(args)?;
        self.registry.remove(kind, &id);
        self.registry.persist()?;
        Ok(())
    }

    fn do_all(&mut self, args: &[String]) -> Result<(), ConsoleError> {
        let kind = match args.first() {
            Some(name) => Some(resolve_kind(name).ok_or(CommandError::ClassDoesntExist)?),
            None => None,
        };

        let listed: Vec<String> = self
            .registry
            .instances(kind)
            .map(|entity| quote_listed(&entity.describe()))
            .collect();
        writeln!(self.out, "[{}]", listed.join(", "))?;
        Ok(())
    }

    fn do_count(&mut self, args: &[String]) -> Result<(), ConsoleError> {
        let count = match args.first() {
            Some(name) => resolve_kind(name).map_or(0, |kind| self.registry.count(Some(kind))),
            None => self.registry.count(None),
        };
        writeln!(self.out, "{}", count)?;
        Ok(())
    }

    fn do_update(&mut self, args: &[String]) -> Result<(), ConsoleError> {
        let (kind, id) = self.require_instance(args)?;
        let field = args.get(2).ok_or(CommandError::AttributeNameMissing)?;

        let changes: Vec<(String, Value)> = if let Some(raw) = args.get(3) {
            let value = self.coerce(kind, field, Value::String(raw.clone()))?;
            vec![(field.clone(), value)]
        } else if grammar::is_dict_literal(field) {
            let pairs = literal::parse_dict(field).map_err(|_| CommandError::MalformedDictionary)?;
            pairs
                .into_iter()
                .map(|(name, value)| -> Result<(String, Value), CommandError> {
                    let value = self.coerce_dict_value(kind, &name, value)?;
                    Ok((name, value))
                })
                .collect::<Result<Vec<_>, CommandError>>()?
        } else {
            return Err(CommandError::ValueMissing.into());
        };

        let key = registry_key(kind, &id);
        let entity = self
            .registry
            .all_mut()
            .get_mut(&key)
            .ok_or(CommandError::NoInstanceFound)?;

        // All-or-nothing: apply to a copy, swap in only if every change fits
        let mut updated = entity.clone();
        for (name, value) in changes {
            updated.set_attribute(&name, value)?;
        }
        *entity = updated;

        debug!(%key, "entity updated");
        self.registry.touch(&key)?;
        Ok(())
    }

    /// Declared fields take their declared type; anything else is kept as given
    fn coerce(&self, kind: Kind, field: &str, value: Value) -> Result<Value, CommandError> {
        match self.registry.attribute_schema().type_of(kind, field) {
            Some(declared) => declared.coerce(field, &value),
            None => Ok(value),
        }
    }

    /// Like `coerce`, except list fields keep the dictionary's value untouched
    fn coerce_dict_value(&self, kind: Kind, field: &str, value: Value) -> Result<Value, CommandError> {
        match self.registry.attribute_schema().type_of(kind, field) {
            Some(declared) if declared.converts_dict_values() => declared.coerce(field, &value),
            _ => Ok(value),
        }
    }

    fn do_help(&mut self, topic: &str) -> Result<(), ConsoleError> {
        let topic = topic.trim();
        if topic.is_empty() {
            let mut names: Vec<&str> = Verb::ALL.iter().map(|verb| verb.name()).collect();
            names.extend(["EOF", "help", "quit"]);
            names.sort_unstable();

            let header = "Documented commands (type help <topic>):";
            writeln!(self.out)?;
            writeln!(self.out, "{}", header)?;
            writeln!(self.out, "{}", "=".repeat(header.len()))?;
            writeln!(self.out, "{}", names.join("  "))?;
            writeln!(self.out)?;
            return Ok(());
        }

        let text = match topic {
            "quit" => QUIT_HELP,
            "EOF" => EOF_HELP,
            "help" => HELP_HELP,
            other => match Verb::from_name(other) {
                Some(verb) => verb.usage(),
                None => {
                    writeln!(self.out, "*** No help on {}", other)?;
                    return Ok(());
                }
            },
        };
        writeln!(self.out, "{}", text)?;
        Ok(())
    }
}

/// One element of the `all` listing, in double quotes
fn quote_listed(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

// ============================================================================
// TESTS
// ============================================================================
