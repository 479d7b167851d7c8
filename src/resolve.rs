// Operator-facing ambiguity resolution.
//
// The matching core stays pure; whenever a name resolves to zero or several
// roster members, the importer asks a Resolver to pick exactly one. The
// console implementation blocks on stdin; tests and scripted runs supply a
// ScriptedResolver instead.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::debug;

use crate::roster::Candidate;

/// Default bound on re-prompt loops. Human operators rarely need more than
/// a couple of tries; scripted input that keeps feeding garbage must not
/// loop forever.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("operator aborted while resolving {context}")]
    Aborted { context: String },

    #[error("no valid choice after {attempts} attempts while resolving {context}")]
    AttemptsExhausted { context: String, attempts: u32 },

    #[error("prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous request/response seam for human-in-the-loop decisions.
pub trait Resolver {
    /// Resolve `context` (a description like `player "Jon Smyth" on Team
    /// Adams`) to exactly one roster member id. `candidates` is the matcher
    /// output (possibly empty); `suggestions` are last-name near-misses
    /// shown when `candidates` is empty. The full roster is available for
    /// direct-id entry.
    fn choose(
        &mut self,
        context: &str,
        candidates: &[Candidate],
        suggestions: &[Candidate],
        roster: &[Candidate],
    ) -> Result<i64, ResolveError>;

    /// Ask a yes/no question (commit confirmation, continue-after-error).
    fn confirm(&mut self, question: &str) -> Result<bool, ResolveError>;
}

// ---------------------------------------------------------------------------
// Console implementation
// ---------------------------------------------------------------------------

/// Prompts on a writer, reads answers from a reader. Production code wires
/// this to locked stdin/stdout; unit tests feed it byte slices.
pub struct ConsoleResolver<R, W> {
    reader: R,
    writer: W,
    max_attempts: u32,
}

impl ConsoleResolver<std::io::StdinLock<'static>, std::io::StdoutLock<'static>> {
    /// Console resolver over the process's stdin/stdout.
    pub fn stdio(max_attempts: u32) -> Self {
        ConsoleResolver {
            reader: std::io::stdin().lock(),
            writer: std::io::stdout().lock(),
            max_attempts,
        }
    }
}

impl<R: BufRead, W: Write> ConsoleResolver<R, W> {
    pub fn new(reader: R, writer: W, max_attempts: u32) -> Self {
        ConsoleResolver {
            reader,
            writer,
            max_attempts,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, ResolveError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None); // EOF
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Resolver for ConsoleResolver<R, W> {
    fn choose(
        &mut self,
        context: &str,
        candidates: &[Candidate],
        suggestions: &[Candidate],
        roster: &[Candidate],
    ) -> Result<i64, ResolveError> {
        let listed: &[Candidate] = if candidates.is_empty() {
            suggestions
        } else {
            candidates
        };

        writeln!(self.writer, "\nResolving {context}")?;
        if candidates.is_empty() && !suggestions.is_empty() {
            writeln!(self.writer, "No direct match; similar last names:")?;
        }
        for (idx, c) in listed.iter().enumerate() {
            writeln!(self.writer, "  [{}] {}", idx + 1, c.describe())?;
        }
        writeln!(self.writer, "  [0] none of these (enter a user id)")?;

        for attempt in 1..=self.max_attempts {
            write!(self.writer, "Choice (number, user id, or 'q' to abort): ")?;
            self.writer.flush()?;

            let line = match self.read_line()? {
                Some(line) => line,
                None => {
                    // EOF on stdin: treat as an abort, not an infinite loop.
                    return Err(ResolveError::Aborted {
                        context: context.to_string(),
                    });
                }
            };

            if line.eq_ignore_ascii_case("q") {
                return Err(ResolveError::Aborted {
                    context: context.to_string(),
                });
            }

            if line == "0" {
                // "none of these": ask for a user id outright.
                write!(self.writer, "User id: ")?;
                self.writer.flush()?;
                let id_line = match self.read_line()? {
                    Some(l) => l,
                    None => {
                        return Err(ResolveError::Aborted {
                            context: context.to_string(),
                        });
                    }
                };
                if let Ok(id) = id_line.parse::<i64>() {
                    if roster.iter().any(|c| c.id == id) {
                        return Ok(id);
                    }
                }
                debug!(attempt, input = %id_line, "unknown user id, re-prompting");
                writeln!(self.writer, "Unknown user id `{id_line}`, try again.")?;
                continue;
            }

            if let Ok(n) = line.parse::<usize>() {
                // List indexes take precedence over ids for in-range values.
                if n >= 1 && n <= listed.len() {
                    return Ok(listed[n - 1].id);
                }
                // Maybe the operator typed a user id directly.
                let id = n as i64;
                if roster.iter().any(|c| c.id == id) {
                    return Ok(id);
                }
            }

            debug!(attempt, input = %line, "unrecognized choice, re-prompting");
            writeln!(self.writer, "Unrecognized choice `{line}`, try again.")?;
        }

        Err(ResolveError::AttemptsExhausted {
            context: context.to_string(),
            attempts: self.max_attempts,
        })
    }

    fn confirm(&mut self, question: &str) -> Result<bool, ResolveError> {
        for _ in 0..self.max_attempts {
            write!(self.writer, "{question} [y/n]: ")?;
            self.writer.flush()?;
            let line = match self.read_line()? {
                Some(line) => line.to_lowercase(),
                None => return Ok(false),
            };
            match line.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.writer, "Please answer y or n.")?,
            }
        }
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Scripted implementation (tests, non-interactive runs)
// ---------------------------------------------------------------------------

/// Replays a fixed sequence of answers. `choose` pops the next id from
/// `choices`; `confirm` pops from `confirmations` (defaulting to yes when
/// the queue runs dry, so happy-path tests don't have to enumerate every
/// confirmation).
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    pub choices: VecDeque<i64>,
    pub confirmations: VecDeque<bool>,
    /// Every context string this resolver was asked about, for assertions.
    pub asked: Vec<String>,
}

impl ScriptedResolver {
    pub fn with_choices(choices: impl IntoIterator<Item = i64>) -> Self {
        ScriptedResolver {
            choices: choices.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl Resolver for ScriptedResolver {
    fn choose(
        &mut self,
        context: &str,
        _candidates: &[Candidate],
        _suggestions: &[Candidate],
        _roster: &[Candidate],
    ) -> Result<i64, ResolveError> {
        self.asked.push(context.to_string());
        self.choices.pop_front().ok_or(ResolveError::Aborted {
            context: context.to_string(),
        })
    }

    fn confirm(&mut self, _question: &str) -> Result<bool, ResolveError> {
        Ok(self.confirmations.pop_front().unwrap_or(true))
    }
}
