//! Readline wrapper with command and company-name completion.

use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Context, Editor, Helper};

/// Commands whose first argument is a company name
const NAME_COMMANDS: [&str; 2] = ["lookup", "search"];
const MAX_NAME_CANDIDATES: usize = 20;

pub struct CommandHelper {
    patterns: Vec<Vec<String>>,
    names: Vec<String>,
    hinter: HistoryHinter,
}

impl CommandHelper {
    pub fn new(patterns: &[&[&str]]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| p.iter().map(|s| s.to_string()).collect())
                .collect(),
            names: Vec::new(),
            hinter: HistoryHinter::default(),
        }
    }

    fn command_candidates(&self, tokens: &[&str], has_leading_slash: bool) -> Vec<String> {
        let prefix = tokens.last().copied().unwrap_or("");
        let fixed_tokens: Vec<String> = tokens[..tokens.len().saturating_sub(1)]
            .iter()
            .map(|t| t.trim_start_matches('/').to_lowercase())
            .collect();
        let prefix_lower = prefix.trim_start_matches('/').to_lowercase();

        self.patterns
            .iter()
            .filter(|pattern| pattern.len() >= tokens.len())
            .filter(|pattern| {
                fixed_tokens
                    .iter()
                    .zip(pattern.iter())
                    .all(|(typed, p)| p.eq_ignore_ascii_case(typed))
            })
            .map(|pattern| &pattern[tokens.len() - 1])
            .filter(|candidate| candidate.to_lowercase().starts_with(&prefix_lower))
            .map(|candidate| {
                if tokens.len() == 1 && has_leading_slash {
                    format!("/{} ", candidate)
                } else {
                    format!("{} ", candidate)
                }
            })
            .collect()
    }

    fn name_candidates(&self, prefix: &str) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }
        self.names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .take(MAX_NAME_CANDIDATES)
            .map(|name| format!("{} ", name))
            .collect()
    }
}

impl Helper for CommandHelper {}
impl Validator for CommandHelper {}
impl Highlighter for CommandHelper {}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let before = &line[..pos];
        let mut tokens: Vec<&str> = before.split_whitespace().collect();

        // Treat trailing space as start of a new token
        if before.chars().last().is_some_and(|c| c.is_whitespace()) {
            tokens.push("");
        }
        if tokens.is_empty() {
            tokens.push("");
        }

        let prefix = tokens.last().copied().unwrap_or("");
        let start = pos.saturating_sub(prefix.len());
        let has_leading_slash = tokens[0].starts_with('/');
        let command = tokens[0].trim_start_matches('/').to_lowercase();

        let mut replacements = if tokens.len() == 2 && NAME_COMMANDS.contains(&command.as_str()) {
            self.name_candidates(prefix)
        } else {
            self.command_candidates(&tokens, has_leading_slash)
        };

        // Several patterns can share a token
        replacements.sort();
        replacements.dedup();

        let matches = replacements
            .into_iter()
            .map(|replacement| Pair {
                display: replacement.clone(),
                replacement,
            })
            .collect();
        Ok((start, matches))
    }
}

/// Thin wrapper over `rustyline::Editor` with preset commands and history path.
pub struct Readline {
    editor: Editor<CommandHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Readline {
    pub fn new(
        command_patterns: &[&[&str]],
        history_path: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .build();
        let helper = CommandHelper::new(command_patterns);
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(helper));

        let history_path = history_path.unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".krxdash").join("history")
        });

        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = editor.load_history(&history_path) {
            tracing::debug!("No history loaded from {}: {}", history_path.display(), e);
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Company names offered after `lookup` and `search`
    pub fn set_company_names(&mut self, mut names: Vec<String>) {
        names.sort();
        names.dedup();
        if let Some(helper) = self.editor.helper_mut() {
            helper.names = names;
        }
    }

    pub fn readline(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        let line = self.editor.readline(prompt)?;
        if !line.trim().is_empty() {
            let _ = self.editor.add_history_entry(line.as_str());
            let _ = self.editor.append_history(&self.history_path);
        }
        Ok(line)
    }

    /// Utility for tests to inspect completions without invoking terminal input.
    pub fn completions(&self, line: &str) -> Vec<String> {
        self.completions_with_start(line)
            .into_iter()
            .map(|(_, replacement)| replacement)
            .collect()
    }

    /// Return completions alongside the replacement start index (for tests).
    pub fn completions_with_start(&self, line: &str) -> Vec<(usize, String)> {
        if let Some(helper) = self.editor.helper() {
            let pos = line.len();
            let history = self.editor.history();
            if let Ok((start, pairs)) = helper.complete(line, pos, &Context::new(history)) {
                return pairs.into_iter().map(|p| (start, p.replacement)).collect();
            }
        }
        Vec::new()
    }
}
