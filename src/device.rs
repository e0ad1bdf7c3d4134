//! Prompt and mode tracking for a device CLI.
//!
//! Every line the device prints is classified into a state: plain output, a
//! pagination marker, an error message, one of the prompt modes declared by
//! the template (login, enable, config, ...) or a state that asks for input
//! (for example the enable password). The handler remembers the last mode it
//! saw and computes the commands needed to move to another mode.

use std::collections::{HashMap, HashSet, VecDeque};

use log::trace;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::error::ConnectError;

const OUTPUT: usize = 0;
const MORE: usize = 1;
const ERROR: usize = 2;

/// States every handler starts with, in index order.
const PRE_STATES: [&str; 3] = ["output", "more", "error"];

/// Dynamic parameter holding the enable secret followed by a newline.
pub const ENABLE_PASSWORD: &str = "EnablePassword";

/// A command that moves the device from one mode to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: String,
    pub command: String,
    pub to: String,
}

impl Transition {
    pub fn new(from: &str, command: &str, to: &str) -> Self {
        Self {
            from: from.to_ascii_lowercase(),
            command: command.to_string(),
            to: to.to_ascii_lowercase(),
        }
    }
}

/// What to type when the device asks for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAnswer {
    /// Send this text as is.
    Static(String),
    /// Send the value of a dynamic parameter, e.g. [`ENABLE_PASSWORD`].
    Param(String),
}

/// A state in which the device waits for the operator to type something.
#[derive(Debug, Clone)]
pub struct InputRule {
    pub state: String,
    pub answer: InputAnswer,
    pub patterns: Vec<String>,
}

impl InputRule {
    pub fn new<I, S>(state: &str, answer: InputAnswer, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            state: state.to_ascii_lowercase(),
            answer,
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_string())
                .collect(),
        }
    }
}

pub struct DeviceHandler {
    current_state_index: usize,

    /// Normalized (lowercase) state names, indexed by state index.
    all_states: Vec<String>,

    /// Every pattern of every state, matched in one pass.
    all_regex: RegexSet,

    /// Pattern index in `all_regex` -> state index.
    regex_index_map: Vec<usize>,

    /// Inclusive range of prompt state indices.
    prompt_index: (usize, usize),

    /// Input state name -> answer.
    input_map: HashMap<String, InputAnswer>,

    transitions: Vec<Transition>,

    ignore_errors: Option<RegexSet>,

    /// Values for [`InputAnswer::Param`].
    dyn_param: HashMap<String, String>,

    /// Last prompt line recognised.
    current_prompt: Option<String>,
}

impl DeviceHandler {
    /// Builds a handler from a template description.
    ///
    /// * `prompts` - (mode, patterns) pairs; earlier entries win when two
    ///   patterns match the same line. Patterns are anchored to the start of
    ///   the line and may be preceded by NULs and one carriage return.
    /// * `inputs` - states that require an answer from us
    /// * `more_regex` - pagination markers, answered with a space
    /// * `error_regex` - device error messages
    /// * `transitions` - mode graph used by [`trans_state_write`](Self::trans_state_write)
    /// * `ignore_errors` - error lines that should be treated as output
    pub fn new<I, S>(
        prompts: Vec<(&str, I)>,
        inputs: Vec<InputRule>,
        more_regex: I,
        error_regex: I,
        transitions: Vec<Transition>,
        ignore_errors: I,
    ) -> Result<DeviceHandler, ConnectError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let mut all_states: Vec<String> = PRE_STATES.iter().map(|s| s.to_string()).collect();
        let mut regexs: Vec<String> = Vec::new();
        let mut regex_index_map = Vec::new();

        for pattern in more_regex {
            regexs.push(pattern.as_ref().to_string());
            regex_index_map.push(MORE);
        }
        for pattern in error_regex {
            regexs.push(pattern.as_ref().to_string());
            regex_index_map.push(ERROR);
        }

        let prompt_start = all_states.len();
        for (state, patterns) in prompts {
            let state_index = all_states.len();
            all_states.push(state.to_ascii_lowercase());
            for pattern in patterns {
                regexs.push(format!(
                    r"^\x00*\r?{}",
                    pattern.as_ref().trim_start_matches('^')
                ));
                regex_index_map.push(state_index);
            }
        }
        if all_states.len() == prompt_start {
            return Err(ConnectError::InvalidDeviceHandlerConfig(
                "at least one prompt mode is required".to_string(),
            ));
        }
        let prompt_index = (prompt_start, all_states.len() - 1);

        let mut input_map = HashMap::new();
        input_map.insert("more".to_string(), InputAnswer::Static(" ".to_string()));
        for rule in inputs {
            let state_index = all_states.len();
            all_states.push(rule.state.clone());
            for pattern in &rule.patterns {
                regexs.push(pattern.clone());
                regex_index_map.push(state_index);
            }
            input_map.insert(rule.state, rule.answer);
        }

        let all_regex = RegexSet::new(&regexs).map_err(|err| {
            ConnectError::InvalidDeviceHandlerConfig(format!(
                "failed to build state regex set: {err}"
            ))
        })?;

        let ignore: Vec<String> = ignore_errors
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let ignore_errors = if ignore.is_empty() {
            None
        } else {
            Some(RegexSet::new(&ignore).map_err(|err| {
                ConnectError::InvalidDeviceHandlerConfig(format!(
                    "invalid ignore_errors regex set: {err}"
                ))
            })?)
        };

        let known: HashSet<&str> = all_states.iter().map(String::as_str).collect();
        if let Some(t) = transitions
            .iter()
            .find(|t| !known.contains(t.from.as_str()) || !known.contains(t.to.as_str()))
        {
            return Err(ConnectError::InvalidDeviceHandlerConfig(format!(
                "transition '{}' references unknown mode ({} -> {})",
                t.command, t.from, t.to
            )));
        }

        Ok(Self {
            current_state_index: OUTPUT,
            all_states,
            all_regex,
            regex_index_map,
            prompt_index,
            input_map,
            transitions,
            ignore_errors,
            dyn_param: HashMap::new(),
            current_prompt: None,
        })
    }

    /// Sets a dynamic parameter used by [`InputAnswer::Param`] answers.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.dyn_param.insert(key.to_string(), value.into());
    }

    /// Returns the state index a line belongs to. Unmatched lines are output.
    fn line2state(&self, line: &str) -> usize {
        self.all_regex
            .matches(line)
            .into_iter()
            .next()
            .and_then(|i| self.regex_index_map.get(i).copied())
            .unwrap_or(OUTPUT)
    }

    fn is_prompt_index(&self, index: usize) -> bool {
        let (start, end) = self.prompt_index;
        index >= start && index <= end
    }

    /// Feeds one line of device output and updates the current state.
    pub fn read(&mut self, line: &str) {
        trace!("Read line: '{:?}'", line);
        let state_index = self.line2state(line);
        if state_index == ERROR
            && self
                .ignore_errors
                .as_ref()
                .is_some_and(|set| set.is_match(line))
        {
            trace!("Ignoring error line");
            self.current_state_index = OUTPUT;
            return;
        }
        if self.is_prompt_index(state_index) {
            self.current_prompt = Some(line.to_string());
        }
        self.current_state_index = state_index;
    }

    /// Returns `true` if the line is a prompt of any mode.
    pub fn read_prompt(&self, line: &str) -> bool {
        self.is_prompt_index(self.line2state(line))
    }

    /// Returns the text to send if the line asks for input.
    ///
    /// A parameter answer whose parameter is unset yields `None`.
    pub fn read_need_write(&self, line: &str) -> Option<String> {
        let state_index = self.line2state(line);
        let state = self.all_states.get(state_index)?;
        match self.input_map.get(state)? {
            InputAnswer::Static(text) => Some(text.clone()),
            InputAnswer::Param(key) => self.dyn_param.get(key).cloned(),
        }
    }

    pub fn current_state(&self) -> &str {
        self.all_states
            .get(self.current_state_index)
            .map(String::as_str)
            .unwrap_or(PRE_STATES[OUTPUT])
    }

    pub fn current_prompt(&self) -> Option<&str> {
        self.current_prompt.as_deref()
    }

    /// Returns `true` while the last line read was an error message.
    pub fn error(&self) -> bool {
        self.current_state_index == ERROR
    }

    pub fn states(&self) -> &[String] {
        &self.all_states
    }

    /// Computes the shortest list of `(command, expected_mode)` steps from
    /// the current mode to `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::UnreachableState`] when no path exists.
    pub fn trans_state_write(&self, state: &str) -> Result<Vec<(String, String)>, ConnectError> {
        let start = self.current_state().to_string();
        let target = state.to_ascii_lowercase();
        if start == target {
            return Ok(Vec::new());
        }

        let mut adjacency: HashMap<&str, Vec<&Transition>> = HashMap::new();
        for t in &self.transitions {
            adjacency.entry(t.from.as_str()).or_default().push(t);
        }

        let mut queue = VecDeque::from([start.as_str()]);
        let mut visited = HashSet::from([start.as_str()]);
        // child -> transition that reached it
        let mut predecessors: HashMap<&str, &Transition> = HashMap::new();

        while let Some(node) = queue.pop_front() {
            if node == target {
                break;
            }
            for &t in adjacency.get(node).into_iter().flatten() {
                if visited.insert(t.to.as_str()) {
                    predecessors.insert(t.to.as_str(), t);
                    queue.push_back(t.to.as_str());
                }
            }
        }

        let mut path = Vec::new();
        let mut current = target.as_str();
        while current != start {
            let Some(&t) = predecessors.get(current) else {
                return Err(ConnectError::UnreachableState(target.clone()));
            };
            path.push((t.command.clone(), t.to.clone()));
            current = t.from.as_str();
        }
        path.reverse();
        trace!("Command path: '{:?}'", path);
        Ok(path)
    }
}

/// Carriage returns and backspaces some devices emit at the start of a
/// line when redrawing it.
pub static IGNORE_START_LINE: Lazy<Regex> =
    Lazy::new(
        || match Regex::new(r"^(\r+(\s+\r+)*)|(\u{8}+(\s+\u{8}+)*)") {
            Ok(re) => re,
            Err(err) => panic!("invalid IGNORE_START_LINE regex: {err}"),
        },
    );
