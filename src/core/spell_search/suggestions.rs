//! Suggestion Engine
//!
//! Drives the search dropdown: what to suggest for the current input, when
//! to recompute it (debounced), keyboard navigation and commits.
//!
//! Time is passed in by the caller so debounces are deterministic; the host
//! calls [`SuggestionEngine::poll`] from its tick loop.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::error::ParseError;
use super::fields::{FieldId, FieldRegistry, ValidValues};
use super::fuzzy::{NameQuery, NameRanker};
use super::query_parser::{advanced_body, QueryAst, QueryParser};
use super::record::SpellRecord;

pub const STANDARD_DEBOUNCE: Duration = Duration::from_millis(800);
pub const ADVANCED_DEBOUNCE: Duration = Duration::from_millis(150);
pub const DUPLICATE_SELECTION_WINDOW: Duration = Duration::from_millis(500);
pub const MIN_FUZZY_CHARS: usize = 3;
pub const MAX_NAME_SUGGESTIONS: usize = 5;
pub const MAX_RECENT_SUGGESTIONS: usize = 8;

pub const LABEL_RECENT_SEARCHES: &str = "SPELLBOOK.Search.RecentSearches";
pub const LABEL_FIELDS: &str = "SPELLBOOK.Search.Fields";
pub const LABEL_VALUES: &str = "SPELLBOOK.Search.Values";
pub const LABEL_MATCHES: &str = "SPELLBOOK.Search.Matches";
pub const LABEL_NO_MATCHES: &str = "SPELLBOOK.Search.NoMatches";
pub const LABEL_RANGE_HINT: &str = "SPELLBOOK.Search.RangeHint";
pub const LABEL_EXECUTE: &str = "SPELLBOOK.Search.Execute";

/// Debounce and limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    pub standard_debounce: Duration,
    pub advanced_debounce: Duration,
    pub duplicate_window: Duration,
    pub min_fuzzy_chars: usize,
    pub max_name_suggestions: usize,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            standard_debounce: STANDARD_DEBOUNCE,
            advanced_debounce: ADVANCED_DEBOUNCE,
            duplicate_window: DUPLICATE_SELECTION_WINDOW,
            min_fuzzy_chars: MIN_FUZZY_CHARS,
            max_name_suggestions: MAX_NAME_SUGGESTIONS,
        }
    }
}

// ============================================================================
// Dropdown model
// ============================================================================

/// What the dropdown is currently offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownState {
    /// Short standard input: recent searches.
    Recent,
    /// Standard input long enough for name matches.
    StandardMatches,
    /// Advanced input expecting a field alias.
    FieldSelection,
    /// `alias:` with nothing typed yet.
    ValueSelection { field: FieldId },
    /// `alias:partial` still being typed.
    ValueCompletion { field: FieldId },
    /// Range values are free-form.
    RangeEntry,
    /// The advanced query parses; Enter executes it.
    Complete,
    /// The advanced query cannot be completed as typed.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Status,
    Header,
    Recent,
    SpellName,
    Field { field: FieldId },
    Value { field: FieldId },
    RangeHint,
    Execute,
}

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub label: String,
    /// Input text after selecting this entry.
    pub replacement: Option<String>,
}

impl Suggestion {
    fn status(label: impl Into<String>) -> Self {
        Self {
            kind: SuggestionKind::Status,
            label: label.into(),
            replacement: None,
        }
    }

    fn header(label: &str) -> Self {
        Self {
            kind: SuggestionKind::Header,
            label: label.to_string(),
            replacement: None,
        }
    }

    fn entry(kind: SuggestionKind, label: impl Into<String>, replacement: String) -> Self {
        Self {
            kind,
            label: label.into(),
            replacement: Some(replacement),
        }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(
            self.kind,
            SuggestionKind::Recent
                | SuggestionKind::SpellName
                | SuggestionKind::Field { .. }
                | SuggestionKind::Value { .. }
                | SuggestionKind::Execute
        )
    }
}

/// Keys the dropdown reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Enter,
    ArrowUp,
    ArrowDown,
    Escape,
}

/// How a committed query should be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMode {
    Standard,
    Advanced(Result<QueryAst, ParseError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub raw: String,
    pub mode: CommitMode,
}

/// Outcome of feeding the engine an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    None,
    /// Suggestions or selection changed; re-render.
    Refreshed,
    /// Debounced standard search is due.
    Search(String),
    Commit(CommitRequest),
    RemoveRecent(String),
    Closed,
}

/// Data the engine reads while computing suggestions.
pub struct SuggestionContext<'c> {
    pub recent: &'c [String],
    pub corpus: &'c [SpellRecord],
    pub parser: &'c mut QueryParser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Refresh,
    StandardSearch,
}

#[derive(Debug, Clone, Copy)]
struct PendingJob {
    due: Instant,
    kind: JobKind,
}

// ============================================================================
// Engine
// ============================================================================

pub struct SuggestionEngine {
    prefix: char,
    timing: EngineTiming,
    input: String,
    pending: Option<PendingJob>,
    state: DropdownState,
    suggestions: Vec<Suggestion>,
    selected: Option<usize>,
    last_selection: Option<(String, Instant)>,
    open: bool,
    ranker: NameRanker,
}

impl SuggestionEngine {
    pub fn new(prefix: char, timing: EngineTiming) -> Self {
        Self {
            prefix,
            timing,
            input: String::new(),
            pending: None,
            state: DropdownState::Recent,
            suggestions: Vec::new(),
            selected: None,
            last_selection: None,
            open: false,
            ranker: NameRanker::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.input
    }

    pub fn state(&self) -> DropdownState {
        self.state
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Index of the highlighted entry, if any.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_suggestion(&self) -> Option<&Suggestion> {
        self.selected.and_then(|i| self.suggestions.get(i))
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_advanced(&self) -> bool {
        self.input.starts_with(self.prefix)
    }

    /// Replace the input buffer and schedule a recompute.
    pub fn input(&mut self, text: &str, now: Instant) {
        self.input = text.to_string();
        self.open = true;
        self.selected = None;

        let job = if self.is_advanced() {
            PendingJob {
                due: now + self.timing.advanced_debounce,
                kind: JobKind::Refresh,
            }
        } else if self.input.trim().chars().count() >= self.timing.min_fuzzy_chars {
            PendingJob {
                due: now + self.timing.standard_debounce,
                kind: JobKind::StandardSearch,
            }
        } else {
            PendingJob {
                due: now,
                kind: JobKind::Refresh,
            }
        };
        trace!(input = %self.input, kind = ?job.kind, "Scheduled suggestion job");
        self.pending = Some(job);
    }

    /// Run the pending job if it is due.
    pub fn poll(&mut self, now: Instant, ctx: SuggestionContext<'_>) -> EngineEvent {
        match self.pending {
            Some(job) if job.due <= now => {
                self.pending = None;
                self.refresh(ctx);
                match job.kind {
                    JobKind::Refresh => EngineEvent::Refreshed,
                    JobKind::StandardSearch => EngineEvent::Search(self.input.trim().to_string()),
                }
            }
            _ => EngineEvent::None,
        }
    }

    pub fn key(&mut self, key: NavKey, now: Instant, ctx: SuggestionContext<'_>) -> EngineEvent {
        match key {
            NavKey::ArrowDown => {
                self.move_down();
                EngineEvent::Refreshed
            }
            NavKey::ArrowUp => {
                self.move_up();
                EngineEvent::Refreshed
            }
            NavKey::Escape => {
                self.pending = None;
                self.open = false;
                self.selected = None;
                EngineEvent::Closed
            }
            NavKey::Enter => {
                let highlighted = self.selected;
                self.pending = None;
                self.refresh_keeping_selection(ctx.recent, ctx.corpus, ctx.parser, highlighted);
                if self.state == DropdownState::Complete {
                    return self.commit(ctx.parser);
                }
                match self.selected {
                    Some(index) => self.select_with(index, now, ctx.recent, ctx.corpus, ctx.parser),
                    None => self.commit(ctx.parser),
                }
            }
        }
    }

    /// Activate the entry at `index` (mouse click or Enter on a highlight).
    pub fn select(&mut self, index: usize, now: Instant, ctx: SuggestionContext<'_>) -> EngineEvent {
        self.select_with(index, now, ctx.recent, ctx.corpus, ctx.parser)
    }

    /// Ask to forget the recent search at `index`.
    pub fn remove_recent(&mut self, index: usize) -> EngineEvent {
        match self.suggestions.get(index) {
            Some(Suggestion {
                kind: SuggestionKind::Recent,
                label,
                ..
            }) => EngineEvent::RemoveRecent(label.clone()),
            _ => EngineEvent::None,
        }
    }

    /// Recompute suggestions for the current input immediately.
    pub fn refresh(&mut self, ctx: SuggestionContext<'_>) {
        self.refresh_keeping_selection(ctx.recent, ctx.corpus, ctx.parser, None);
    }

    fn refresh_keeping_selection(
        &mut self,
        recent: &[String],
        corpus: &[SpellRecord],
        parser: &mut QueryParser,
        keep: Option<usize>,
    ) {
        let (state, suggestions) = if self.is_advanced() {
            self.advanced_suggestions(parser)
        } else {
            self.standard_suggestions(recent, corpus)
        };
        debug!(state = ?state, count = suggestions.len(), "Refreshed suggestions");
        self.state = state;
        self.suggestions = suggestions;
        self.selected = keep.filter(|&i| {
            self.suggestions
                .get(i)
                .is_some_and(Suggestion::is_selectable)
        });
    }

    fn standard_suggestions(
        &mut self,
        recent: &[String],
        corpus: &[SpellRecord],
    ) -> (DropdownState, Vec<Suggestion>) {
        let query = self.input.trim();
        if query.chars().count() < self.timing.min_fuzzy_chars {
            let mut suggestions = Vec::new();
            if !recent.is_empty() {
                suggestions.push(Suggestion::header(LABEL_RECENT_SEARCHES));
                suggestions.extend(
                    recent
                        .iter()
                        .take(MAX_RECENT_SUGGESTIONS)
                        .map(|q| Suggestion::entry(SuggestionKind::Recent, q.clone(), q.clone())),
                );
            }
            return (DropdownState::Recent, suggestions);
        }

        let name_query = NameQuery::parse(query);
        let ranked = self
            .ranker
            .rank(&name_query, corpus, self.timing.max_name_suggestions);
        let suggestions = if ranked.is_empty() {
            vec![Suggestion::status(LABEL_NO_MATCHES)]
        } else {
            let mut suggestions = vec![Suggestion::header(LABEL_MATCHES)];
            suggestions.extend(ranked.iter().map(|r| {
                Suggestion::entry(
                    SuggestionKind::SpellName,
                    r.record.name.clone(),
                    r.record.name.clone(),
                )
            }));
            suggestions
        };
        (DropdownState::StandardMatches, suggestions)
    }

    fn advanced_suggestions(&self, parser: &mut QueryParser) -> (DropdownState, Vec<Suggestion>) {
        let input = self.input.as_str();
        let body = advanced_body(input, self.prefix).unwrap_or_default();
        if body.trim().is_empty() {
            return field_suggestions(input, body, FieldId::ALL.to_vec(), None, self.prefix);
        }

        let error = match parser.parse(input) {
            Ok(_) => {
                return (
                    DropdownState::Complete,
                    vec![Suggestion {
                        kind: SuggestionKind::Execute,
                        label: LABEL_EXECUTE.to_string(),
                        replacement: None,
                    }],
                );
            }
            Err(e) => e,
        };

        let registry = parser.registry();
        let invalid = || (DropdownState::Invalid, vec![Suggestion::status(error.to_string())]);
        let last = body.split_whitespace().last().unwrap_or_default();

        // Fields already constrained cannot appear twice.
        let used: Vec<FieldId> = body
            .split_whitespace()
            .filter_map(|word| word.split_once(':'))
            .filter_map(|(alias, _)| registry.field_id(alias))
            .collect();
        let unused = |fields: Vec<FieldId>| -> Vec<FieldId> {
            fields.into_iter().filter(|f| !used.contains(f)).collect()
        };

        if last.eq_ignore_ascii_case("AND") {
            return field_suggestions(input, body, unused(FieldId::ALL.to_vec()), None, self.prefix);
        }
        if body.ends_with(char::is_whitespace) {
            return invalid();
        }

        let Some((alias, partial)) = last.split_once(':') else {
            let fields = unused(registry.fields_matching(last));
            if fields.is_empty() {
                return invalid();
            }
            return field_suggestions(input, body, fields, Some(last), self.prefix);
        };

        let Some(field) = registry.field_id(alias) else {
            return invalid();
        };
        if field == FieldId::Range {
            return (
                DropdownState::RangeEntry,
                vec![Suggestion {
                    kind: SuggestionKind::RangeHint,
                    label: LABEL_RANGE_HINT.to_string(),
                    replacement: None,
                }],
            );
        }
        if partial.is_empty() {
            return value_suggestions(registry, field, input, "", DropdownState::ValueSelection { field });
        }
        if registry.is_incomplete(field, partial) {
            return value_suggestions(
                registry,
                field,
                input,
                partial,
                DropdownState::ValueCompletion { field },
            );
        }
        invalid()
    }

    fn move_down(&mut self) {
        let start = self.selected.map_or(0, |i| i + 1);
        if let Some(next) = (start..self.suggestions.len()).find(|&i| self.suggestions[i].is_selectable()) {
            self.selected = Some(next);
        }
    }

    fn move_up(&mut self) {
        let Some(current) = self.selected else {
            return;
        };
        self.selected = (0..current).rev().find(|&i| self.suggestions[i].is_selectable());
    }

    fn select_with(
        &mut self,
        index: usize,
        now: Instant,
        recent: &[String],
        corpus: &[SpellRecord],
        parser: &mut QueryParser,
    ) -> EngineEvent {
        let Some(suggestion) = self.suggestions.get(index).filter(|s| s.is_selectable()).cloned() else {
            return EngineEvent::None;
        };

        let key = suggestion
            .replacement
            .clone()
            .unwrap_or_else(|| suggestion.label.clone());
        if let Some((last_key, at)) = &self.last_selection {
            if *last_key == key && now.saturating_duration_since(*at) < self.timing.duplicate_window {
                debug!(selection = %key, "Ignoring duplicate selection");
                return EngineEvent::None;
            }
        }
        self.last_selection = Some((key, now));

        match suggestion.kind {
            SuggestionKind::Execute => self.commit(parser),
            SuggestionKind::Recent | SuggestionKind::SpellName => {
                if let Some(replacement) = suggestion.replacement {
                    self.input = replacement;
                }
                self.commit(parser)
            }
            SuggestionKind::Field { .. } | SuggestionKind::Value { .. } => {
                if let Some(replacement) = suggestion.replacement {
                    self.input = replacement;
                }
                self.pending = None;
                self.refresh_keeping_selection(recent, corpus, parser, None);
                EngineEvent::Refreshed
            }
            SuggestionKind::Status | SuggestionKind::Header | SuggestionKind::RangeHint => EngineEvent::None,
        }
    }

    fn commit(&mut self, parser: &mut QueryParser) -> EngineEvent {
        let raw = self.input.trim().to_string();
        let mode = if raw.starts_with(self.prefix) {
            CommitMode::Advanced(parser.parse(&raw))
        } else {
            CommitMode::Standard
        };
        self.pending = None;
        self.open = false;
        self.selected = None;
        EngineEvent::Commit(CommitRequest { raw, mode })
    }
}

fn field_suggestions(
    input: &str,
    body: &str,
    fields: Vec<FieldId>,
    partial: Option<&str>,
    prefix: char,
) -> (DropdownState, Vec<Suggestion>) {
    let mut suggestions = vec![Suggestion::header(LABEL_FIELDS)];
    suggestions.extend(fields.into_iter().map(|field| {
        let token = format!("{}:", field.primary_alias());
        let replacement = match partial {
            Some(partial) => format!("{}{token}", &input[..input.len() - partial.len()]),
            None if body.trim().is_empty() => format!("{prefix}{token}"),
            None if input.ends_with(char::is_whitespace) => format!("{input}{token}"),
            None => format!("{input} {token}"),
        };
        Suggestion::entry(SuggestionKind::Field { field }, field.primary_alias(), replacement)
    }));
    (DropdownState::FieldSelection, suggestions)
}

fn value_suggestions(
    registry: &FieldRegistry,
    field: FieldId,
    input: &str,
    partial: &str,
    state: DropdownState,
) -> (DropdownState, Vec<Suggestion>) {
    let values = match registry.valid_values(field) {
        ValidValues::Enumerated(values) => values,
        ValidValues::Unbounded => Vec::new(),
    };
    let stem = &input[..input.len() - partial.len()];
    let mut suggestions = vec![Suggestion::header(LABEL_VALUES)];
    suggestions.extend(
        values
            .into_iter()
            .filter(|v| partial.is_empty() || registry.completions(field, partial).contains(v))
            .map(|v| {
                let replacement = format!("{stem}{v}");
                Suggestion::entry(SuggestionKind::Value { field }, v, replacement)
            }),
    );
    (state, suggestions)
}
