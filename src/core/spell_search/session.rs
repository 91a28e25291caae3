//! Search Session
//!
//! Wires the spell search pieces together for one viewer: filter
//! configuration, filter state, the advanced parser, the suggestion
//! dropdown and recent searches. Runs the commit cycle
//! (parse, patch state, invalidate, pipeline) and tells the host when to
//! re-render results.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use super::display::{spell_details, DetailVisibility, SpellDetail};
use super::error::{ConfigError, CorpusError, ParseError, SpellSearchError, StateError};
use super::fields::FieldRegistry;
use super::filter_config::{FilterConfigStore, FilterDescriptor};
use super::filter_state::{FilterKey, FilterState, FilterStateStore, FilterValue, DEFAULT_SNAPSHOT_TTL, SOURCE_ALL};
use super::pipeline::{FilterOutcome, FilterPipeline};
use super::query_executor::apply_to_state;
use super::query_parser::{QueryAst, QueryParser, DEFAULT_ADVANCED_PREFIX, DEFAULT_PARSE_CACHE_CAPACITY};
use super::recent::{RecentSearchStore, DEFAULT_RECENT_LIMIT};
use super::record::{load_corpus, SpellRecord};
use super::settings::{load_advanced_prefix, SettingsStore};
use super::suggestions::{
    CommitMode, CommitRequest, DropdownState, EngineEvent, EngineTiming, NavKey, Suggestion,
    SuggestionContext, SuggestionEngine,
};

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Used when no valid prefix is stored in settings.
    pub prefix: char,
    pub timing: EngineTiming,
    pub recent_limit: usize,
    pub snapshot_ttl: Duration,
    pub parse_cache_capacity: usize,
    pub metric: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ADVANCED_PREFIX,
            timing: EngineTiming::default(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
            parse_cache_capacity: DEFAULT_PARSE_CACHE_CAPACITY,
            metric: false,
        }
    }
}

/// What the host should do after feeding the session an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Idle,
    SuggestionsUpdated,
    /// Filters changed; call [`SearchSession::results`] again.
    RerunPipeline,
    Closed,
}

pub struct SearchSession {
    config: FilterConfigStore,
    filters: Vec<FilterDescriptor>,
    state: FilterStateStore,
    parser: QueryParser,
    engine: SuggestionEngine,
    recent: RecentSearchStore,
    committed: Option<QueryAst>,
    last_error: Option<ParseError>,
    corpus: Vec<SpellRecord>,
    selected: Option<HashSet<String>>,
    party_prepared: Option<HashSet<String>>,
    visibility: DetailVisibility,
    metric: bool,
}

impl SearchSession {
    /// Open a session for `viewer`, loading persisted settings.
    pub fn open(settings: Arc<dyn SettingsStore>, viewer: &str, options: SessionOptions) -> Self {
        Self::with_registry(settings, FieldRegistry::shared(), viewer, options)
    }

    pub fn with_registry(
        settings: Arc<dyn SettingsStore>,
        registry: Arc<FieldRegistry>,
        viewer: &str,
        options: SessionOptions,
    ) -> Self {
        let prefix = load_advanced_prefix(settings.as_ref(), options.prefix);
        let config = FilterConfigStore::new(Arc::clone(&settings));
        let filters = config.load();
        let visibility = DetailVisibility::load(settings.as_ref());
        let recent = RecentSearchStore::load(Arc::clone(&settings), viewer, options.recent_limit);

        info!(viewer, prefix = %prefix, filters = filters.len(), "Opened spell search session");

        Self {
            config,
            filters,
            state: FilterStateStore::new(options.snapshot_ttl),
            parser: QueryParser::with_options(registry, prefix, options.parse_cache_capacity),
            engine: SuggestionEngine::new(prefix, options.timing),
            recent,
            committed: None,
            last_error: None,
            corpus: Vec::new(),
            selected: None,
            party_prepared: None,
            visibility,
            metric: options.metric,
        }
    }

    // ------------------------------------------------------------------
    // Corpus
    // ------------------------------------------------------------------

    pub fn set_corpus(&mut self, corpus: Vec<SpellRecord>) -> SessionEvent {
        self.corpus = corpus;
        SessionEvent::RerunPipeline
    }

    /// Replace the corpus from host JSON; bad records are skipped and returned.
    pub fn load_corpus_json<I>(&mut self, values: I) -> Vec<CorpusError>
    where
        I: IntoIterator<Item = JsonValue>,
    {
        let load = load_corpus(values, self.parser.registry().vocabulary());
        self.corpus = load.records;
        load.errors
    }

    pub fn corpus(&self) -> &[SpellRecord] {
        &self.corpus
    }

    /// Exclude ids already chosen in a list editor.
    pub fn set_selected(&mut self, selected: Option<HashSet<String>>) -> SessionEvent {
        self.selected = selected;
        SessionEvent::RerunPipeline
    }

    pub fn set_party_prepared(&mut self, prepared: Option<HashSet<String>>) -> SessionEvent {
        self.party_prepared = prepared;
        SessionEvent::RerunPipeline
    }

    // ------------------------------------------------------------------
    // Filter configuration and state
    // ------------------------------------------------------------------

    pub fn filters(&self) -> &[FilterDescriptor] {
        &self.filters
    }

    pub fn save_filters(&mut self, filters: Vec<FilterDescriptor>) -> Result<(), ConfigError> {
        self.filters = self.config.save(filters)?;
        Ok(())
    }

    pub fn reset_filter_config(&mut self) -> Result<(), ConfigError> {
        self.filters = self.config.reset()?;
        Ok(())
    }

    pub fn filter_state(&self) -> &FilterState {
        self.state.current()
    }

    pub fn set_filter(&mut self, key: FilterKey, value: FilterValue) -> Result<SessionEvent, StateError> {
        self.state.set(key, value)?;
        Ok(SessionEvent::RerunPipeline)
    }

    /// Apply a query directly, bypassing the dropdown (e.g. one restored by
    /// the host). Unlike a dropdown commit, failures are returned.
    pub fn apply_query(&mut self, raw: &str) -> Result<SessionEvent, SpellSearchError> {
        let raw = raw.trim();
        if !self.parser.is_advanced(raw) {
            return Ok(self.commit(CommitRequest {
                raw: raw.to_string(),
                mode: CommitMode::Standard,
            }));
        }

        let ast = match self.parser.parse(raw) {
            Ok(ast) => ast,
            Err(e) => {
                self.committed = None;
                self.last_error = Some(e.clone());
                self.state.invalidate();
                return Err(e.into());
            }
        };
        self.state.merge_partial(&apply_to_state(&ast))?;
        self.committed = Some(ast);
        self.last_error = None;
        if let Err(e) = self.recent.add(raw) {
            warn!(error = %e, "Failed to persist recent searches");
        }
        Ok(SessionEvent::RerunPipeline)
    }

    /// Clear every filter and any committed advanced query.
    pub fn reset_filters(&mut self) -> SessionEvent {
        self.state.reset();
        self.committed = None;
        self.last_error = None;
        SessionEvent::RerunPipeline
    }

    pub fn committed_query(&self) -> Option<&QueryAst> {
        self.committed.as_ref()
    }

    /// Error from the last advanced commit, if it failed to parse.
    pub fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    pub fn prefix(&self) -> char {
        self.parser.prefix()
    }

    // ------------------------------------------------------------------
    // Input and dropdown
    // ------------------------------------------------------------------

    pub fn input(&mut self, text: &str, now: Instant) {
        self.engine.input(text, now);
    }

    pub fn text(&self) -> &str {
        self.engine.text()
    }

    pub fn dropdown_state(&self) -> DropdownState {
        self.engine.state()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        self.engine.suggestions()
    }

    pub fn selected_suggestion(&self) -> Option<&Suggestion> {
        self.engine.selected_suggestion()
    }

    pub fn recent_searches(&self) -> &[String] {
        self.recent.list()
    }

    /// Drive pending debounced work.
    pub fn tick(&mut self, now: Instant) -> SessionEvent {
        let event = self.engine.poll(
            now,
            SuggestionContext {
                recent: self.recent.list(),
                corpus: &self.corpus,
                parser: &mut self.parser,
            },
        );
        // Standard input below the fuzzy threshold only refreshes the
        // dropdown; the name filter still has to follow the box.
        if event == EngineEvent::Refreshed && !self.engine.is_advanced() {
            let query = self.engine.text().trim().to_string();
            if self.state.current().name != query {
                self.apply_name(&query);
                return SessionEvent::RerunPipeline;
            }
        }
        self.handle(event)
    }

    pub fn key(&mut self, key: NavKey, now: Instant) -> SessionEvent {
        let event = self.engine.key(
            key,
            now,
            SuggestionContext {
                recent: self.recent.list(),
                corpus: &self.corpus,
                parser: &mut self.parser,
            },
        );
        self.handle(event)
    }

    pub fn select(&mut self, index: usize, now: Instant) -> SessionEvent {
        let event = self.engine.select(
            index,
            now,
            SuggestionContext {
                recent: self.recent.list(),
                corpus: &self.corpus,
                parser: &mut self.parser,
            },
        );
        self.handle(event)
    }

    pub fn remove_recent(&mut self, index: usize) -> SessionEvent {
        let event = self.engine.remove_recent(index);
        self.handle(event)
    }

    fn handle(&mut self, event: EngineEvent) -> SessionEvent {
        match event {
            EngineEvent::None => SessionEvent::Idle,
            EngineEvent::Refreshed => SessionEvent::SuggestionsUpdated,
            EngineEvent::Closed => SessionEvent::Closed,
            EngineEvent::Search(query) => {
                self.apply_name(&query);
                SessionEvent::RerunPipeline
            }
            EngineEvent::Commit(request) => self.commit(request),
            EngineEvent::RemoveRecent(query) => {
                if let Err(e) = self.recent.remove(&query) {
                    warn!(error = %e, "Failed to persist recent searches");
                }
                self.engine.refresh(SuggestionContext {
                    recent: self.recent.list(),
                    corpus: &self.corpus,
                    parser: &mut self.parser,
                });
                SessionEvent::SuggestionsUpdated
            }
        }
    }

    fn apply_name(&mut self, query: &str) {
        self.state.update(|state| state.name = query.to_string());
        self.committed = None;
        self.last_error = None;
    }

    /// Apply a committed query: parse, patch state, invalidate, rerun.
    fn commit(&mut self, request: CommitRequest) -> SessionEvent {
        let CommitRequest { raw, mode } = request;
        match mode {
            CommitMode::Standard => {
                self.apply_name(&raw);
            }
            CommitMode::Advanced(Ok(ast)) => {
                let patch = apply_to_state(&ast);
                if let Err(e) = self.state.merge_partial(&patch) {
                    warn!(query = %raw, error = %e, "Advanced query produced an invalid filter patch");
                    self.committed = None;
                    return SessionEvent::RerunPipeline;
                }
                debug!(query = %raw, leaves = ast.leaves().len(), "Committed advanced query");
                self.committed = Some(ast);
                self.last_error = None;
            }
            CommitMode::Advanced(Err(e)) => {
                info!(query = %raw, error = %e, "Advanced query did not parse");
                self.committed = None;
                self.last_error = Some(e);
                self.state.invalidate();
                return SessionEvent::RerunPipeline;
            }
        }

        self.state.invalidate();
        if let Err(e) = self.recent.add(&raw) {
            warn!(error = %e, "Failed to persist recent searches");
        }
        SessionEvent::RerunPipeline
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// Run the pipeline against the current snapshot.
    ///
    /// Source filters that matched nothing are reset in the live state.
    pub fn results(&mut self, now: Instant) -> FilterOutcome<'_> {
        let snapshot = self.state.snapshot_at(now);
        let mut pipeline = FilterPipeline::new(&snapshot)
            .with_query(self.committed.as_ref())
            .with_vocabulary(self.parser.registry().vocabulary());
        if let Some(selected) = &self.selected {
            pipeline = pipeline.excluding_selected(selected);
        }
        if let Some(prepared) = &self.party_prepared {
            pipeline = pipeline.with_party_prepared(prepared);
        }
        let outcome = pipeline.run(&self.corpus);

        if !outcome.healed.is_empty() {
            let healed = outcome.healed.clone();
            self.state.update(|state| {
                for key in healed {
                    match key {
                        FilterKey::Source => state.source = SOURCE_ALL.to_string(),
                        FilterKey::SpellSource => state.spell_source = SOURCE_ALL.to_string(),
                        _ => {}
                    }
                }
            });
        }
        outcome
    }

    /// Row details for `record` under the stored visibility settings.
    pub fn details(&self, record: &SpellRecord) -> Vec<SpellDetail> {
        spell_details(record, self.visibility, self.metric)
    }

    pub fn set_visibility(&mut self, visibility: DetailVisibility) {
        self.visibility = visibility;
    }
}
