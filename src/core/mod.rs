pub mod logging;
pub mod vocabulary;

// Spell browser core: query language, filter pipeline, suggestions
pub mod spell_search;
