mod engine;
mod llm_punctuation;
mod punctuation;
mod realign;
mod script;
mod terminal;
mod transliteration;

pub use engine::{
    LlmPunctuationStep, PunctuationStep, RealignStep, RefinementConfig, RefinementDraft,
    RefinementEngine, RefinementOutcome, RefinementStep, TerminalPunctuationStep,
    TransliterationStep,
};
pub use llm_punctuation::{LlmPunctuationMode, LlmPunctuator};
pub use punctuation::normalize_punctuation;
pub use realign::{Anchor, RealignError, realign, split_sentences};
pub use script::{DominancePolicy, content_len, is_logographic, join_script_aware};
pub use terminal::{TerminalRules, apply_terminal_punctuation};
pub use transliteration::{CorrectionRule, TransliterationFixer};
