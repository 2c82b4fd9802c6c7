use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::ports::LlmClient;
use crate::domain::{Segment, TranscriptionResult, clamp_segments};

use super::llm_punctuation::{LlmPunctuationMode, LlmPunctuator};
use super::punctuation::normalize_punctuation;
use super::realign::{Anchor, realign};
use super::script::{DominancePolicy, join_script_aware};
use super::terminal::{TerminalRules, apply_terminal_punctuation};
use super::transliteration::{CorrectionRule, TransliterationFixer};

/// Working copy threaded through the refinement steps.
#[derive(Debug, Clone)]
pub struct RefinementDraft {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: Option<String>,
    pub anchors: Vec<Anchor>,
    original_segments: Vec<Segment>,
    pub warnings: Vec<String>,
}

impl RefinementDraft {
    pub fn new(text: &str, segments: &[Segment], language: Option<&str>, anchors: Vec<Anchor>) -> Self {
        Self {
            text: text.to_string(),
            segments: segments.to_vec(),
            language: language.map(str::to_string),
            anchors,
            original_segments: segments.to_vec(),
            warnings: Vec::new(),
        }
    }

    fn sync_text_from_segments(&mut self) {
        self.text = join_script_aware(self.segments.iter().map(|s| s.text.as_str()));
    }
}

#[async_trait]
pub trait RefinementStep: Send + Sync {
    fn name(&self) -> &'static str;
    async fn apply(&self, draft: &mut RefinementDraft);
}

pub struct PunctuationStep;

#[async_trait]
impl RefinementStep for PunctuationStep {
    fn name(&self) -> &'static str {
        "punctuation"
    }

    async fn apply(&self, draft: &mut RefinementDraft) {
        for segment in &mut draft.segments {
            segment.text = normalize_punctuation(&segment.text);
        }
        draft.sync_text_from_segments();
    }
}

pub struct TerminalPunctuationStep {
    rules: TerminalRules,
}

impl TerminalPunctuationStep {
    pub fn new(rules: TerminalRules) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl RefinementStep for TerminalPunctuationStep {
    fn name(&self) -> &'static str {
        "terminal_punctuation"
    }

    async fn apply(&self, draft: &mut RefinementDraft) {
        apply_terminal_punctuation(&mut draft.segments, &self.rules);
        draft.sync_text_from_segments();
    }
}

pub struct LlmPunctuationStep {
    punctuator: LlmPunctuator,
    mode: LlmPunctuationMode,
}

impl LlmPunctuationStep {
    pub fn new(client: Arc<dyn LlmClient>, mode: LlmPunctuationMode) -> Self {
        Self {
            punctuator: LlmPunctuator::new(client),
            mode,
        }
    }
}

#[async_trait]
impl RefinementStep for LlmPunctuationStep {
    fn name(&self) -> &'static str {
        "llm_punctuation"
    }

    async fn apply(&self, draft: &mut RefinementDraft) {
        match self.mode {
            LlmPunctuationMode::Off => {}
            LlmPunctuationMode::PerSegment => {
                let mut rejected = 0usize;
                for segment in &mut draft.segments {
                    match self.punctuator.punctuate(&segment.text).await {
                        Ok(text) => segment.text = text,
                        Err(reason) => {
                            rejected += 1;
                            tracing::debug!(reason = %reason, "LLM punctuation rejected for segment");
                        }
                    }
                }
                if rejected > 0 {
                    tracing::warn!(rejected, "LLM punctuation skipped for some segments");
                }
                draft.sync_text_from_segments();
            }
            LlmPunctuationMode::FullText => match self.punctuator.punctuate(&draft.text).await {
                Ok(text) => draft.text = text,
                Err(reason) => tracing::warn!(reason = %reason, "LLM punctuation skipped"),
            },
        }
    }
}

pub struct TransliterationStep {
    fixer: TransliterationFixer,
}

impl TransliterationStep {
    pub fn new(fixer: TransliterationFixer) -> Self {
        Self { fixer }
    }
}

#[async_trait]
impl RefinementStep for TransliterationStep {
    fn name(&self) -> &'static str {
        "transliteration"
    }

    async fn apply(&self, draft: &mut RefinementDraft) {
        for segment in &mut draft.segments {
            segment.text = self.fixer.fix(&segment.text);
        }
        draft.text = self.fixer.fix(&draft.text);
    }
}

pub struct RealignStep {
    match_ratio: f64,
}

impl RealignStep {
    pub fn new(match_ratio: f64) -> Self {
        Self { match_ratio }
    }
}

#[async_trait]
impl RefinementStep for RealignStep {
    fn name(&self) -> &'static str {
        "realign"
    }

    async fn apply(&self, draft: &mut RefinementDraft) {
        if draft.anchors.is_empty() {
            return;
        }
        match realign(&draft.text, &draft.anchors, self.match_ratio) {
            Ok(segments) => draft.segments = segments,
            Err(e) => {
                tracing::warn!(error = %e, "Realignment failed, keeping original segment timing");
                draft.segments = draft.original_segments.clone();
                draft.warnings.push(format!("timestamp realignment skipped: {}", e));
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    pub enabled: bool,
    pub dominance: DominancePolicy,
    pub terminal: TerminalRules,
    pub llm_punctuation: LlmPunctuationMode,
    pub corrections: Vec<CorrectionRule>,
    pub realign: bool,
    pub realign_match_ratio: f64,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dominance: DominancePolicy::default(),
            terminal: TerminalRules::default(),
            llm_punctuation: LlmPunctuationMode::Off,
            corrections: Vec::new(),
            realign: true,
            realign_match_ratio: 0.92,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub text: String,
    pub segments: Vec<Segment>,
    pub applied: bool,
    pub warnings: Vec<String>,
}

pub struct RefinementEngine {
    dominance: DominancePolicy,
    steps: Vec<Box<dyn RefinementStep>>,
}

impl RefinementEngine {
    pub fn new(dominance: DominancePolicy, steps: Vec<Box<dyn RefinementStep>>) -> Self {
        Self { dominance, steps }
    }

    pub fn from_config(
        config: &RefinementConfig,
        llm: Option<Arc<dyn LlmClient>>,
    ) -> Result<Self, regex::Error> {
        if !config.enabled {
            return Ok(Self::new(config.dominance.clone(), Vec::new()));
        }

        let mut steps: Vec<Box<dyn RefinementStep>> = vec![
            Box::new(PunctuationStep),
            Box::new(TerminalPunctuationStep::new(config.terminal.clone())),
        ];
        match (config.llm_punctuation, llm) {
            (LlmPunctuationMode::Off, _) => {}
            (mode, Some(client)) => steps.push(Box::new(LlmPunctuationStep::new(client, mode))),
            (mode, None) => {
                tracing::warn!(?mode, "LLM punctuation configured without an LLM client, step disabled");
            }
        }
        steps.push(Box::new(TransliterationStep::new(TransliterationFixer::new(
            &config.corrections,
        )?)));
        if config.realign {
            steps.push(Box::new(RealignStep::new(config.realign_match_ratio)));
        }
        Ok(Self::new(config.dominance.clone(), steps))
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub async fn refine(
        &self,
        text: &str,
        segments: &[Segment],
        language: Option<&str>,
        anchors: Vec<Anchor>,
    ) -> RefinementOutcome {
        let probe = if text.trim().is_empty() {
            join_script_aware(segments.iter().map(|s| s.text.as_str()))
        } else {
            text.to_string()
        };
        if self.steps.is_empty() || !self.dominance.holds(&probe, language) {
            return RefinementOutcome {
                text: text.to_string(),
                segments: segments.to_vec(),
                applied: false,
                warnings: Vec::new(),
            };
        }

        let mut draft = RefinementDraft::new(&probe, segments, language, anchors);
        for step in &self.steps {
            step.apply(&mut draft).await;
            tracing::trace!(step = step.name(), "Refinement step applied");
        }
        clamp_segments(&mut draft.segments);

        RefinementOutcome {
            text: draft.text,
            segments: draft.segments,
            applied: true,
            warnings: draft.warnings,
        }
    }

    /// Refines a provider result in place. Anchors are the provider's word
    /// timings when present, otherwise its original segments.
    pub async fn refine_result(&self, result: &mut TranscriptionResult) -> Vec<String> {
        let anchors: Vec<Anchor> = if result.words.is_empty() {
            result.segments.iter().map(Anchor::from).collect()
        } else {
            result.words.iter().map(Anchor::from).collect()
        };
        let outcome = self
            .refine(&result.text, &result.segments, result.language.as_deref(), anchors)
            .await;
        if outcome.applied {
            result.text = outcome.text;
            result.segments = outcome.segments;
        }
        outcome.warnings
    }
}
