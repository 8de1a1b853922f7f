//! Prompt composition: turns a caller's brief and production parameters
//! into the system instruction and user text sent to the model.

pub mod templates;

use serde::Deserialize;

use crate::error::{PrerollError, Result};

pub use templates::{ASSIST_INSTRUCTION, TemplateTable};

const UNSPECIFIED: &str = "Unspecified";

/// Inbound body of a `generate` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationRequest {
    /// Free-text creative brief.  A missing or null value counts as empty.
    #[serde(default)]
    pub prompt: Option<String>,

    #[serde(default)]
    pub params: Option<GenerationParams>,
}

/// Structured production parameters.  All optional; blanks are treated as
/// absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub genre: Option<String>,
    pub budget_tier: Option<String>,
    pub runtime_estimate: Option<String>,
    pub location_count: Option<String>,
    pub scene_complexity: Option<String>,
    pub generation_type: Option<String>,
}

/// A fully assembled prompt, ready for the completion gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// Display name of the resolved generation type.
    pub generation_type: String,
    pub system_instruction: String,
    pub user_text: String,
}

impl ComposedPrompt {
    /// Character count of the user turn.
    pub fn user_chars(&self) -> usize {
        self.user_text.chars().count()
    }
}

/// Builds [`ComposedPrompt`]s from requests using a fixed template table and
/// character limit.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    templates: TemplateTable,
    max_chars: usize,
}

impl PromptComposer {
    pub fn new(templates: TemplateTable, max_chars: usize) -> Self {
        Self { templates, max_chars }
    }

    /// Validate and assemble a generation request.
    ///
    /// The length limit applies to the assembled user text, so the
    /// parameter block counts against it.
    pub fn compose(&self, request: &GenerationRequest) -> Result<ComposedPrompt> {
        let brief = request.prompt.as_deref().unwrap_or_default().trim();
        if brief.is_empty() {
            return Err(PrerollError::EmptyPrompt);
        }

        let params = request.params.clone().unwrap_or_default();
        let requested_type = present(&params.generation_type);
        let template = self.templates.resolve(requested_type);

        // The caller's value is echoed as sent; only the instruction falls back.
        let lines = [
            ("Generation type", Some(requested_type.unwrap_or(&*template.name))),
            ("Genre", present(&params.genre)),
            ("Budget tier", present(&params.budget_tier)),
            ("Runtime estimate", present(&params.runtime_estimate)),
            ("Location count", present(&params.location_count)),
            ("Scene complexity", present(&params.scene_complexity)),
        ];
        let parameter_block = lines
            .into_iter()
            .map(|(label, value)| format!("{label}: {}", value.unwrap_or(UNSPECIFIED)))
            .collect::<Vec<_>>()
            .join("\n");

        let user_text =
            format!("Project brief:\n{brief}\n\nProduction parameters:\n{parameter_block}")
                .trim()
                .to_string();

        self.check_length(&user_text)?;

        Ok(ComposedPrompt {
            generation_type: template.name.to_string(),
            system_instruction: template.instruction.to_string(),
            user_text,
        })
    }

    /// Validate a free-form assistant prompt: trimmed, non-empty, and
    /// within the character limit.
    pub fn compose_assist(&self, prompt: Option<&str>) -> Result<ComposedPrompt> {
        let text = prompt.unwrap_or_default().trim();
        if text.is_empty() {
            return Err(PrerollError::EmptyPrompt);
        }
        self.check_length(text)?;

        Ok(ComposedPrompt {
            generation_type: "Assist".to_string(),
            system_instruction: ASSIST_INSTRUCTION.to_string(),
            user_text: text.to_string(),
        })
    }

    fn check_length(&self, text: &str) -> Result<()> {
        if text.chars().count() > self.max_chars {
            return Err(PrerollError::PromptTooLong { max: self.max_chars });
        }
        Ok(())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
