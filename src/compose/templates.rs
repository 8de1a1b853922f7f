//! System instruction templates, keyed by generation type.
//!
//! The instruction texts are part of the output contract that downstream
//! callers parse (section titles, bullet ranges, JSON keys).  Edit them only
//! together with those callers.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{PrerollError, Result};

macro_rules! sections_preamble {
    () => {
        r#"You are a professional film production assistant used by directors, producers, and department heads.
You generate production-ready documents, not summaries or creative blurbs.

Return ONLY valid JSON with this schema (no extra text, no markdown, no code fences):
{
  "generation_type": string,
  "sections": [
    { "title": string, "bullets": [string] }
  ]
}

Global rules:
- No generic filler. No prose paragraphs.
- Use clear section headers and bullet points only.
- Never skip a required section for the selected generation type.
- If information is missing, infer realistic industry-standard details.
- Do not mention AI or explain reasoning.
- Set generation_type to the provided Generation type value.

Output contracts (titles must match exactly):

"#
    };
}

macro_rules! complexity_rules {
    () => {
        r#"

Complexity enforcement:
- Low: fewer locations, simple setups, minimal layers.
- Medium: multiple layers, transitions, technical considerations.
- High: overlapping elements, logistical challenges, precise coordination."#
    };
}

const SCENE_BREAKDOWN: &str = concat!(
    sections_preamble!(),
    r#"If Generation type = "Scene Breakdown":
1. Scene Objective
2. Characters Present
3. Locations Required
4. Props & Set Dressing
5. Key Actions & Beats
6. Production Challenges
7. Estimated Time & Coverage
Minimum detail: 5-8 bullets per section."#,
    complexity_rules!()
);

const SOUND_DESIGN: &str = concat!(
    sections_preamble!(),
    r#"If Generation type = "Sound Design":
1. Ambient Bed
2. Diegetic Sounds
3. Non-Diegetic Elements
4. Transitions & Accents
5. Technical & Mixing Notes
Minimum detail: 6-8 bullets per section."#,
    complexity_rules!()
);

const BUDGET_PLAN: &str = concat!(
    sections_preamble!(),
    r#"If Generation type = "Budget Plan":
1. Cast Costs
2. Crew Costs
3. Locations & Permits
4. Equipment & Gear
5. Art, Wardrobe & Props
6. Sound & Post-Production
7. Contingency & Risk Buffer
Rules:
- Include realistic cost ranges (e.g., "$15k-$30k") in each section.
- Include at least one cost-saving alternative per section.
- Assume indie to mid-budget unless specified.
- Include explicit bullets for sound, CGI/VFX, casting, marketing/distribution."#,
    complexity_rules!()
);

const VISUAL_DIRECTION: &str = concat!(
    sections_preamble!(),
    r#"If Generation type = "Visual Direction":
1. Visual Tone & Mood
2. Color Palette & Contrast
3. Camera Movement & Framing
4. Lighting Approach
5. Production Design & Texture
6. Visual References (described, not named)"#,
    complexity_rules!()
);

const PRODUCTION_NOTES: &str = concat!(
    sections_preamble!(),
    r#"If Generation type = "Production Notes":
1. Directorial Intent
2. Performance Notes
3. Blocking & Movement
4. Continuity Considerations
5. Safety & Logistics
6. On-Set Priorities"#,
    complexity_rules!()
);

/// Flat breakdown schema used before per-type contracts existed.
const LEGACY_BREAKDOWN: &str = r#"You are a professional assistant director and script supervisor working on an independent film production.

Return ONLY valid JSON with the exact schema below (no extra text, no markdown, no code fences):
{
  "executive_summary": [string],
  "scene_overview": string,
  "key_actions": [string],
  "characters_roles": [{"name": string, "role": string, "notes": string}],
  "visual_style": [string],
  "sound_design": [string],
  "budget_considerations": [string],
  "director_notes": [string],
  "assumptions_made": [string]
}

Rules:
- Tone: professional, practical, neutral. No emojis. No poetic language.
- Do NOT write screenplay, dialogue, or scene script.
- Always include all keys. No empty arrays.
- If info is limited, use short, practical placeholders (e.g., "Not specified") rather than omitting.
- Executive summary: 3-5 bullets.
- Scene overview: 2-4 concise sentences.
- Key actions: 4-8 bullets, no paragraphs.
- Characters roles: 2-5 entries with name, role, notes.
- Visual style, sound design, budget, director notes: 3-6 bullets each.
- Assumptions made: 2-4 bullets.
- Keep each bullet under 20 words.
- Use the Generation type parameter to emphasize the relevant section.
- If Generation type contains "Budget", budget_considerations MUST include line items for:
  Sound, CGI/VFX, Casting, Marketing/Distribution, Locations/Permits, Production Design,
  Wardrobe/Makeup, Equipment/Camera, Crew/Labor, Post-Production, Contingency.
- Budget line items format: "Category - cost impact (Low/Medium/High) + short rationale".
"#;

/// System message for the free-form assistant.
pub const ASSIST_INSTRUCTION: &str =
    "You are an AI assistant helping with film pre-production, scripts, scenes, and creative ideas.";

// -- Generation types ----------------------------------------------------

/// The built-in generation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationType {
    SceneBreakdown,
    SoundDesign,
    BudgetPlan,
    VisualDirection,
    ProductionNotes,
}

impl GenerationType {
    pub const ALL: [GenerationType; 5] = [
        GenerationType::SceneBreakdown,
        GenerationType::SoundDesign,
        GenerationType::BudgetPlan,
        GenerationType::VisualDirection,
        GenerationType::ProductionNotes,
    ];

    /// Display name, as rendered in the parameter block.
    pub fn name(self) -> &'static str {
        match self {
            GenerationType::SceneBreakdown => "Scene Breakdown",
            GenerationType::SoundDesign => "Sound Design",
            GenerationType::BudgetPlan => "Budget Plan",
            GenerationType::VisualDirection => "Visual Direction",
            GenerationType::ProductionNotes => "Production Notes",
        }
    }

    fn sections_instruction(self) -> &'static str {
        match self {
            GenerationType::SceneBreakdown => SCENE_BREAKDOWN,
            GenerationType::SoundDesign => SOUND_DESIGN,
            GenerationType::BudgetPlan => BUDGET_PLAN,
            GenerationType::VisualDirection => VISUAL_DIRECTION,
            GenerationType::ProductionNotes => PRODUCTION_NOTES,
        }
    }
}

// -- Template table ------------------------------------------------------

/// One generation mode: its display name and the system instruction sent
/// as the first conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: Cow<'static, str>,
    pub instruction: Cow<'static, str>,
}

impl Template {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        instruction: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
        }
    }
}

/// Lookup from generation-type key to template.
///
/// Keys are normalized (case-insensitive, `_`/`-`/space equivalent) so
/// `"budget_plan"` and `"Budget Plan"` resolve to the same entry.  Unknown
/// or missing keys resolve to the default entry, "Scene Breakdown".
#[derive(Debug, Clone)]
pub struct TemplateTable {
    version: &'static str,
    templates: HashMap<String, Template>,
    default_key: String,
}

impl TemplateTable {
    pub const SECTIONS: &'static str = "sections";
    pub const BREAKDOWN: &'static str = "breakdown";

    /// Per-type section contracts.
    pub fn sections() -> Self {
        Self::from_builtins(Self::SECTIONS, GenerationType::sections_instruction)
    }

    /// Legacy flat breakdown schema shared by every generation type.
    pub fn breakdown() -> Self {
        Self::from_builtins(Self::BREAKDOWN, |_| LEGACY_BREAKDOWN)
    }

    /// Select a built-in table by its version label.
    pub fn by_version(version: &str) -> Result<Self> {
        match version.trim().to_ascii_lowercase().as_str() {
            Self::SECTIONS => Ok(Self::sections()),
            Self::BREAKDOWN => Ok(Self::breakdown()),
            other => Err(PrerollError::Config(format!(
                "unknown template set \"{other}\" (available: {}, {})",
                Self::SECTIONS,
                Self::BREAKDOWN
            ))),
        }
    }

    fn from_builtins(
        version: &'static str,
        instruction: fn(GenerationType) -> &'static str,
    ) -> Self {
        let mut table = Self {
            version,
            templates: HashMap::new(),
            default_key: normalize_key(GenerationType::SceneBreakdown.name()),
        };
        for kind in GenerationType::ALL {
            table.register(Template::new(kind.name(), instruction(kind)));
        }
        table
    }

    /// Add or replace a template.  The key is derived from its name.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(normalize_key(&template.name), template);
    }

    pub fn version(&self) -> &str {
        self.version
    }

    /// Exact lookup; `None` for unknown keys.
    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.get(&normalize_key(key))
    }

    /// Resolve a requested generation type, falling back to the default.
    pub fn resolve(&self, requested: Option<&str>) -> &Template {
        requested
            .and_then(|key| self.get(key))
            .unwrap_or_else(|| self.default_template())
    }

    pub fn default_template(&self) -> &Template {
        &self.templates[&self.default_key]
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }
}

impl Default for TemplateTable {
    fn default() -> Self {
        Self::sections()
    }
}

fn normalize_key(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
