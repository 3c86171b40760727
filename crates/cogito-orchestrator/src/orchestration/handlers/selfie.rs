//! `generate_selfie`: persona selfies with context-aware outfits.
//!
//! The outfit comes from an ordered keyword table matched against the free-text
//! context. Keywords match whole words (or whole word sequences), never parts
//! of a word. The first row with a matching keyword wins; an explicit `attire`
//! argument bypasses the table.

use async_trait::async_trait;
use cogito_abstraction::{ImageGenerator, ImageRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::orchestration::config::Persona;
use crate::orchestration::context::ConversationState;
use crate::orchestration::tool::{ToolArguments, ToolHandler};

/// Portrait framing for selfies
pub const SELFIE_ASPECT_RATIO: &str = "3:4";

const DEFAULT_MOOD: &str = "happy";

const DEFAULT_ATTIRE: &str = "wearing casual everyday clothes, a soft sweater and jeans";

const WARDROBE: &[(&[&str], &str)] = &[
    (
        &["gym", "workout", "exercise", "fitness", "training session", "yoga"],
        "wearing athletic wear, a fitted sports top, leggings and running sneakers",
    ),
    (
        &["beach", "pool", "swim", "swimming", "ocean", "surf", "surfing"],
        "wearing beach attire, a light swimsuit cover-up, sunglasses and a sun hat",
    ),
    (
        &["office", "meeting", "interview", "conference", "presentation"],
        "wearing smart business attire, a tailored blazer and blouse",
    ),
    (
        &["party", "club", "wedding", "gala", "date night", "dinner"],
        "wearing an elegant evening outfit with subtle jewelry",
    ),
    (
        &["bed", "in bed", "sleep", "sleepy", "pajama", "pajamas", "waking up", "lazy morning"],
        "wearing cozy pajamas and loungewear",
    ),
    (
        &["hike", "hiking", "mountain", "mountains", "camping", "trail"],
        "wearing outdoor hiking gear, a windbreaker and trail boots",
    ),
    (
        &["snow", "snowy", "ski", "skiing", "winter", "cold"],
        "wearing a warm winter coat, knit scarf and beanie",
    ),
    (
        &["kitchen", "cooking", "baking"],
        "wearing a casual top with a cooking apron",
    ),
];

/// Pick the outfit for a selfie
pub fn resolve_attire(context: &str, attire_override: Option<&str>) -> String {
    if let Some(attire) = attire_override.map(str::trim).filter(|a| !a.is_empty()) {
        return attire.to_string();
    }

    let context = context.to_lowercase();
    let words: Vec<&str> =
        context.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    WARDROBE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| contains_phrase(&words, k)))
        .map_or(DEFAULT_ATTIRE, |(_, attire)| *attire)
        .to_string()
}

/// Whether the words of `phrase` appear consecutively in `words`
fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let phrase: Vec<&str> = phrase.split_whitespace().collect();
    !phrase.is_empty() && words.windows(phrase.len()).any(|window| window == phrase.as_slice())
}

/// Build the image prompt from persona appearance, outfit, mood and context
pub fn compose_selfie_prompt(persona: &Persona, attire: &str, mood: &str, context: &str) -> String {
    format!(
        "{}, {}, with a {} expression, {}. Casual smartphone selfie taken at arm's length, \
         natural lighting, realistic skin texture.",
        persona.appearance.trim(),
        attire,
        mood,
        context.trim()
    )
}

/// Selfie handler bound to one persona
pub struct GenerateSelfieHandler {
    images: Arc<dyn ImageGenerator>,
    persona: Persona,
}

impl GenerateSelfieHandler {
    /// Create a handler for `persona`
    pub fn new(images: Arc<dyn ImageGenerator>, persona: Persona) -> Self {
        Self { images, persona }
    }
}

#[async_trait]
impl ToolHandler for GenerateSelfieHandler {
    async fn execute(&self, args: &ToolArguments, _state: &mut ConversationState) -> Result<Value> {
        let context = args.require_text("context")?;
        let mood = args.get_text("mood").unwrap_or_else(|| DEFAULT_MOOD.to_string());
        let attire = resolve_attire(&context, args.get_text("attire").as_deref());
        let prompt = compose_selfie_prompt(&self.persona, &attire, &mood, &context);
        debug!(persona = %self.persona.name, attire = %attire, "Generating selfie");

        let request = ImageRequest {
            prompt: prompt.clone(),
            width: None,
            height: None,
            aspect_ratio: Some(SELFIE_ASPECT_RATIO.to_string()),
            model: None,
        };
        let image = self.images.generate(&request).await?;

        Ok(json!({
            "imageReference": image.reference,
            "persona": self.persona.name,
            "context": context,
            "mood": mood,
            "attireUsed": attire,
            "metadata": {
                "model": image.model,
                "aspectRatio": SELFIE_ASPECT_RATIO,
                "prompt": prompt,
            },
        }))
    }
}
