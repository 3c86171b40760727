// Tool handler implementations
//
// One handler per catalog entry. The dispatcher registry binds them to tool
// names; handlers never see a call that failed validation.

pub mod media;
pub mod notes;
pub mod research;
pub mod selfie;

use cogito_abstraction::{ImageGenerator, VideoGenerator, WebResearch};
use std::fmt;
use std::sync::Arc;

pub use media::{GenerateImageHandler, GenerateVideoHandler};
pub use notes::SaveThoughtHandler;
pub use research::{ReadUrlHandler, WebSearchHandler};
pub use selfie::{GenerateSelfieHandler, compose_selfie_prompt, resolve_attire};

/// Capability providers available to the standard handlers
///
/// A missing provider leaves its tools unregistered.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Search and page extraction
    pub research: Option<Arc<dyn WebResearch>>,
    /// Image generation (also used for selfies)
    pub images: Option<Arc<dyn ImageGenerator>>,
    /// Video generation
    pub videos: Option<Arc<dyn VideoGenerator>>,
}

impl Collaborators {
    /// No providers
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the research provider
    #[must_use]
    pub fn with_research(mut self, research: Arc<dyn WebResearch>) -> Self {
        self.research = Some(research);
        self
    }

    /// Set the image provider
    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    /// Set the video provider
    #[must_use]
    pub fn with_videos(mut self, videos: Arc<dyn VideoGenerator>) -> Self {
        self.videos = Some(videos);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("research", &self.research.is_some())
            .field("images", &self.images.is_some())
            .field("videos", &self.videos.is_some())
            .finish()
    }
}
