// Tool catalog and capability gating
//
// The catalog is the fixed capability surface offered to the model. Each run
// filters it by the capability keys before anything is offered, so the model
// never sees a tool it is not authorized to use.

use cogito_abstraction::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Web search with a synthesized answer.
pub const WEB_SEARCH: &str = "web_search";
/// Page content extraction.
pub const READ_URL: &str = "read_url";
/// Free-form image generation.
pub const GENERATE_IMAGE: &str = "generate_image";
/// Persona selfie generation.
pub const GENERATE_SELFIE: &str = "generate_selfie";
/// Video generation.
pub const GENERATE_VIDEO: &str = "generate_video";
/// Scratchpad note-taking.
pub const SAVE_THOUGHT: &str = "save_thought";

/// Provider class a tool needs to be authorized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthClass {
    /// Always available
    None,
    /// Needs the search key
    Search,
    /// Needs the media key
    Media,
}

impl fmt::Display for AuthClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Search => write!(f, "search"),
            Self::Media => write!(f, "media"),
        }
    }
}

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text
    String,
    /// Whole number
    Integer,
}

impl ParamType {
    fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// One entry of a tool's parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    /// Parameter name
    pub name: &'static str,
    /// Semantic type
    pub param_type: ParamType,
    /// Whether the model must supply it
    pub required: bool,
    /// Description for the model
    pub description: &'static str,
}

const fn param(
    name: &'static str,
    param_type: ParamType,
    required: bool,
    description: &'static str,
) -> ParameterSpec {
    ParameterSpec { name, param_type, required, description }
}

/// Immutable description of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    /// Unique tool name
    pub name: &'static str,
    /// Description for the model
    pub description: &'static str,
    /// Ordered parameter schema
    pub parameters: &'static [ParameterSpec],
    /// Authorization class
    pub auth: AuthClass,
}

impl ToolDescriptor {
    /// Required parameters in schema order
    pub fn required_parameters(&self) -> impl Iterator<Item = &'static ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Convert to the function declaration sent to the model
    pub fn to_spec(&self) -> ToolSpec {
        let mut properties = Map::new();
        for p in self.parameters {
            properties.insert(
                p.name.to_string(),
                json!({ "type": p.param_type.json_type(), "description": p.description }),
            );
        }
        let required: Vec<Value> =
            self.required_parameters().map(|p| Value::String(p.name.to_string())).collect();

        ToolSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

static CATALOG: [ToolDescriptor; 6] = [
    ToolDescriptor {
        name: WEB_SEARCH,
        description: "Search the live web and get a synthesized answer with sources. Use for \
                      current events, prices, weather and anything newer than your training data.",
        parameters: &[param("query", ParamType::String, true, "What to search for")],
        auth: AuthClass::Search,
    },
    ToolDescriptor {
        name: READ_URL,
        description: "Fetch a web page and return its readable text content.",
        parameters: &[param("url", ParamType::String, true, "Absolute http(s) URL to read")],
        auth: AuthClass::Search,
    },
    ToolDescriptor {
        name: GENERATE_IMAGE,
        description: "Generate an image from a detailed natural-language description.",
        parameters: &[
            param("prompt", ParamType::String, true, "Complete description of the image"),
            param("width", ParamType::Integer, false, "Width in pixels"),
            param("height", ParamType::Integer, false, "Height in pixels"),
            param("model", ParamType::String, false, "Image model override"),
        ],
        auth: AuthClass::Media,
    },
    ToolDescriptor {
        name: GENERATE_SELFIE,
        description: "Take a selfie of the assistant persona in a given situation. Outfit is \
                      chosen from the context unless `attire` is given.",
        parameters: &[
            param("context", ParamType::String, true, "Where the persona is and what is happening"),
            param("mood", ParamType::String, false, "Facial expression or mood"),
            param("attire", ParamType::String, false, "Explicit outfit, overrides the automatic choice"),
        ],
        auth: AuthClass::Media,
    },
    ToolDescriptor {
        name: GENERATE_VIDEO,
        description: "Generate a short video clip from a description. The video service decides \
                      camera work on its own.",
        parameters: &[
            param("prompt", ParamType::String, true, "Complete description of the clip"),
            param("duration", ParamType::Integer, false, "Length in seconds"),
            param("model", ParamType::String, false, "Video model override"),
        ],
        auth: AuthClass::Media,
    },
    ToolDescriptor {
        name: SAVE_THOUGHT,
        description: "Write a note to your private scratchpad. Notes are returned to the user as \
                      your thinking process.",
        parameters: &[param("thought", ParamType::String, true, "The note to save")],
        auth: AuthClass::None,
    },
];

/// The full, unfiltered catalog
pub fn catalog() -> &'static [ToolDescriptor] {
    &CATALOG
}

/// Look up a descriptor by name
pub fn find(name: &str) -> Option<&'static ToolDescriptor> {
    CATALOG.iter().find(|d| d.name == name)
}

/// Read-only authorization source for provider classes
pub trait KeyStore: Send + Sync {
    /// Whether the class is currently authorized
    fn is_authorized(&self, class: AuthClass) -> bool;
}

/// Authorization snapshot for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityKeys {
    /// Search/extraction provider authorized
    pub search: bool,
    /// Image/video provider authorized
    pub media: bool,
}

impl CapabilityKeys {
    /// No provider authorized
    pub fn none() -> Self {
        Self::default()
    }

    /// Every provider authorized
    pub fn all() -> Self {
        Self { search: true, media: true }
    }

    /// Read every class from a key store once
    pub fn snapshot(store: &dyn KeyStore) -> Self {
        Self {
            search: store.is_authorized(AuthClass::Search),
            media: store.is_authorized(AuthClass::Media),
        }
    }

    /// Whether a tool of this class may be offered
    pub fn allows(&self, class: AuthClass) -> bool {
        match class {
            AuthClass::None => true,
            AuthClass::Search => self.search,
            AuthClass::Media => self.media,
        }
    }
}

impl KeyStore for CapabilityKeys {
    fn is_authorized(&self, class: AuthClass) -> bool {
        self.allows(class)
    }
}

/// Catalog split by what a run may use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// Tools the model may be offered
    pub available: Vec<ToolDescriptor>,
    /// One reason per withheld tool
    pub unavailable: Vec<String>,
}

impl Availability {
    /// Names of the available tools
    pub fn names(&self) -> Vec<&'static str> {
        self.available.iter().map(|d| d.name).collect()
    }

    /// Whether `name` is offered
    pub fn contains(&self, name: &str) -> bool {
        self.available.iter().any(|d| d.name == name)
    }
}

/// Filter the catalog by the run's capability keys
pub fn list_available(keys: CapabilityKeys) -> Availability {
    let mut availability = Availability::default();
    for descriptor in catalog() {
        if keys.allows(descriptor.auth) {
            availability.available.push(*descriptor);
        } else {
            availability.unavailable.push(format!(
                "{}: requires the {} key, which is not configured",
                descriptor.name, descriptor.auth
            ));
        }
    }
    availability
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_are_unique() {
        let mut names: Vec<_> = catalog().iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog().len());
    }

    #[test]
    fn test_list_available_every_key_combination() {
        for search in [false, true] {
            for media in [false, true] {
                let keys = CapabilityKeys { search, media };
                let availability = list_available(keys);

                assert!(availability.contains(SAVE_THOUGHT));
                assert_eq!(
                    availability.available.len() + availability.unavailable.len(),
                    catalog().len()
                );
                for descriptor in catalog() {
                    let expected = match descriptor.auth {
                        AuthClass::None => true,
                        AuthClass::Search => search,
                        AuthClass::Media => media,
                    };
                    assert_eq!(availability.contains(descriptor.name), expected, "{}", descriptor.name);
                }
            }
        }
    }

    #[test]
    fn test_no_keys_offers_only_save_thought() {
        let availability = list_available(CapabilityKeys::none());
        assert_eq!(availability.names(), vec![SAVE_THOUGHT]);
        assert!(availability.unavailable.iter().any(|r| r.contains("search key")));
        assert!(availability.unavailable.iter().any(|r| r.contains("media key")));
    }

    #[test]
    fn test_snapshot_reads_store() {
        struct SearchOnly;
        impl KeyStore for SearchOnly {
            fn is_authorized(&self, class: AuthClass) -> bool {
                class == AuthClass::Search
            }
        }

        let keys = CapabilityKeys::snapshot(&SearchOnly);
        assert_eq!(keys, CapabilityKeys { search: true, media: false });
    }

    #[test]
    fn test_to_spec_schema() {
        let spec = find(GENERATE_IMAGE).unwrap().to_spec();
        assert_eq!(spec.name, GENERATE_IMAGE);
        assert_eq!(spec.parameters["type"], "object");
        assert_eq!(spec.parameters["required"], json!(["prompt"]));
        assert_eq!(spec.parameters["properties"]["width"]["type"], "integer");
    }

    #[test]
    fn test_find_unknown() {
        assert!(find("launch_rocket").is_none());
        assert_eq!(find(WEB_SEARCH).unwrap().auth, AuthClass::Search);
    }
}
