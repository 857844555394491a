use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub const SYSTEM: &str = "system";
pub const CLASSIFY: &str = "classify";
pub const ROUTER: &str = "router";
pub const RAG: &str = "rag";

/// Prompts used by the twin, keyed by name.
///
/// Each `<name>.txt` file in the prompts directory defines the prompt `<name>`.
/// The four built-in keys always exist, falling back to defaults written
/// around the persona name.
#[derive(Debug, Clone)]
pub struct PromptSet {
    prompts: HashMap<String, String>,
}

impl PromptSet {
    /// Loads prompts from `dir`. A missing or unreadable directory yields
    /// only the defaults.
    pub fn load(dir: &Path, persona: &str) -> Self {
        let mut prompts = HashMap::new();

        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for path in entries.flatten().map(|e| e.path()) {
                    if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                        continue;
                    }
                    let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };

                    match std::fs::read_to_string(&path) {
                        Ok(content) => {
                            debug!(prompt = name, "Loaded prompt");
                            prompts.insert(name.to_string(), content);
                        }
                        Err(e) => warn!(path = %path.display(), "Failed to read prompt: {}", e),
                    }
                }
            }
            Err(e) => warn!(dir = %dir.display(), "Prompts directory unavailable, using defaults: {}", e),
        }

        for (key, value) in Self::defaults(persona) {
            prompts.entry(key.to_string()).or_insert(value);
        }

        Self { prompts }
    }

    /// The built-in prompts only.
    pub fn with_defaults(persona: &str) -> Self {
        Self {
            prompts: Self::defaults(persona)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    fn defaults(persona: &str) -> [(&'static str, String); 4] {
        [
            (
                SYSTEM,
                format!(
                    "You are the digital twin of {persona}. Answer as if you were {persona}, \
                     in first person."
                ),
            ),
            (
                CLASSIFY,
                "Decide whether the query needs specific information from the documents."
                    .to_string(),
            ),
            (
                ROUTER,
                "Select the best route to answer the query.".to_string(),
            ),
            (
                RAG,
                "Generate an answer based on the provided context.".to_string(),
            ),
        ]
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.prompts.get(name).map(String::as_str)
    }

    pub fn system(&self) -> &str {
        self.get(SYSTEM).unwrap_or_default()
    }

    pub fn classify(&self) -> &str {
        self.get(CLASSIFY).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
