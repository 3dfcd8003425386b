use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::PersonaSlug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("failed to read personas file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid personas json in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write personas file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid persona: {0}")]
    Invalid(String),
    #[error("persona `{0}` already exists")]
    Duplicate(String),
    #[error("persona `{0}` not found")]
    NotFound(String),
    #[error("persona index {index} is out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no personas are configured")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(rename = "id", alias = "label", alias = "slug")]
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
    pub prompt: String,
    #[serde(default)]
    pub emojicon: String,
}

impl Persona {
    pub fn display_label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.slug
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersonasFile {
    #[serde(default)]
    prompts: Vec<Persona>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaSelector<'a> {
    Slug(&'a str),
    Index(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonaUpdate {
    pub display_name: Option<String>,
    pub prompt: Option<String>,
    pub emojicon: Option<String>,
}

/// Ordered persona list for one bot plus the currently selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaCatalog {
    path: Option<PathBuf>,
    personas: Vec<Persona>,
    current: Option<usize>,
}

impl PersonaCatalog {
    pub fn from_personas(personas: Vec<Persona>) -> Self {
        let current = if personas.is_empty() { None } else { Some(0) };
        Self {
            path: None,
            personas,
            current,
        }
    }

    /// A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, PersonaError> {
        if !path.exists() {
            let mut catalog = Self::from_personas(Vec::new());
            catalog.path = Some(path.to_path_buf());
            return Ok(catalog);
        }
        let raw = fs::read_to_string(path).map_err(|source| PersonaError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: PersonasFile =
            serde_json::from_str(&raw).map_err(|source| PersonaError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        for persona in &file.prompts {
            validate_persona(persona)?;
        }
        let mut catalog = Self::from_personas(file.prompts);
        catalog.path = Some(path.to_path_buf());
        Ok(catalog)
    }

    pub fn save(&self) -> Result<(), PersonaError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let file = PersonasFile {
            prompts: self.personas.clone(),
        };
        let encoded = serde_json::to_vec_pretty(&file).map_err(|source| PersonaError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        atomic_write_file(path, &encoded).map_err(|source| PersonaError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn current(&self) -> Option<&Persona> {
        self.current.and_then(|idx| self.personas.get(idx))
    }

    pub fn get(&self, slug: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.slug == slug)
    }

    pub fn select(&mut self, selector: PersonaSelector<'_>) -> Result<&Persona, PersonaError> {
        let idx = match selector {
            PersonaSelector::Slug(slug) => self
                .personas
                .iter()
                .position(|p| p.slug == slug)
                .ok_or_else(|| PersonaError::NotFound(slug.to_string()))?,
            PersonaSelector::Index(index) => {
                if index >= self.personas.len() {
                    return Err(PersonaError::IndexOutOfRange {
                        index,
                        len: self.personas.len(),
                    });
                }
                index
            }
        };
        self.current = Some(idx);
        Ok(&self.personas[idx])
    }

    pub fn create(&mut self, persona: Persona) -> Result<&Persona, PersonaError> {
        validate_persona(&persona)?;
        if self.get(&persona.slug).is_some() {
            return Err(PersonaError::Duplicate(persona.slug));
        }
        self.personas.push(persona);
        if self.current.is_none() {
            self.current = Some(0);
        }
        Ok(&self.personas[self.personas.len() - 1])
    }

    pub fn update(&mut self, slug: &str, update: PersonaUpdate) -> Result<&Persona, PersonaError> {
        let idx = self
            .personas
            .iter()
            .position(|p| p.slug == slug)
            .ok_or_else(|| PersonaError::NotFound(slug.to_string()))?;
        let mut next = self.personas[idx].clone();
        if let Some(display_name) = update.display_name {
            next.display_name = display_name;
        }
        if let Some(prompt) = update.prompt {
            next.prompt = prompt;
        }
        if let Some(emojicon) = update.emojicon {
            next.emojicon = emojicon;
        }
        validate_persona(&next)?;
        self.personas[idx] = next;
        Ok(&self.personas[idx])
    }

    /// Removing the selected persona moves the selection to the first entry.
    pub fn delete(&mut self, slug: &str) -> Result<Persona, PersonaError> {
        let idx = self
            .personas
            .iter()
            .position(|p| p.slug == slug)
            .ok_or_else(|| PersonaError::NotFound(slug.to_string()))?;
        let removed = self.personas.remove(idx);
        self.current = match self.current {
            _ if self.personas.is_empty() => None,
            Some(current) if current == idx => Some(0),
            Some(current) if current > idx => Some(current - 1),
            other => other,
        };
        Ok(removed)
    }
}

fn validate_persona(persona: &Persona) -> Result<(), PersonaError> {
    PersonaSlug::parse(&persona.slug).map_err(PersonaError::Invalid)?;
    if persona.prompt.trim().is_empty() {
        return Err(PersonaError::Invalid(format!(
            "persona `{}` requires a non-empty prompt",
            persona.slug
        )));
    }
    Ok(())
}
