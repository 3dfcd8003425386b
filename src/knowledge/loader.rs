use super::error::KnowledgeError;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "md", "csv", "json"];
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Raw text of one knowledge source before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub source: String,
    pub text: String,
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads a local text file or fetches an `http(s)` URL.
pub fn load_document(source: &str) -> Result<LoadedDocument, KnowledgeError> {
    if is_url(source) {
        return fetch_url(source);
    }

    let path = Path::new(source);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    ensure_supported(source, &extension)?;

    let text = fs::read_to_string(path).map_err(|err| KnowledgeError::Read {
        path: path.to_path_buf(),
        source: err,
    })?;
    Ok(LoadedDocument {
        source: source.to_string(),
        text,
    })
}

/// Decoded last path segment of a URL, without query or fragment.
pub fn url_file_name(url: &str) -> Option<String> {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let (_, path) = path.split_once('/')?;
    let segment = path.rsplit('/').next().filter(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

fn url_extension(url: &str) -> Option<String> {
    let name = url_file_name(url)?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn ensure_supported(source: &str, extension: &str) -> Result<(), KnowledgeError> {
    if SUPPORTED_EXTENSIONS.contains(&extension) {
        return Ok(());
    }
    Err(KnowledgeError::UnsupportedFileType {
        source_name: source.to_string(),
        extension: if extension.is_empty() {
            "<none>".to_string()
        } else {
            extension.to_string()
        },
    })
}

fn is_text_content_type(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type == "application/json"
        || content_type == "application/csv"
}

fn fetch_url(url: &str) -> Result<LoadedDocument, KnowledgeError> {
    let extension = url_extension(url);
    if let Some(extension) = extension.as_deref() {
        ensure_supported(url, extension)?;
    }

    let agent = ureq::AgentBuilder::new().timeout(FETCH_TIMEOUT).build();
    let response = agent.get(url).call().map_err(|err| KnowledgeError::Fetch {
        url: url.to_string(),
        reason: err.to_string(),
    })?;

    if extension.is_none() && !is_text_content_type(response.content_type()) {
        return Err(KnowledgeError::UnsupportedFileType {
            source_name: url.to_string(),
            extension: response.content_type().to_string(),
        });
    }

    let text = response.into_string().map_err(|err| KnowledgeError::Fetch {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    Ok(LoadedDocument {
        source: url.to_string(),
        text,
    })
}
