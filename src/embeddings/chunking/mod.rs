
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// Sections whose reconstructed text is longer than this many characters are
/// split again on level-3 headings
pub const SECTION_SPLIT_THRESHOLD: usize = 2000;

/// Section label given to the text that precedes the first level-2 heading
pub const INTRODUCTION_SECTION: &str = "Introduction";

const SECTION_MARKER: &str = "\n## ";
const SUBSECTION_MARKER: &str = "\n### ";

const CHUNK_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2d8e_4b7a_5c39_9e02_d4a1_7b3f_58c6);

/// A contiguous span of chapter text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The chunk text, including its reconstructed heading line
    pub text: String,
    /// Chapter the chunk was taken from
    pub chapter: String,
    /// Level-2 heading, or "Introduction" for text before the first one
    pub section: String,
    /// Level-3 heading when the section was split further
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    /// Display title
    pub title: String,
}

impl Chunk {
    /// Content-derived identifier, see [`chunk_id`]
    #[inline]
    pub fn id(&self) -> String {
        chunk_id(&self.text)
    }

    /// Vector store payload for this chunk. `subsection` is only present when set.
    #[inline]
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("text".to_string(), Value::String(self.text.clone()));
        payload.insert("chapter".to_string(), Value::String(self.chapter.clone()));
        payload.insert("section".to_string(), Value::String(self.section.clone()));
        if let Some(subsection) = &self.subsection {
            payload.insert("subsection".to_string(), Value::String(subsection.clone()));
        }
        payload.insert("title".to_string(), Value::String(self.title.clone()));
        payload
    }
}

/// Split one chapter's markdown into chunks on level-2 and then level-3 headings.
///
/// Splitting is plain string matching on `"\n## "` and `"\n### "`, so a heading on
/// the very first line of the input (or of a section body) is not a split point.
#[inline]
pub fn chunk_markdown(markdown: &str, chapter: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut segments = markdown.split(SECTION_MARKER);

    if let Some(introduction) = segments.next() {
        let text = introduction.trim();
        if !text.is_empty() {
            chunks.push(Chunk {
                text: text.to_string(),
                chapter: chapter.to_string(),
                section: INTRODUCTION_SECTION.to_string(),
                subsection: None,
                title: leading_title(introduction).unwrap_or(chapter).to_string(),
            });
        }
    }

    for segment in segments {
        let (heading, body) = split_heading(segment);
        let full_text = format!("## {}\n\n{}", heading, body);

        if full_text.chars().count() > SECTION_SPLIT_THRESHOLD {
            split_subsections(heading, body, chapter, &mut chunks);
        } else {
            chunks.push(Chunk {
                text: full_text,
                chapter: chapter.to_string(),
                section: heading.to_string(),
                subsection: None,
                title: heading.to_string(),
            });
        }
    }

    debug!("Chunked chapter '{}' into {} chunks", chapter, chunks.len());

    chunks
}

fn split_subsections(heading: &str, body: &str, chapter: &str, chunks: &mut Vec<Chunk>) {
    let mut parts = body.split(SUBSECTION_MARKER);

    if let Some(lead) = parts.next() {
        let lead = lead.trim();
        if !lead.is_empty() {
            chunks.push(Chunk {
                text: format!("## {}\n\n{}", heading, lead),
                chapter: chapter.to_string(),
                section: heading.to_string(),
                subsection: None,
                title: heading.to_string(),
            });
        }
    }

    for part in parts {
        let (subheading, sub_body) = split_heading(part);
        chunks.push(Chunk {
            text: format!("### {}\n\n{}", subheading, sub_body),
            chapter: chapter.to_string(),
            section: heading.to_string(),
            subsection: Some(subheading.to_string()),
            title: format!("{} - {}", heading, subheading),
        });
    }
}

/// First line is the heading, the rest is the body. Both trimmed.
fn split_heading(segment: &str) -> (&str, &str) {
    match segment.split_once('\n') {
        Some((heading, body)) => (heading.trim(), body.trim()),
        None => (segment.trim(), ""),
    }
}

/// Text of a level-1 heading on the first line, if the input starts with one
fn leading_title(text: &str) -> Option<&str> {
    text.strip_prefix("# ")
        .and_then(|rest| rest.split('\n').next())
        .filter(|title| !title.is_empty())
}

/// Deterministic identifier for a chunk's text.
///
/// A name-based UUID, so identical text always maps to the same vector store
/// point and re-ingestion overwrites instead of duplicating.
#[inline]
pub fn chunk_id(text: &str) -> String {
    Uuid::new_v5(&CHUNK_ID_NAMESPACE, text.as_bytes()).to_string()
}

/// Chapter label for a markdown file: `01-intro-to-ros2.md` becomes `01 Intro To Ros2`
#[inline]
pub fn chapter_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    title_case(&file_name.replace(".md", "").replace('-', " "))
}

/// Uppercase the first letter of every run of letters and lowercase the rest
fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = false;
        }
    }

    result
}
