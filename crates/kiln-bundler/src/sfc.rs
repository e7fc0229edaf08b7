//! `<script>` block extraction for Vue single-file components.
//!
//! Only script blocks are read; templates and styles are left to the
//! component's own runtime.

use memchr::memmem;
use thiserror::Error;

const MAX_SFC_SIZE: usize = 10 * 1024 * 1024;
const MAX_SCRIPT_BLOCKS: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SfcError {
    #[error("component file is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("unclosed <script> tag at byte {position}")]
    UnclosedScript { position: usize },

    #[error("more than {max} <script> blocks")]
    TooManyScripts { max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Setup,
    Regular,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock<'a> {
    pub content: &'a str,
    pub kind: ScriptKind,
    pub lang: &'a str,
}

pub fn extract_scripts(source: &str) -> Result<Vec<ScriptBlock<'_>>, SfcError> {
    if source.len() > MAX_SFC_SIZE {
        return Err(SfcError::TooLarge {
            size: source.len(),
            max: MAX_SFC_SIZE,
        });
    }

    let mut blocks = Vec::new();
    let mut cursor = 0;
    while let Some(block) = next_script(source, &mut cursor)? {
        blocks.push(block);
        if blocks.len() > MAX_SCRIPT_BLOCKS {
            return Err(SfcError::TooManyScripts {
                max: MAX_SCRIPT_BLOCKS,
            });
        }
    }
    Ok(blocks)
}

/// Join setup and regular blocks into one module body, setup first.
/// Returns the code and the strongest `lang` among the blocks.
pub fn combine<'a>(blocks: &[ScriptBlock<'a>]) -> (String, &'a str) {
    let mut ordered: Vec<&ScriptBlock<'a>> = blocks.iter().collect();
    ordered.sort_by_key(|b| match b.kind {
        ScriptKind::Setup => 0,
        ScriptKind::Regular => 1,
    });

    let code = ordered
        .iter()
        .map(|b| b.content)
        .collect::<Vec<_>>()
        .join("\n\n");
    let lang = ordered
        .iter()
        .map(|b| b.lang)
        .max_by_key(|lang| lang_strength(lang))
        .unwrap_or("js");
    (code, lang)
}

fn lang_strength(lang: &str) -> u8 {
    match lang {
        "tsx" => 4,
        "jsx" => 3,
        "ts" | "typescript" => 2,
        _ => 1,
    }
}

fn next_script<'a>(source: &'a str, cursor: &mut usize) -> Result<Option<ScriptBlock<'a>>, SfcError> {
    let bytes = source.as_bytes();

    loop {
        let Some(offset) = memmem::find(&bytes[*cursor..], b"<script") else {
            return Ok(None);
        };
        let start = *cursor + offset;
        *cursor = start + "<script".len();

        // `<scripts>` or `<scripting>` are not script tags.
        if bytes
            .get(*cursor)
            .is_some_and(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/'))
        {
            continue;
        }

        let tag_end = closing_angle(bytes, *cursor).ok_or(SfcError::UnclosedScript { position: start })?;
        let attrs = &source[*cursor..tag_end];
        let kind = if has_attribute(attrs, "setup") {
            ScriptKind::Setup
        } else {
            ScriptKind::Regular
        };
        let lang = lang_attribute(attrs);

        if attrs.ends_with('/') {
            *cursor = tag_end + 1;
            return Ok(Some(ScriptBlock {
                content: "",
                kind,
                lang,
            }));
        }

        let content_start = tag_end + 1;
        let content_end = memmem::find(&bytes[content_start..], b"</script>")
            .map(|p| content_start + p)
            .ok_or(SfcError::UnclosedScript { position: start })?;
        *cursor = content_end + "</script>".len();

        return Ok(Some(ScriptBlock {
            content: &source[content_start..content_end],
            kind,
            lang,
        }));
    }
}

fn closing_angle(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes[from..].iter().enumerate() {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if b == q => quote = None,
            (None, b'>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

fn has_attribute(attrs: &str, name: &str) -> bool {
    attrs
        .split(|c: char| c.is_whitespace() || c == '/')
        .any(|token| token == name || token.starts_with(&format!("{name}=")))
}

fn lang_attribute(attrs: &str) -> &str {
    let Some(pos) = attrs.find("lang=") else {
        return "js";
    };
    let value = attrs[pos + "lang=".len()..].trim_start();
    match value.chars().next() {
        Some(q @ ('"' | '\'')) => value[1..].find(q).map_or("js", |end| &value[1..=end]),
        Some(_) => {
            let end = value
                .find(|c: char| c.is_whitespace() || c == '/')
                .unwrap_or(value.len());
            &value[..end]
        }
        None => "js",
    }
}
