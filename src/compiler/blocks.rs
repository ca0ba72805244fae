// ABOUTME: Block shorthand definitions and their compilation to native blocks
// ABOUTME: One variant per shorthand key, plus raw and native pass-through

use serde::Deserialize;
use serde_json::{Map, Value};

use super::elements::compile_element;
use super::error::{CompileError, Result};
use super::native::{find_keyword, parse_spec, NativeBuilder, TextSpec};

/// Recognized block keys, in detection order
pub const BLOCK_KEYWORDS: [&str; 11] = [
    "header", "divider", "section", "context", "actions", "image", "video", "markdown", "file",
    "table", "raw",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Header(HeaderSpec),
    Divider(DividerSpec),
    Section(SectionSpec),
    Context(ContextSpec),
    Actions(ActionsSpec),
    Image(ImageSpec),
    Video(VideoSpec),
    Markdown(MarkdownSpec),
    File(FileSpec),
    Table(TableSpec),
    Raw(Value),
    Native(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HeaderSpec {
    Text(String),
    Full {
        text: TextSpec,
        block_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DividerSpec {
    Presence(Option<bool>),
    Full { block_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SectionSpec {
    Text(String),
    Full(SectionFields),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectionFields {
    pub text: Option<TextSpec>,
    #[serde(default)]
    pub fields: Vec<TextSpec>,
    pub accessory: Option<Value>,
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContextSpec {
    Items(Vec<Value>),
    Full {
        elements: Vec<Value>,
        block_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ActionsSpec {
    Elements(Vec<Value>),
    Full {
        elements: Vec<Value>,
        block_id: Option<String>,
    },
}

/// Image reference: exactly one of a public URL or an uploaded file id
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageSource {
    pub url: Option<String>,
    pub file_id: Option<String>,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageSpec {
    #[serde(flatten)]
    pub source: ImageSource,
    pub title: Option<TextSpec>,
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSpec {
    pub url: String,
    pub thumbnail: String,
    pub alt: String,
    pub title: TextSpec,
    pub description: Option<TextSpec>,
    pub title_url: Option<String>,
    pub author_name: Option<String>,
    pub provider_name: Option<String>,
    pub provider_icon_url: Option<String>,
    pub block_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MarkdownSpec {
    Text(String),
    Full {
        text: String,
        block_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FileSpec {
    ExternalId(String),
    Full {
        external_id: String,
        block_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableSpec {
    pub columns: Option<Value>,
    pub rows: Vec<Value>,
    pub block_id: Option<String>,
}

impl Block {
    /// Classify a block by its `type` field or its first shorthand key
    pub fn parse(value: Value, path: &str) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(CompileError::UnrecognizedBlock {
                path: path.to_string(),
                keys: Vec::new(),
            });
        };

        if object.contains_key("type") {
            return Ok(Block::Native(Value::Object(object)));
        }

        let Some(keyword) = find_keyword(&object, &BLOCK_KEYWORDS) else {
            return Err(CompileError::UnrecognizedBlock {
                path: path.to_string(),
                keys: object.keys().cloned().collect(),
            });
        };
        let inner = object.remove(keyword).unwrap_or(Value::Null);

        Ok(match keyword {
            "header" => Block::Header(parse_spec(keyword, path, inner)?),
            "divider" => Block::Divider(parse_spec(keyword, path, inner)?),
            "section" => Block::Section(parse_spec(keyword, path, inner)?),
            "context" => Block::Context(parse_spec(keyword, path, inner)?),
            "actions" => Block::Actions(parse_spec(keyword, path, inner)?),
            "image" => Block::Image(parse_spec(keyword, path, inner)?),
            "video" => Block::Video(parse_spec(keyword, path, inner)?),
            "markdown" => Block::Markdown(parse_spec(keyword, path, inner)?),
            "file" => Block::File(parse_spec(keyword, path, inner)?),
            "table" => Block::Table(parse_spec(keyword, path, inner)?),
            _ => Block::Raw(inner),
        })
    }

    pub fn compile(self, path: &str) -> Result<Value> {
        match self {
            Block::Header(spec) => Ok(compile_header(spec)),
            Block::Divider(spec) => Ok(compile_divider(spec)),
            Block::Section(spec) => compile_section(spec, path),
            Block::Context(spec) => compile_context(spec, path),
            Block::Actions(spec) => compile_actions(spec, path),
            Block::Image(spec) => compile_image(spec, path),
            Block::Video(spec) => Ok(compile_video(spec)),
            Block::Markdown(spec) => Ok(compile_markdown(spec)),
            Block::File(spec) => Ok(compile_file(spec)),
            Block::Table(spec) => Ok(compile_table(spec)),
            Block::Raw(value) | Block::Native(value) => Ok(value),
        }
    }
}

/// Parse and compile a single block.
///
/// A `block_id` written next to the shorthand key applies when the
/// shorthand itself does not set one. Raw and native blocks are emitted
/// exactly as written.
pub fn compile_block(value: Value, path: &str) -> Result<Value> {
    let sibling_id = match &value {
        Value::Object(object) => object.get("block_id").cloned(),
        _ => None,
    };

    let block = Block::parse(value, path)?;
    let sibling_id = match block {
        Block::Raw(_) | Block::Native(_) => None,
        _ => sibling_id,
    };

    let mut compiled = block.compile(path)?;
    if let (Some(block_id), Value::Object(object)) = (sibling_id, &mut compiled) {
        if !object.contains_key("block_id") {
            object.insert("block_id".to_string(), block_id);
        }
    }
    Ok(compiled)
}

fn compile_header(spec: HeaderSpec) -> Value {
    let (text, block_id) = match spec {
        HeaderSpec::Text(text) => (TextSpec::Text(text), None),
        HeaderSpec::Full { text, block_id } => (text, block_id),
    };

    NativeBuilder::new("header")
        .field("text", text.plain())
        .optional("block_id", block_id)
        .build()
}

fn compile_divider(spec: DividerSpec) -> Value {
    let block_id = match spec {
        DividerSpec::Presence(_) => None,
        DividerSpec::Full { block_id } => block_id,
    };

    NativeBuilder::new("divider")
        .optional("block_id", block_id)
        .build()
}

fn compile_section(spec: SectionSpec, path: &str) -> Result<Value> {
    let fields = match spec {
        SectionSpec::Text(text) => {
            return Ok(NativeBuilder::new("section")
                .field("text", TextSpec::Text(text).markdown())
                .build())
        }
        SectionSpec::Full(fields) => fields,
    };

    if fields.text.is_none() && fields.fields.is_empty() {
        return Err(CompileError::invalid(
            "section",
            path,
            "requires 'text' or 'fields'",
        ));
    }

    let compiled_fields: Vec<Value> = fields.fields.into_iter().map(TextSpec::markdown).collect();
    let accessory = fields
        .accessory
        .map(|accessory| compile_element(accessory, &format!("{}.accessory", path)))
        .transpose()?;

    Ok(NativeBuilder::new("section")
        .optional("text", fields.text.map(TextSpec::markdown))
        .optional(
            "fields",
            (!compiled_fields.is_empty()).then_some(Value::Array(compiled_fields)),
        )
        .optional("accessory", accessory)
        .optional("block_id", fields.block_id)
        .build())
}

fn compile_context(spec: ContextSpec, path: &str) -> Result<Value> {
    let (items, block_id) = match spec {
        ContextSpec::Items(items) => (items, None),
        ContextSpec::Full { elements, block_id } => (elements, block_id),
    };

    let elements = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| compile_context_item(item, &format!("{}.elements[{}]", path, index)))
        .collect::<Result<Vec<_>>>()?;

    Ok(NativeBuilder::new("context")
        .field("elements", elements)
        .optional("block_id", block_id)
        .build())
}

/// Context items are markdown text, images, raw fragments or native elements
fn compile_context_item(item: Value, path: &str) -> Result<Value> {
    let mut object = match item {
        Value::String(text) => return Ok(TextSpec::Text(text).markdown()),
        Value::Object(object) => object,
        _ => {
            return Err(CompileError::UnrecognizedElement {
                path: path.to_string(),
                keys: Vec::new(),
            })
        }
    };

    if object.contains_key("type") {
        return Ok(Value::Object(object));
    }
    if let Some(raw) = object.remove("raw") {
        return Ok(raw);
    }
    if let Some(image) = object.remove("image") {
        let source: ImageSource = parse_spec("image", path, image)?;
        return image_fields(NativeBuilder::new("image"), source, path).map(NativeBuilder::build);
    }
    if let Some(text) = object.remove("text") {
        let text: TextSpec = parse_spec("context", path, text)?;
        return Ok(text.markdown());
    }

    Err(CompileError::UnrecognizedElement {
        path: path.to_string(),
        keys: object.keys().cloned().collect(),
    })
}

fn compile_actions(spec: ActionsSpec, path: &str) -> Result<Value> {
    let (items, block_id) = match spec {
        ActionsSpec::Elements(items) => (items, None),
        ActionsSpec::Full { elements, block_id } => (elements, block_id),
    };

    let elements = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| compile_element(item, &format!("{}.elements[{}]", path, index)))
        .collect::<Result<Vec<_>>>()?;

    Ok(NativeBuilder::new("actions")
        .field("elements", elements)
        .optional("block_id", block_id)
        .build())
}

/// Adds `image_url` or `slack_file` plus `alt_text`; exactly one source may be set
fn image_fields(builder: NativeBuilder, source: ImageSource, path: &str) -> Result<NativeBuilder> {
    let builder = match (source.url, source.file_id) {
        (Some(url), None) => builder.field("image_url", url),
        (None, Some(file_id)) => {
            let mut slack_file = Map::new();
            slack_file.insert("id".to_string(), Value::String(file_id));
            builder.field("slack_file", Value::Object(slack_file))
        }
        (Some(_), Some(_)) => {
            return Err(CompileError::invalid(
                "image",
                path,
                "set either 'url' or 'file_id', not both",
            ))
        }
        (None, None) => {
            return Err(CompileError::invalid(
                "image",
                path,
                "requires 'url' or 'file_id'",
            ))
        }
    };

    Ok(builder.field("alt_text", source.alt))
}

fn compile_image(spec: ImageSpec, path: &str) -> Result<Value> {
    Ok(image_fields(NativeBuilder::new("image"), spec.source, path)?
        .optional("title", spec.title.map(TextSpec::plain))
        .optional("block_id", spec.block_id)
        .build())
}

fn compile_video(spec: VideoSpec) -> Value {
    NativeBuilder::new("video")
        .field("video_url", spec.url)
        .field("thumbnail_url", spec.thumbnail)
        .field("alt_text", spec.alt)
        .field("title", spec.title.plain())
        .optional("description", spec.description.map(TextSpec::plain))
        .optional("title_url", spec.title_url)
        .optional("author_name", spec.author_name)
        .optional("provider_name", spec.provider_name)
        .optional("provider_icon_url", spec.provider_icon_url)
        .optional("block_id", spec.block_id)
        .build()
}

fn compile_markdown(spec: MarkdownSpec) -> Value {
    let (text, block_id) = match spec {
        MarkdownSpec::Text(text) => (text, None),
        MarkdownSpec::Full { text, block_id } => (text, block_id),
    };

    NativeBuilder::new("markdown")
        .field("text", text)
        .optional("block_id", block_id)
        .build()
}

fn compile_file(spec: FileSpec) -> Value {
    let (external_id, block_id) = match spec {
        FileSpec::ExternalId(external_id) => (external_id, None),
        FileSpec::Full {
            external_id,
            block_id,
        } => (external_id, block_id),
    };

    NativeBuilder::new("file")
        .field("external_id", external_id)
        .field("source", "remote")
        .optional("block_id", block_id)
        .build()
}

fn compile_table(spec: TableSpec) -> Value {
    NativeBuilder::new("table")
        .optional("column_settings", spec.columns)
        .field("rows", spec.rows)
        .optional("block_id", spec.block_id)
        .build()
}
