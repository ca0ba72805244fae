// ABOUTME: Interactive element shorthand and its compilation to native elements
// ABOUTME: Buttons, menus and pickers, plus shared option and confirmation dialog compilers

use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::{CompileError, Result};
use super::native::{find_keyword, parse_spec, NativeBuilder, TextSpec};

pub const ELEMENT_KEYWORDS: [&str; 7] = [
    "button",
    "overflow",
    "datepicker",
    "timepicker",
    "select",
    "multi_select",
    "raw",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Button(ButtonSpec),
    Overflow(OverflowSpec),
    DatePicker(DatePickerSpec),
    TimePicker(TimePickerSpec),
    Select(SelectSpec),
    MultiSelect(MultiSelectSpec),
    Raw(Value),
    Native(Value),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ButtonSpec {
    Label(String),
    Full(ButtonFields),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ButtonFields {
    pub text: TextSpec,
    pub action_id: Option<String>,
    pub value: Option<String>,
    pub url: Option<String>,
    pub style: Option<String>,
    pub confirm: Option<ConfirmSpec>,
    pub accessibility_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverflowSpec {
    pub action_id: Option<String>,
    pub options: Vec<OptionSpec>,
    pub confirm: Option<ConfirmSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DatePickerSpec {
    pub action_id: Option<String>,
    pub initial_date: Option<String>,
    pub placeholder: Option<TextSpec>,
    pub confirm: Option<ConfirmSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimePickerSpec {
    pub action_id: Option<String>,
    pub initial_time: Option<String>,
    pub timezone: Option<String>,
    pub placeholder: Option<TextSpec>,
    pub confirm: Option<ConfirmSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectSpec {
    pub action_id: Option<String>,
    pub placeholder: Option<TextSpec>,
    pub options: Vec<OptionSpec>,
    pub initial_option: Option<OptionSpec>,
    pub confirm: Option<ConfirmSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultiSelectSpec {
    pub action_id: Option<String>,
    pub placeholder: Option<TextSpec>,
    pub options: Vec<OptionSpec>,
    #[serde(default)]
    pub initial_options: Vec<OptionSpec>,
    pub max_selected_items: Option<u32>,
    pub confirm: Option<ConfirmSpec>,
}

/// A menu option: a bare string is used as both label and value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionSpec {
    Value(String),
    Full {
        text: TextSpec,
        value: Option<String>,
        description: Option<TextSpec>,
        url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfirmSpec {
    pub title: TextSpec,
    pub text: TextSpec,
    pub confirm: TextSpec,
    pub deny: TextSpec,
    pub style: Option<String>,
}

impl Element {
    /// Classify an element by its `type` field or its first shorthand key
    pub fn parse(value: Value, path: &str) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(CompileError::UnrecognizedElement {
                path: path.to_string(),
                keys: Vec::new(),
            });
        };

        if object.contains_key("type") {
            return Ok(Element::Native(Value::Object(object)));
        }

        let Some(keyword) = find_keyword(&object, &ELEMENT_KEYWORDS) else {
            return Err(CompileError::UnrecognizedElement {
                path: path.to_string(),
                keys: object.keys().cloned().collect(),
            });
        };
        let inner = object.remove(keyword).unwrap_or(Value::Null);

        Ok(match keyword {
            "button" => Element::Button(parse_spec(keyword, path, inner)?),
            "overflow" => Element::Overflow(parse_spec(keyword, path, inner)?),
            "datepicker" => Element::DatePicker(parse_optional_spec(keyword, path, inner)?),
            "timepicker" => Element::TimePicker(parse_optional_spec(keyword, path, inner)?),
            "select" => Element::Select(parse_spec(keyword, path, inner)?),
            "multi_select" => Element::MultiSelect(parse_spec(keyword, path, inner)?),
            _ => Element::Raw(inner),
        })
    }

    pub fn compile(self, path: &str) -> Result<Value> {
        match self {
            Element::Button(spec) => compile_button(spec, path),
            Element::Overflow(spec) => compile_overflow(spec, path),
            Element::DatePicker(spec) => compile_datepicker(spec, path),
            Element::TimePicker(spec) => compile_timepicker(spec, path),
            Element::Select(spec) => compile_select(spec, path),
            Element::MultiSelect(spec) => compile_multi_select(spec, path),
            Element::Raw(value) | Element::Native(value) => Ok(value),
        }
    }
}

/// Parse and compile a single element
pub fn compile_element(value: Value, path: &str) -> Result<Value> {
    Element::parse(value, path)?.compile(path)
}

/// `datepicker:` with no settings is allowed
fn parse_optional_spec<T>(construct: &str, path: &str, value: Value) -> Result<T>
where
    T: Default + serde::de::DeserializeOwned,
{
    match value {
        Value::Null | Value::Bool(true) => Ok(T::default()),
        other => parse_spec(construct, path, other),
    }
}

fn compile_button(spec: ButtonSpec, path: &str) -> Result<Value> {
    let fields = match spec {
        ButtonSpec::Label(label) => {
            return Ok(NativeBuilder::new("button")
                .field("text", TextSpec::Text(label).plain())
                .build())
        }
        ButtonSpec::Full(fields) => fields,
    };

    if let Some(style) = fields.style.as_deref() {
        if style != "primary" && style != "danger" {
            return Err(CompileError::invalid(
                "button",
                path,
                format!("style must be 'primary' or 'danger', got '{}'", style),
            ));
        }
    }

    Ok(NativeBuilder::new("button")
        .field("text", fields.text.plain())
        .optional("action_id", fields.action_id)
        .optional("value", fields.value)
        .optional("url", fields.url)
        .optional("style", fields.style)
        .optional("confirm", fields.confirm.map(compile_confirm))
        .optional("accessibility_label", fields.accessibility_label)
        .build())
}

fn compile_overflow(spec: OverflowSpec, path: &str) -> Result<Value> {
    Ok(NativeBuilder::new("overflow")
        .optional("action_id", spec.action_id)
        .field("options", compile_options(spec.options, "overflow", path)?)
        .optional("confirm", spec.confirm.map(compile_confirm))
        .build())
}

fn compile_datepicker(spec: DatePickerSpec, _path: &str) -> Result<Value> {
    Ok(NativeBuilder::new("datepicker")
        .optional("action_id", spec.action_id)
        .optional("initial_date", spec.initial_date)
        .optional("placeholder", spec.placeholder.map(TextSpec::plain))
        .optional("confirm", spec.confirm.map(compile_confirm))
        .build())
}

fn compile_timepicker(spec: TimePickerSpec, _path: &str) -> Result<Value> {
    Ok(NativeBuilder::new("timepicker")
        .optional("action_id", spec.action_id)
        .optional("initial_time", spec.initial_time)
        .optional("timezone", spec.timezone)
        .optional("placeholder", spec.placeholder.map(TextSpec::plain))
        .optional("confirm", spec.confirm.map(compile_confirm))
        .build())
}

fn compile_select(spec: SelectSpec, path: &str) -> Result<Value> {
    let options = compile_options(spec.options, "select", path)?;
    let initial = spec
        .initial_option
        .map(|initial| match_initial(initial, &options, "select", path))
        .transpose()?;

    Ok(NativeBuilder::new("static_select")
        .optional("action_id", spec.action_id)
        .optional("placeholder", spec.placeholder.map(TextSpec::plain))
        .field("options", options)
        .optional("initial_option", initial)
        .optional("confirm", spec.confirm.map(compile_confirm))
        .build())
}

fn compile_multi_select(spec: MultiSelectSpec, path: &str) -> Result<Value> {
    let options = compile_options(spec.options, "multi_select", path)?;
    let initial = spec
        .initial_options
        .into_iter()
        .map(|initial| match_initial(initial, &options, "multi_select", path))
        .collect::<Result<Vec<_>>>()?;

    Ok(NativeBuilder::new("multi_static_select")
        .optional("action_id", spec.action_id)
        .optional("placeholder", spec.placeholder.map(TextSpec::plain))
        .field("options", options)
        .optional(
            "initial_options",
            (!initial.is_empty()).then_some(Value::Array(initial)),
        )
        .optional("max_selected_items", spec.max_selected_items)
        .optional("confirm", spec.confirm.map(compile_confirm))
        .build())
}

/// Compile a list of menu options
pub fn compile_options(options: Vec<OptionSpec>, construct: &str, path: &str) -> Result<Vec<Value>> {
    options
        .into_iter()
        .map(|option| compile_option(option, construct, path))
        .collect()
}

pub fn compile_option(option: OptionSpec, construct: &str, path: &str) -> Result<Value> {
    match option {
        OptionSpec::Value(value) => {
            let mut object = Map::new();
            object.insert("text".to_string(), TextSpec::Text(value.clone()).plain());
            object.insert("value".to_string(), Value::String(value));
            Ok(Value::Object(object))
        }
        OptionSpec::Full {
            text,
            value,
            description,
            url,
        } => {
            let value = value
                .or_else(|| text.as_str().map(str::to_string))
                .ok_or_else(|| CompileError::invalid(construct, path, "option requires a value"))?;

            let mut object = Map::new();
            object.insert("text".to_string(), text.plain());
            object.insert("value".to_string(), Value::String(value));
            if let Some(description) = description {
                object.insert("description".to_string(), description.plain());
            }
            if let Some(url) = url {
                object.insert("url".to_string(), Value::String(url));
            }
            Ok(Value::Object(object))
        }
    }
}

/// An initial selection given by value reuses the matching compiled option
fn match_initial(initial: OptionSpec, options: &[Value], construct: &str, path: &str) -> Result<Value> {
    if let OptionSpec::Value(ref wanted) = initial {
        if let Some(found) = options
            .iter()
            .find(|option| option.get("value").and_then(Value::as_str) == Some(wanted.as_str()))
        {
            return Ok(found.clone());
        }
    }
    compile_option(initial, construct, path)
}

pub fn compile_confirm(spec: ConfirmSpec) -> Value {
    let mut object = Map::new();
    object.insert("title".to_string(), spec.title.plain());
    object.insert("text".to_string(), spec.text.plain());
    object.insert("confirm".to_string(), spec.confirm.plain());
    object.insert("deny".to_string(), spec.deny.plain());
    if let Some(style) = spec.style {
        object.insert("style".to_string(), Value::String(style));
    }
    Value::Object(object)
}
