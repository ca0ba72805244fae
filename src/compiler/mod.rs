// ABOUTME: Shorthand compiler from the block DSL to native message payloads
// ABOUTME: Detects shorthand messages and compiles each block, passing everything else through

pub mod blocks;
pub mod elements;
pub mod error;
pub mod native;

use serde_json::{Map, Value};
use tracing::debug;

pub use blocks::{compile_block, Block, BLOCK_KEYWORDS};
pub use elements::{compile_element, Element, ELEMENT_KEYWORDS};
pub use error::{CompileError, Result};
pub use native::{NativeBuilder, TextSpec};

/// True when `blocks` is a non-empty array and at least one block uses a shorthand key
pub fn is_shorthand(message: &Value) -> bool {
    let Some(blocks) = message.get("blocks").and_then(Value::as_array) else {
        return false;
    };

    blocks.iter().any(|block| match block {
        Value::Object(object) => BLOCK_KEYWORDS.iter().any(|key| object.contains_key(*key)),
        _ => false,
    })
}

/// Compile a shorthand message into its native form.
///
/// Messages without shorthand are returned unchanged. Fields other than
/// `blocks` keep their position and value.
pub fn compile(message: &Value) -> Result<Value> {
    if !is_shorthand(message) {
        return Ok(message.clone());
    }

    let Value::Object(fields) = message else {
        return Ok(message.clone());
    };

    let mut compiled = Map::with_capacity(fields.len());
    for (key, value) in fields {
        if key != "blocks" {
            compiled.insert(key.clone(), value.clone());
            continue;
        }

        let blocks = value.as_array().cloned().unwrap_or_default();
        debug!("Compiling {} shorthand blocks", blocks.len());
        let native = blocks
            .into_iter()
            .enumerate()
            .map(|(index, block)| compile_block(block, &format!("blocks[{}]", index)))
            .collect::<Result<Vec<_>>>()?;
        compiled.insert(key.clone(), Value::Array(native));
    }

    Ok(Value::Object(compiled))
}
