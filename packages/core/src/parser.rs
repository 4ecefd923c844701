// ABOUTME: Extracts the program and optional package list from a model response
// ABOUTME: Fence-relative text search over the ```python and ```pip blocks

use genly_sandbox::ParsedProgram;
use thiserror::Error;

pub const CODE_FENCE: &str = "```python";
pub const PACKAGE_FENCE: &str = "```pip";
pub const CLOSING_FENCE: &str = "```";

/// Length of the `pip install ` prefix dropped from the package block.
/// The model is told to emit exactly that prefix; any other wording is sliced the same way.
pub const INSTALL_PREFIX_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("response contains no ```python code block")]
    MissingCodeFence,

    #[error("```python code block is never closed")]
    UnterminatedCodeBlock,
}

/// Find the first ```python block and an independent ```pip block
pub fn parse_response(text: &str) -> Result<ParsedProgram, ParseError> {
    let code = fenced_block(text, CODE_FENCE)
        .ok_or(ParseError::MissingCodeFence)?
        .ok_or(ParseError::UnterminatedCodeBlock)?;

    let packages = fenced_block(text, PACKAGE_FENCE)
        .flatten()
        .map(|block| block.chars().skip(INSTALL_PREFIX_LEN).collect::<String>())
        .map(|packages| packages.trim().to_string())
        .filter(|packages| !packages.is_empty());

    Ok(ParsedProgram {
        code: code.to_string(),
        packages,
    })
}

/// `None` when the opening fence is absent, `Some(None)` when it is never closed
fn fenced_block<'a>(text: &'a str, opening: &str) -> Option<Option<&'a str>> {
    let start = text.find(opening)? + opening.len();
    Some(
        text[start..]
            .find(CLOSING_FENCE)
            .map(|end| text[start..start + end].trim()),
    )
}
