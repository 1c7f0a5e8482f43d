use std::error::Error;
use std::fmt;

/// Turns DOT text into something displayable.
///
/// Layout and rasterization live outside jitscope; implementations wrap
/// whatever engine the host application uses.
pub trait Renderer {
    type Image;

    fn render(&mut self, dot: &str) -> Result<Self::Image, RenderError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render failed: {}", self.message)
    }
}

impl Error for RenderError {}

/// Renderer that hands the DOT text back unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotSource;

impl Renderer for DotSource {
    type Image = String;

    fn render(&mut self, dot: &str) -> Result<String, RenderError> {
        Ok(dot.to_owned())
    }
}
