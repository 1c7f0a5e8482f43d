use facet::Facet;

/// Source metadata for one compiled or inlined function.
///
/// Captured at compile time by the runtime-side actor; the live script
/// handle it was read from never leaves the runtime.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(rename_all = "camelCase")]
pub struct Script {
    /// Function name as the runtime reports it. Absent for anonymous functions.
    #[facet(default)]
    pub display_name: Option<String>,
    pub url: String,
    /// 1-based line where the function starts.
    pub start_line: u32,
    pub line_count: u32,
    /// Offset of the function's source text within its source.
    pub source_start: u32,
    pub source_length: u32,
}

impl Script {
    /// Name used in listings; anonymous functions get a placeholder.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("(anonymous)")
    }

    /// `file:line` where `file` is the last segment of the script url.
    pub fn location(&self) -> String {
        let file = self.url.rsplit('/').next().unwrap_or(self.url.as_str());
        format!("{file}:{}", self.start_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_uses_camel_case_field_names() {
        let json = r#"{"displayName":"add","url":"http://example.test/lib/math.js","startLine":12,"lineCount":3,"sourceStart":140,"sourceLength":52}"#;
        let script: Script = facet_json::from_str(json).expect("script must decode");
        assert_eq!(script.name(), "add");
        assert_eq!(script.location(), "math.js:12");
        assert_eq!(script.source_length, 52);
    }

    #[test]
    fn anonymous_script_has_placeholder_name() {
        let json = r#"{"displayName":null,"url":"inline","startLine":1,"lineCount":1,"sourceStart":0,"sourceLength":10}"#;
        let script: Script = facet_json::from_str(json).expect("script must decode");
        assert_eq!(script.name(), "(anonymous)");
        assert_eq!(script.location(), "inline:1");
    }
}
