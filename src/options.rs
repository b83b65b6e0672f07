use serde::Deserialize;

/// Options for parsing a GPX route and rendering it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    /// Fail on the first invalid track point instead of skipping it (default: false)
    #[serde(default)]
    pub strict_points: bool,

    /// Include elevation as the 3rd coordinate value when rendering (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,

    /// Include timestamps in coordinateProperties.times when rendering (default: true)
    #[serde(default = "default_true")]
    pub include_time: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_points: false,
            include_elevation: true,
            include_time: true,
        }
    }
}

fn default_true() -> bool {
    true
}
