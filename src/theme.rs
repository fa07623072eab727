use serde::{Deserialize, Serialize};

/// Theme settings stored as JSON text in the settings row. Incoming blobs
/// must parse into this shape before they are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeConfig {
    pub primary_color: String,
    pub primary_color_hover: String,
    pub font_family: String,
    pub border_radius: String,
    pub button_style: ButtonStyle,
    pub bg_style: BgStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_gradient_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_gradient_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Filled,
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BgStyle {
    White,
    Light,
    Gradient,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_color: "#3B82F6".into(),
            primary_color_hover: "#2563EB".into(),
            font_family: r#""DM Sans", system-ui, sans-serif"#.into(),
            border_radius: "12px".into(),
            button_style: ButtonStyle::Filled,
            bg_style: BgStyle::White,
            bg_gradient_from: None,
            bg_gradient_to: None,
        }
    }
}

/// Parses a stored theme column. Unknown or missing fields fall back to
/// defaults; unparseable JSON yields the default theme wholesale.
pub fn parse_theme(theme_json: &str) -> ThemeConfig {
    serde_json::from_str(theme_json).unwrap_or_default()
}

/// Validates an incoming theme blob before it is stored, rejecting shapes
/// `parse_theme` would silently discard.
pub fn validate_theme(theme_json: &str) -> Result<ThemeConfig, serde_json::Error> {
    serde_json::from_str(theme_json)
}

/// One button in a mid-page content block. The blocks store a list of these
/// as JSON text; the API validates the shape on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: String,
    pub url: String,
}

pub fn validate_link_buttons(json: &str) -> Result<Vec<LinkButton>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn validate_social_links(json: &str) -> Result<Vec<SocialLink>, serde_json::Error> {
    serde_json::from_str(json)
}
