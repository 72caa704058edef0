//! Rich-text message blocks and the inline markup grammar.
//!
//! ```text
//! Block         := Text | Code | Bullets
//! Text          := { type: "text", value: Markup }
//! Code          := { type: "code", language?: String, value: String }
//! Bullets       := { type: "bullets", blocks: [Text] }
//!
//! Markup        := (Pattern | String)+
//! Pattern       := Emoji | Mention | Variable | Bold | Italic | InlineLink
//! ```
//!
//! Text values are emitted verbatim. Callers embedding untrusted text must
//! escape it themselves; only attribute values (`value="..."`) are escaped
//! by the constructors here.

use serde::Serialize;

/// One unit of a structured chat message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBlock {
    /// Markup text.
    Text { value: String },
    /// Literal code with an optional language tag.
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        value: String,
    },
    /// Bulleted list of sub-blocks.
    Bullets { blocks: Vec<MessageBlock> },
}

impl MessageBlock {
    pub fn text(value: impl Into<String>) -> Self {
        MessageBlock::Text {
            value: value.into(),
        }
    }

    pub fn code(value: impl Into<String>, language: Option<String>) -> Self {
        MessageBlock::Code {
            language,
            value: value.into(),
        }
    }

    pub fn bullets(blocks: Vec<MessageBlock>) -> Self {
        MessageBlock::Bullets { blocks }
    }
}

/// Button color used for feed links.
pub const COLOR_VARIANT_COBALT: u8 = 1;

/// Call-to-action button attached below a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub title: String,
    pub color_variant: u8,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonAction {
    pub web_action: WebAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebAction {
    pub attributes: WebActionAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebActionAttributes {
    pub url: String,
}

impl Button {
    /// Button opening `url` in the browser.
    pub fn web_link(title: impl Into<String>, url: impl Into<String>, color_variant: u8) -> Self {
        Self {
            title: title.into(),
            color_variant,
            action: ButtonAction {
                web_action: WebAction {
                    attributes: WebActionAttributes { url: url.into() },
                },
            },
        }
    }
}

/// Kind of entity a mention points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionType {
    Manager,
    Team,
}

impl MentionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentionType::Manager => "manager",
            MentionType::Team => "team",
        }
    }
}

/// `:{name}:`
pub fn emoji(name: &str) -> String {
    format!(":{name}:")
}

/// `<link type="{manager|team}" value="{id}">{name}</link>`
pub fn mention(mention_type: MentionType, id: &str, name: &str) -> String {
    format!(
        "<link type=\"{}\" value=\"{}\">{}</link>",
        mention_type.as_str(),
        escaped_string(id),
        name
    )
}

/// `<b>{s}</b>`
pub fn bold(s: &str) -> String {
    format!("<b>{s}</b>")
}

/// `<i>{s}</i>`
pub fn italic(s: &str) -> String {
    format!("<i>{s}</i>")
}

/// `<link type="url" value="{href}">{s}</link>`
pub fn inline_link(href: &str, s: &str) -> String {
    format!(
        "<link type=\"url\" value=\"{}\">{}</link>",
        escaped_string(href),
        s
    )
}

/// `${key}` or `${key|alt}`
pub fn variable(key: &str, alt: Option<&str>) -> String {
    match alt {
        Some(alt) if !alt.is_empty() => format!("${{{key}|{alt}}}"),
        _ => format!("${{{key}}}"),
    }
}

/// Replace `"`, `&`, `<` and `>` with their entities.
///
/// Not idempotent: `&` in an already escaped string is escaped again.
pub fn escaped_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("&quot;"),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
