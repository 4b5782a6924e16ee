//! Styled text fragments → plain text + formatting entities.

use crate::domain::{Entity, EntityKind};

/// One styled fragment of a message.
///
/// `style` can be `bold`, `italic`, `underline`, `strikethrough`, `text_link`
/// or `mention`; an empty (or unknown) style is plain text. `url` is only used
/// by `text_link`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MsgComponent {
    pub text: String,
    pub style: String,
    pub url: String,
}

impl MsgComponent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn styled(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
            url: String::new(),
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: "text_link".to_string(),
            url: url.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Concatenate the fragments and emit one entity per styled fragment.
///
/// Offsets are byte offsets into the returned text, taken from the running
/// length of the concatenation.
pub fn compile_components(components: &[MsgComponent]) -> (String, Vec<Entity>) {
    let mut text = String::with_capacity(components.iter().map(MsgComponent::len).sum());
    let mut entities = Vec::new();

    for component in components {
        let offset = text.len();
        text.push_str(&component.text);
        if let Some(kind) = EntityKind::from_style(&component.style, &component.url) {
            entities.push(Entity {
                kind,
                offset,
                length: component.len(),
            });
        }
    }

    (text, entities)
}
