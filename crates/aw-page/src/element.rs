//! Element snapshot types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity token assigned to each element when it enters the page.
///
/// Identities are never reused: a control that is removed and re-added is a
/// new instance with a fresh id, which is what resets its attempt budget.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rendered bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Visual center, the point the automator aims interactions at.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

impl Default for Rect {
    fn default() -> Self {
        Rect::ZERO
    }
}

/// Audio state carried by media elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaState {
    pub volume: f64,
    pub muted: bool,
}

/// The computed-style subset the watcher inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub opacity: f64,
    pub pointer_events_none: bool,
    pub z_index: Option<i32>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display_none: false,
            visibility_hidden: false,
            opacity: 1.0,
            pointer_events_none: false,
            z_index: None,
        }
    }
}

/// Snapshot of a single page element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageElement {
    pub id: ElementId,
    pub tag: String,
    /// Page-unique id attribute, if any.
    pub dom_id: Option<String>,
    pub classes: Vec<String>,
    pub text: String,
    pub aria_label: Option<String>,
    pub disabled: bool,
    pub aria_disabled: bool,
    pub connected: bool,
    pub rect: Rect,
    pub style: ComputedStyle,
    /// Inline style properties written by the watcher (blur, z-index, ...).
    pub inline: BTreeMap<String, String>,
    /// Present only on media elements.
    pub media: Option<MediaState>,
    pub parent: Option<ElementId>,
}

impl PageElement {
    /// New detached element; the page assigns the real id on insert.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: ElementId(0),
            tag: tag.into(),
            dom_id: None,
            classes: Vec::new(),
            text: String::new(),
            aria_label: None,
            disabled: false,
            aria_disabled: false,
            connected: false,
            rect: Rect::ZERO,
            style: ComputedStyle::default(),
            inline: BTreeMap::new(),
            media: None,
            parent: None,
        }
    }

    pub fn with_dom_id(mut self, dom_id: impl Into<String>) -> Self {
        self.dom_id = Some(dom_id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_media(mut self, media: MediaState) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_parent(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Any class token containing the fragment, case-insensitive.
    pub fn class_contains(&self, fragment: &str) -> bool {
        let fragment = fragment.to_ascii_lowercase();
        self.classes
            .iter()
            .any(|c| c.to_ascii_lowercase().contains(&fragment))
    }

    /// Case-insensitive keyword lookup over text content and aria label.
    pub fn label_contains(&self, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_lowercase();
        if self.text.to_ascii_lowercase().contains(&keyword) {
            return true;
        }
        self.aria_label
            .as_deref()
            .map(|l| l.to_ascii_lowercase().contains(&keyword))
            .unwrap_or(false)
    }

    /// Effective stacking order: inline z-index overrides computed.
    pub fn effective_z_index(&self) -> i32 {
        if let Some(raw) = self.inline.get("z-index") {
            if let Ok(z) = raw.parse::<i32>() {
                return z;
            }
        }
        self.style.z_index.unwrap_or(0)
    }
}
