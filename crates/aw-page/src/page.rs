//! The page snapshot: element storage, queries, visibility, hit-testing.

use std::collections::BTreeMap;

use crate::element::{ElementId, PageElement};
use crate::pattern::{self, Pattern};

/// In-memory page-structure state.
///
/// Elements are stored in insertion order (ids ascend), which doubles as
/// document order for queries. A removed element's id is never reused.
#[derive(Debug, Clone, Default)]
pub struct Page {
    elements: BTreeMap<ElementId, PageElement>,
    next_id: u64,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an element, assigning it a fresh identity token.
    pub fn insert(&mut self, mut el: PageElement) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        el.id = id;
        el.connected = true;
        self.elements.insert(id, el);
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&PageElement> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut PageElement> {
        self.elements.get_mut(&id)
    }

    /// Remove an element and all its descendants from the page.
    pub fn remove(&mut self, id: ElementId) {
        let descendants: Vec<ElementId> = self
            .elements
            .keys()
            .copied()
            .filter(|&other| other != id && self.contains(id, other))
            .collect();
        for d in descendants {
            self.elements.remove(&d);
        }
        self.elements.remove(&id);
    }

    /// Mark an element as disconnected without removing it.
    pub fn detach(&mut self, id: ElementId) {
        if let Some(el) = self.elements.get_mut(&id) {
            el.connected = false;
        }
    }

    pub fn is_connected(&self, id: ElementId) -> bool {
        self.elements.get(&id).map(|e| e.connected).unwrap_or(false)
    }

    /// All connected elements matching the pattern, in document order.
    pub fn query(&self, pattern: &Pattern) -> Vec<ElementId> {
        self.elements
            .values()
            .filter(|el| el.connected && pattern.matches(el))
            .map(|el| el.id)
            .collect()
    }

    /// Union over an ordered pattern list, deduplicated, pattern priority
    /// first and document order within a pattern.
    pub fn query_any(&self, patterns: &[Pattern]) -> Vec<ElementId> {
        let mut seen = Vec::new();
        for pattern in patterns {
            for id in self.query(pattern) {
                if !seen.contains(&id) {
                    seen.push(id);
                }
            }
        }
        seen
    }

    pub fn matches(&self, id: ElementId, pattern: &Pattern) -> bool {
        self.elements
            .get(&id)
            .map(|el| pattern.matches(el))
            .unwrap_or(false)
    }

    /// Whether `ancestor` is a strict or equal ancestor of `descendant`.
    pub fn contains(&self, ancestor: ElementId, descendant: ElementId) -> bool {
        let mut current = Some(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.elements.get(&id).and_then(|el| el.parent);
        }
        false
    }

    /// Parent chain from nearest to root.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut chain = Vec::new();
        let mut current = self.elements.get(&id).and_then(|el| el.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.elements.get(&parent).and_then(|el| el.parent);
        }
        chain
    }

    /// Visibility per the shared definition: connected, displayed, not
    /// hidden, non-zero opacity, non-zero rendered area.
    pub fn is_visible(&self, id: ElementId) -> bool {
        let Some(el) = self.elements.get(&id) else {
            return false;
        };
        el.connected
            && !el.style.display_none
            && !el.style.visibility_hidden
            && el.style.opacity > 0.0
            && el.rect.area() > 0.0
    }

    /// Topmost visible element at a point: highest effective z-index wins,
    /// later document order breaks ties.
    pub fn element_from_point(&self, x: f64, y: f64) -> Option<ElementId> {
        self.elements
            .values()
            .filter(|el| el.connected && self.is_visible(el.id) && el.rect.contains(x, y))
            .max_by_key(|el| (el.effective_z_index(), el.id))
            .map(|el| el.id)
    }

    /// The main media element, if present.
    pub fn video(&self) -> Option<ElementId> {
        self.query(&pattern::VIDEO_PLAYER_PATTERN).into_iter().next()
    }

    /// The player container carrying ad-state markers, if present.
    pub fn player(&self) -> Option<ElementId> {
        self.query(&pattern::PLAYER_CONTAINER_PATTERN)
            .into_iter()
            .next()
    }

    pub fn set_inline(&mut self, id: ElementId, prop: &str, value: &str) {
        if let Some(el) = self.elements.get_mut(&id) {
            el.inline.insert(prop.to_string(), value.to_string());
        }
    }

    pub fn clear_inline(&mut self, id: ElementId, prop: &str) {
        if let Some(el) = self.elements.get_mut(&id) {
            el.inline.remove(prop);
        }
    }

    pub fn inline(&self, id: ElementId, prop: &str) -> Option<&str> {
        self.elements
            .get(&id)
            .and_then(|el| el.inline.get(prop))
            .map(String::as_str)
    }

    /// Whether a changed element is relevant to ad detection: its own
    /// class/id mentions ads, or it has an ad-marked descendant.
    pub fn is_ad_related(&self, id: ElementId) -> bool {
        let Some(el) = self.elements.get(&id) else {
            return false;
        };
        if el.class_contains("ad")
            || el
                .dom_id
                .as_deref()
                .map(|d| d.to_ascii_lowercase().contains("ad"))
                .unwrap_or(false)
        {
            return true;
        }
        self.elements
            .values()
            .any(|other| other.class_contains("ytp-ad") && self.contains(id, other.id))
    }
}
