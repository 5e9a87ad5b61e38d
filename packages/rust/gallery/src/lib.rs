//! Gallery page rewriting.
//!
//! Lists of notebook links on a built HTML page become a gallery: each list
//! item holding a link to an `.ipynb` file is replaced by a card pointing at
//! the rendered notebook page and its preview image, and the enclosing list is
//! renamed to a `div.gallery` container.

mod dom;
mod template;

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

use swangallery_shared::{NotebookRef, RENDERED_MARKER};

pub use template::{CARD_TEMPLATE, Card, CardTemplate};

/// Link targets that turn into cards.
static NOTEBOOK_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.ipynb(\?clone_folder=True)?$").expect("valid notebook href regex")
});

/// Markup that has to be parsed as a whole document rather than a fragment.
static DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(!doctype|html)[\s>]").expect("valid document regex")
});

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Why a notebook link was left as it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The link is not inside a list item.
    NotInList,
    /// The link target cannot be mapped to a notebook location.
    InvalidReference(String),
    /// Another notebook link already claimed the same list item.
    SharedListItem,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInList => f.write_str("link is not inside a list item"),
            Self::InvalidReference(reason) => write!(f, "invalid notebook reference: {reason}"),
            Self::SharedListItem => f.write_str("list item already holds a notebook link"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub href: String,
    pub reason: SkipReason,
}

/// Outcome of rewriting one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite<'a> {
    /// The page markup, borrowed when nothing changed.
    pub html: Cow<'a, str>,
    /// Number of cards produced.
    pub cards: usize,
    pub skipped: Vec<SkippedLink>,
}

impl<'a> Rewrite<'a> {
    fn unchanged(html: &'a str, skipped: Vec<SkippedLink>) -> Self {
        Self {
            html: Cow::Borrowed(html),
            cards: 0,
            skipped,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self.html, Cow::Owned(_))
    }
}

// ---------------------------------------------------------------------------
// Rewriting
// ---------------------------------------------------------------------------

/// Convert the notebook link lists of one built page into galleries.
///
/// Rendered notebook pages carry [`RENDERED_MARKER`] and are returned
/// untouched, as are pages without any convertible link. Links that cannot be
/// converted are reported in [`Rewrite::skipped`] and stay in the page.
pub fn rewrite_page<'a>(html: &'a str, template: &CardTemplate, notebook_dir: &str) -> Rewrite<'a> {
    if html.contains(RENDERED_MARKER) {
        debug!("rendered notebook page, leaving as is");
        return Rewrite::unchanged(html, Vec::new());
    }

    let document = DOCUMENT_RE.is_match(html);
    let mut page = if document {
        Html::parse_document(html)
    } else {
        Html::parse_fragment(html)
    };
    let (plan, skipped) = plan_page(&page, notebook_dir);

    for link in &skipped {
        warn!(href = %link.href, reason = %link.reason, "notebook link left unchanged");
    }

    if plan.cards.is_empty() {
        return Rewrite::unchanged(html, skipped);
    }

    let cards = plan.cards.len();
    plan.apply(&mut page, template);

    match dom::to_html(&page, document) {
        Ok(out) => Rewrite {
            html: Cow::Owned(out),
            cards,
            skipped,
        },
        Err(e) => {
            warn!(error = %e, "failed to serialize gallery page");
            Rewrite::unchanged(html, skipped)
        }
    }
}

/// List items to replace with cards and lists to turn into galleries.
#[derive(Debug, Default)]
struct Plan {
    cards: HashMap<NodeId, Card>,
    galleries: HashSet<NodeId>,
}

impl Plan {
    fn apply(self, page: &mut Html, template: &CardTemplate) {
        for id in self.galleries {
            let Some(mut list) = page.tree.get_mut(id) else {
                continue;
            };
            if let Node::Element(element) = list.value() {
                dom::rename(element, "div");
                dom::set_attr(element, "class", "gallery");
            }
        }

        for (id, card) in self.cards {
            template.insert_before(&mut page.tree, id, &card);
            if let Some(mut item) = page.tree.get_mut(id) {
                item.detach();
            }
        }
    }
}

/// Decide which list items become cards and which lists become galleries.
fn plan_page(page: &Html, notebook_dir: &str) -> (Plan, Vec<SkippedLink>) {
    let anchors = Selector::parse("a[href]").expect("valid anchor selector");

    let mut plan = Plan::default();
    let mut skipped = Vec::new();

    for anchor in page.select(&anchors) {
        let href = anchor.value().attr("href").unwrap_or_default();
        if !NOTEBOOK_HREF_RE.is_match(href) {
            continue;
        }
        let skip = |reason| SkippedLink {
            href: href.to_string(),
            reason,
        };

        let Some(item) = nearest(anchor, "li") else {
            skipped.push(skip(SkipReason::NotInList));
            continue;
        };

        let reference = NotebookRef::parse(href);
        // The card drops the folder level a zip link nests the notebook in.
        if reference.clone_folder() && !reference.path().contains('/') {
            skipped.push(skip(SkipReason::InvalidReference(
                "no enclosing folder to drop".to_string(),
            )));
            continue;
        }
        let layout = match reference.layout() {
            Ok(layout) => layout,
            Err(e) => {
                skipped.push(skip(SkipReason::InvalidReference(e.to_string())));
                continue;
            }
        };

        match plan.cards.entry(item.id()) {
            Entry::Occupied(_) => {
                skipped.push(skip(SkipReason::SharedListItem));
                continue;
            }
            Entry::Vacant(slot) => {
                slot.insert(Card {
                    href: layout.site_url(notebook_dir, "html"),
                    image: layout.site_url(notebook_dir, "png"),
                    title: anchor.text().collect(),
                });
            }
        }

        if let Some(list) = nearest(item, "ul") {
            plan.galleries.insert(list.id());
        }
    }

    (plan, skipped)
}

/// Closest ancestor element named `tag`.
fn nearest<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}
