//! The card that stands in for a notebook link on a gallery page.

use ego_tree::{NodeId, Tree};
use scraper::{Html, Node};

use crate::dom;

/// Markup every card is stamped from.
pub const CARD_TEMPLATE: &str = r#"<article>
    <a>
        <div class="background"></div>
        <h3></h3>
        <img alt="Click to open this example">
    </a>
</article>"#;

/// Values filled into one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Link to the rendered notebook page.
    pub href: String,
    /// Preview image URL.
    pub image: String,
    /// Text of the original link.
    pub title: String,
}

/// Card markup parsed once and stamped per link.
#[derive(Debug)]
pub struct CardTemplate {
    fragment: Html,
}

impl Default for CardTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CardTemplate {
    pub fn new() -> Self {
        Self::from_markup(CARD_TEMPLATE)
    }

    /// Template from custom markup. Every `a` receives the card link, every
    /// `img` the preview and every `h3` the title.
    pub fn from_markup(markup: &str) -> Self {
        Self {
            fragment: Html::parse_fragment(markup),
        }
    }

    /// A filled copy of the template.
    fn stamp(&self, card: &Card) -> Html {
        let mut stamped = self.fragment.clone();
        fill(&mut stamped.tree, card);
        stamped
    }

    /// Insert a filled copy of the template into `tree`, just before `target`.
    pub(crate) fn insert_before(&self, tree: &mut Tree<Node>, target: NodeId, card: &Card) {
        let stamped = self.stamp(card);
        let root = tree.extend_tree(stamped.tree).id();

        // The fragment parser wraps the card in an `<html>` element.
        let content: Vec<NodeId> = tree
            .get(root)
            .and_then(|root| root.children().find(|child| child.value().is_element()))
            .map(|wrapper| wrapper.children().map(|child| child.id()).collect())
            .unwrap_or_default();

        let Some(mut target) = tree.get_mut(target) else {
            return;
        };
        for id in content {
            target.insert_id_before(id);
        }
    }

    /// The stamped markup as a standalone string.
    pub fn render(&self, card: &Card) -> String {
        self.stamp(card).root_element().inner_html()
    }
}

fn fill(tree: &mut Tree<Node>, card: &Card) {
    let ids: Vec<NodeId> = tree.root().descendants().map(|node| node.id()).collect();
    let mut headings = Vec::new();

    for id in ids {
        let Some(mut node) = tree.get_mut(id) else {
            continue;
        };
        let Node::Element(element) = node.value() else {
            continue;
        };
        let name = element.name().to_owned();
        match name.as_str() {
            "a" => dom::set_attr(element, "href", &card.href),
            "img" => dom::set_attr(element, "src", &card.image),
            "h3" => headings.push(id),
            _ => {}
        }
    }

    for id in headings {
        dom::replace_text(tree, id, &card.title);
    }
}
