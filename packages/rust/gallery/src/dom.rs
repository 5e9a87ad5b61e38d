//! Small in-place edits on a parsed page, and serialization back to markup.

use std::io;

use ego_tree::{NodeId, Tree};
use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::{LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{Html, Node, StrTendril};

/// Set an unprefixed attribute, replacing any previous value.
pub(crate) fn set_attr(element: &mut Element, key: &str, value: &str) {
    element
        .attrs
        .retain(|(name, _)| !(name.ns.is_empty() && &*name.local == key));
    element.attrs.push((
        QualName::new(None, Namespace::from(""), LocalName::from(key)),
        StrTendril::from_slice(value),
    ));
}

/// Change the tag name, keeping namespace and attributes.
pub(crate) fn rename(element: &mut Element, tag: &str) {
    element.name.local = LocalName::from(tag);
}

/// Replace every child of `id` with a single text node.
pub(crate) fn replace_text(tree: &mut Tree<Node>, id: NodeId, text: &str) {
    let Some(mut node) = tree.get_mut(id) else {
        return;
    };
    while let Some(mut child) = node.first_child() {
        child.detach();
    }
    node.append(Node::Text(Text {
        text: StrTendril::from_slice(text),
    }));
}

/// Serialize a parsed page.
///
/// Documents are written whole, doctype included. Fragments are written
/// without the `<html>` wrapper the fragment parser adds. Scripting stays
/// enabled so `<noscript>` content round-trips as raw text, the way it was
/// parsed.
pub(crate) fn to_html(page: &Html, document: bool) -> io::Result<String> {
    let mut buf = Vec::new();
    if document {
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::IncludeNode,
            ..Default::default()
        };
        serialize(&mut buf, page, opts)?;
    } else {
        serialize(&mut buf, &page.root_element(), SerializeOpts::default())?;
    }
    String::from_utf8(buf).map_err(io::Error::other)
}
