//! Object merging for include splicing and fallback layering
//!
//! Merging is asymmetric: the base side wins every conflict, except that two
//! objects at the same key merge recursively so their distinct children
//! combine. Merged objects are written to fresh nodes; neither input is
//! modified.

use crate::parser::Root;
use crate::resolver::{self, Bindings};
use crate::value::{Element, NodeId, Tree, Value};
use tracing::debug;

/// Deep-merges the object at `incoming` under the object at `base`
///
/// Returns the node holding the merged object. If either side is not an
/// object, `base` is returned unchanged. With `bindings`, a base child that
/// is absent (only unbound optional substitutions) gives way to the incoming
/// child, and children that are substitutions merge as the objects they
/// resolve to.
pub(crate) fn merge_objects(
    tree: &mut Tree,
    bindings: Option<&Bindings>,
    base: NodeId,
    incoming: NodeId,
) -> NodeId {
    merge_into(tree, bindings, base, incoming, &mut Vec::new())
}

fn merge_into(
    tree: &mut Tree,
    bindings: Option<&Bindings>,
    base: NodeId,
    incoming: NodeId,
    active: &mut Vec<(NodeId, NodeId)>,
) -> NodeId {
    let (Some(base_object), Some(incoming_object)) = (
        tree.value(base).as_object().cloned(),
        tree.value(incoming).as_object().cloned(),
    ) else {
        return base;
    };
    // Substitutions pointing back at an enclosing object can revisit a pair
    if active.contains(&(base, incoming)) {
        return base;
    }
    active.push((base, incoming));

    let mut merged = base_object;
    for (key, incoming_child) in incoming_object {
        match merged.get(&key).copied() {
            None => {
                merged.insert(key, incoming_child);
            }
            Some(base_child)
                if bindings.is_some_and(|b| resolver::is_absent(tree, b, base_child)) =>
            {
                merged.insert(key, incoming_child);
            }
            Some(base_child) => {
                let pair = (
                    object_node(tree, bindings, base_child),
                    object_node(tree, bindings, incoming_child),
                );
                if let (Some(base_child), Some(incoming_child)) = pair {
                    let child = merge_into(tree, bindings, base_child, incoming_child, active);
                    merged.insert(key, child);
                }
            }
        }
    }

    active.pop();
    let mut value = Value::new();
    value.push(Element::Object(merged));
    tree.alloc(value)
}

/// The node holding the object `node` stands for, if any
///
/// Without bindings only literal objects count. A cyclic chain is not an
/// object here; the cycle surfaces when the value is read.
fn object_node(tree: &Tree, bindings: Option<&Bindings>, node: NodeId) -> Option<NodeId> {
    match bindings {
        Some(bindings) => resolver::object_node(tree, bindings, node).ok().flatten(),
        None => tree.value(node).is_object().then_some(node),
    }
}

/// Builds a new root where `primary` overrides `fallback`
///
/// Both trees are copied into one arena; their bindings carry over so the
/// merged document needs no second resolve pass.
pub(crate) fn merge_roots(
    primary: &Root,
    primary_node: NodeId,
    fallback: &Root,
    fallback_node: NodeId,
) -> Root {
    let mut tree = primary.tree.clone();
    let offsets = tree.import(&fallback.tree);

    let mut bindings = primary.bindings.clone();
    bindings.extend_shifted(&fallback.bindings, offsets);

    let root = merge_objects(
        &mut tree,
        Some(&bindings),
        primary_node,
        offsets.node(fallback_node),
    );
    debug!(
        nodes = tree.node_count(),
        substitutions = tree.substitution_count(),
        "Merged fallback root"
    );

    Root {
        tree,
        root,
        bindings,
    }
}
