//! Substitution resolution and cycle detection
//!
//! Resolution runs once, after the whole document (includes spliced in) has
//! been built. Each `${path}` is looked up from the document root and its
//! target recorded in a [`Bindings`] table; the tree itself is never touched.
//! Passes repeat while they make progress, so a path that walks through
//! another substitution binds regardless of document order.
//!
//! Cycles are not detected here. A document whose substitutions loop back on
//! themselves loads fine; [`check_cycle`] runs every time a reader follows a
//! substitution, and reports the cycle at that read.
//!
//! The cycle check only follows chains of substitution elements. It does not
//! descend into object or array children, so it is not a general graph cycle
//! detector.

use crate::config::split_path;
use crate::error::ResolveError;
use crate::value::{Element, HoconObject, ImportOffsets, NodeId, SubstitutionId, Tree};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Substitution id → bound target node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    targets: Vec<Option<NodeId>>,
}

impl Bindings {
    fn unbound(count: usize) -> Self {
        Self {
            targets: vec![None; count],
        }
    }

    /// Target of a substitution, if it was bound
    pub fn target(&self, id: SubstitutionId) -> Option<NodeId> {
        self.targets.get(id.index()).copied().flatten()
    }

    /// Number of substitutions covered by the table
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the table covers no substitutions
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn bind(&mut self, id: SubstitutionId, target: NodeId) {
        self.targets[id.index()] = Some(target);
    }

    /// Appends another document's bindings after an arena import
    pub(crate) fn extend_shifted(&mut self, other: &Bindings, offsets: ImportOffsets) {
        self.targets.extend(
            other
                .targets
                .iter()
                .map(|target| target.map(|node| offsets.node(node))),
        );
    }
}

/// Binds every substitution of `tree` against the object at `root`
pub(crate) fn resolve(tree: &Tree, root: NodeId) -> Result<Bindings, ResolveError> {
    let mut bindings = Bindings::unbound(tree.substitution_count());
    let mut pass = 0;

    loop {
        pass += 1;
        let mut bound = 0;
        let mut pending = 0;

        for (id, substitution) in tree.substitutions() {
            if bindings.target(id).is_some() {
                continue;
            }
            let segments = split_path(&substitution.path);
            match lookup(tree, &bindings, root, &segments)? {
                Some(target) => {
                    trace!(
                        path = %substitution.path,
                        target = target.index(),
                        "Bound substitution"
                    );
                    bindings.bind(id, target);
                    bound += 1;
                }
                None => pending += 1,
            }
        }

        trace!(pass, bound, pending, "Resolve pass finished");
        if pending == 0 || bound == 0 {
            break;
        }
    }

    for (id, substitution) in tree.substitutions() {
        if bindings.target(id).is_none() && !substitution.optional {
            return Err(ResolveError::Unresolved {
                path: substitution.path.clone(),
            });
        }
    }

    debug!(
        substitutions = tree.substitution_count(),
        passes = pass,
        "Resolved substitutions"
    );
    Ok(bindings)
}

/// Walks `segments` down from `from`, following substitutions to objects
///
/// Returns `None` when any segment is missing. A child made only of unbound
/// optional substitutions counts as missing.
pub(crate) fn lookup(
    tree: &Tree,
    bindings: &Bindings,
    from: NodeId,
    segments: &[String],
) -> Result<Option<NodeId>, ResolveError> {
    let mut current = from;
    for segment in segments {
        let Some(object) = object_of(tree, bindings, current)? else {
            return Ok(None);
        };
        match object.get(segment.as_str()) {
            Some(&child) if !is_absent(tree, bindings, child) => current = child,
            _ => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// The object a node stands for, following a leading substitution chain
pub(crate) fn object_of<'t>(
    tree: &'t Tree,
    bindings: &Bindings,
    node: NodeId,
) -> Result<Option<&'t HoconObject>, ResolveError> {
    object_node(tree, bindings, node)
        .map(|found| found.and_then(|id| tree.value(id).as_object()))
}

/// The node that directly holds the object a node stands for
pub(crate) fn object_node(
    tree: &Tree,
    bindings: &Bindings,
    node: NodeId,
) -> Result<Option<NodeId>, ResolveError> {
    let mut current = node;
    loop {
        match tree.value(current).elements().first() {
            Some(Element::Object(_)) => return Ok(Some(current)),
            Some(Element::Substitution(id)) => match bindings.target(*id) {
                Some(target) => {
                    check_cycle(tree, bindings, *id)?;
                    current = target;
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
    }
}

/// True for values that were never written, or that hold nothing but unbound
/// optional substitutions
pub(crate) fn is_absent(tree: &Tree, bindings: &Bindings, node: NodeId) -> bool {
    tree.value(node).elements().iter().all(|element| match element {
        Element::Substitution(id) => {
            tree.substitution(*id).optional && bindings.target(*id).is_none()
        }
        _ => false,
    })
}

/// Fails if following substitution `id` leads back into its own chain
pub(crate) fn check_cycle(
    tree: &Tree,
    bindings: &Bindings,
    id: SubstitutionId,
) -> Result<(), ResolveError> {
    let Some(target) = bindings.target(id) else {
        return Ok(());
    };
    let mut depths = HashMap::new();
    if revisits(tree, bindings, target, 1, &mut depths) {
        return Err(ResolveError::Cyclic {
            path: tree.substitution(id).path.clone(),
        });
    }
    Ok(())
}

fn revisits(
    tree: &Tree,
    bindings: &Bindings,
    node: NodeId,
    depth: usize,
    depths: &mut HashMap<NodeId, usize>,
) -> bool {
    if let Some(&seen) = depths.get(&node) {
        return seen != depth;
    }
    depths.insert(node, depth);

    let mut cyclic = false;
    for element in tree.value(node).elements() {
        if let Element::Substitution(next) = element {
            if let Some(target) = bindings.target(*next) {
                if revisits(tree, bindings, target, depth + 1, depths) {
                    cyclic = true;
                    break;
                }
            }
        }
    }

    depths.remove(&node);
    cyclic
}
