//! Class hierarchy hook consulted by the encoder during frame computation

use std::collections::HashSet;

use super::defs::OBJECT_CLASS;
use super::error::{FrameError, FrameResult};
use crate::consts::MAX_HIERARCHY_DEPTH;

/// Superclass and interfaces of one class, as seen by the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNode {
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
}

impl HierarchyNode {
    pub fn new(name: impl Into<String>, super_name: Option<String>) -> Self {
        Self { name: name.into(), super_name, interfaces: Vec::new(), is_interface: false }
    }
}

/// Supplies hierarchy facts to `ClassWriter`. Only `load_type` is required;
/// the common-superclass search is derived from it.
pub trait TypeLoader: Sync {
    fn load_type(&self, name: &str) -> Option<HierarchyNode>;

    /// Whether a value of type `source` can be stored in a `target` slot
    fn is_assignable(&self, target: &str, source: &str) -> bool {
        if target == source || target == OBJECT_CLASS {
            return true;
        }
        let mut seen = HashSet::new();
        let mut pending = vec![(source.to_string(), 0usize)];
        while let Some((name, depth)) = pending.pop() {
            if name == target {
                return true;
            }
            if depth >= MAX_HIERARCHY_DEPTH || !seen.insert(name.clone()) {
                continue;
            }
            if let Some(node) = self.load_type(&name) {
                pending.extend(node.super_name.into_iter().map(|s| (s, depth + 1)));
                pending.extend(node.interfaces.into_iter().map(|i| (i, depth + 1)));
            }
        }
        false
    }

    /// Superclass chain of `name`, from `name` itself up to `java/lang/Object`.
    /// Fails on the first class the loader cannot supply.
    fn superclass_chain(&self, name: &str) -> FrameResult<Vec<String>> {
        let mut chain = Vec::new();
        let mut current = name.to_string();
        while current != OBJECT_CLASS {
            if chain.len() >= MAX_HIERARCHY_DEPTH || chain.contains(&current) {
                return Err(FrameError::UnknownType { name: current });
            }
            let node = self
                .load_type(&current)
                .ok_or_else(|| FrameError::UnknownType { name: current.clone() })?;
            chain.push(current);
            current = node.super_name.unwrap_or_else(|| OBJECT_CLASS.to_string());
        }
        chain.push(current);
        Ok(chain)
    }

    /// Nearest common superclass of two class types. A merge involving an
    /// interface is `java/lang/Object`; a type the loader cannot supply is
    /// an error, since guessing its ancestry would produce invalid frames.
    fn common_super_class(&self, a: &str, b: &str) -> FrameResult<String> {
        if a == b {
            return Ok(a.to_string());
        }
        if a == OBJECT_CLASS || b == OBJECT_CLASS {
            return Ok(OBJECT_CLASS.to_string());
        }
        let unknown = |name: &str| FrameError::UnknownType { name: name.to_string() };
        let node_a = self.load_type(a).ok_or_else(|| unknown(a))?;
        let node_b = self.load_type(b).ok_or_else(|| unknown(b))?;
        if node_a.is_interface || node_b.is_interface {
            if node_a.is_interface && self.is_assignable(a, b) {
                return Ok(a.to_string());
            }
            if node_b.is_interface && self.is_assignable(b, a) {
                return Ok(b.to_string());
            }
            return Ok(OBJECT_CLASS.to_string());
        }
        let chain_b = self.superclass_chain(b)?;
        let common = self
            .superclass_chain(a)?
            .into_iter()
            .find(|name| chain_b.contains(name))
            .unwrap_or_else(|| OBJECT_CLASS.to_string());
        Ok(common)
    }
}
