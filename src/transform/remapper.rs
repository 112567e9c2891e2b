//! Translation of names, descriptors and signatures between two namespaces
//!
//! Class names are a direct lookup. Members are resolved against the class
//! hierarchy: a mapping records a member only on its declaring class, so a
//! reference through a subtype walks `InheritancePath::to_check` until some
//! ancestor's mapping knows the member. Anything unmapped passes through.

use crate::archive::ArchiveReader;
use crate::classfile::defs::{CONSTRUCTOR_METHOD_NAME, STATIC_INITIALIZER_METHOD_NAME};
use crate::classfile::descriptor::parse_method_descriptor;
use crate::classfile::ClassFileError;
use crate::error::{Error, Result};
use crate::mapping::{ArchiveMapping, ClassMapping, FieldIdentifier, MethodIdentifier};

use super::inheritance::InheritanceTree;

pub struct NamespaceRemapper<'a> {
    mappings: &'a ArchiveMapping,
    from: String,
    to: String,
    tree: &'a InheritanceTree,
    reader: &'a dyn ArchiveReader,
}

impl<'a> NamespaceRemapper<'a> {
    pub fn new(
        mappings: &'a ArchiveMapping,
        from: impl Into<String>,
        to: impl Into<String>,
        tree: &'a InheritanceTree,
        reader: &'a dyn ArchiveReader,
    ) -> Self {
        Self { mappings, from: from.into(), to: to.into(), tree, reader }
    }

    pub fn from_namespace(&self) -> &str {
        &self.from
    }

    pub fn to_namespace(&self) -> &str {
        &self.to
    }

    pub fn mappings(&self) -> &'a ArchiveMapping {
        self.mappings
    }

    /// Internal name of `name` in the destination namespace. Classes without
    /// a mapping keep their name.
    pub fn map_class_name(&self, name: &str) -> Result<String> {
        let Some(class) = self.mappings.class_by_name(name, &self.from) else {
            return Ok(name.to_string());
        };
        class
            .identifier(&self.to)
            .map(|id| id.name.clone())
            .ok_or_else(|| Error::malformed_mapping(name, format!("no class name in namespace {}", self.to)))
    }

    /// Map the operand of a `CONSTANT_Class`: an internal name or an array descriptor
    pub fn map_type(&self, name: &str) -> Result<String> {
        if name.starts_with('[') {
            self.map_descriptor(name)
        } else {
            self.map_class_name(name)
        }
    }

    /// Map every class named in a field or method descriptor
    pub fn map_descriptor(&self, descriptor: &str) -> Result<String> {
        let mut mapped = String::with_capacity(descriptor.len());
        let mut rest = descriptor;
        while let Some(start) = rest.find('L') {
            mapped.push_str(&rest[..start]);
            let tail = &rest[start + 1..];
            let end = tail.find(';').ok_or_else(|| invalid_descriptor(descriptor))?;
            mapped.push('L');
            mapped.push_str(&self.map_class_name(&tail[..end])?);
            mapped.push(';');
            rest = &tail[end + 1..];
        }
        mapped.push_str(rest);
        Ok(mapped)
    }

    pub fn map_method_descriptor(&self, descriptor: &str) -> Result<String> {
        parse_method_descriptor(descriptor)?;
        self.map_descriptor(descriptor)
    }

    /// Destination name of method `name` referenced through `owner`
    pub fn map_method_name(&self, owner: &str, name: &str, descriptor: &str) -> Result<String> {
        if name == CONSTRUCTOR_METHOD_NAME || name == STATIC_INITIALIZER_METHOD_NAME || owner.starts_with('[') {
            return Ok(name.to_string());
        }
        let identifier = MethodIdentifier::from_descriptor(name, descriptor, &self.from)?;
        self.map_method_identifier(owner, &identifier)
    }

    /// Destination name of element `name` of the annotation interface `owner`.
    /// Annotation elements take no parameters.
    pub fn map_annotation_element(&self, owner: &str, name: &str) -> Result<String> {
        let identifier = MethodIdentifier::new(name, Vec::new(), self.from.as_str());
        self.map_method_identifier(owner, &identifier)
    }

    fn map_method_identifier(&self, owner: &str, identifier: &MethodIdentifier) -> Result<String> {
        let Some(method) = self.find_member(owner, |class| class.method(identifier)) else {
            return Ok(identifier.name.clone());
        };
        let malformed = |what: &str| {
            Error::malformed_mapping(
                format!("{}.{}", owner, identifier.name),
                format!("no {} in namespace {}", what, self.to),
            )
        };
        if method.return_type(&self.to).is_none() {
            return Err(malformed("return type"));
        }
        method.identifier(&self.to).map(|id| id.name.clone()).ok_or_else(|| malformed("method name"))
    }

    /// Destination name of field `name` referenced through `owner`. Fields are
    /// identified by name alone, so `_descriptor` does not take part.
    pub fn map_field_name(&self, owner: &str, name: &str, _descriptor: &str) -> Result<String> {
        let identifier = FieldIdentifier::new(name, self.from.as_str());
        let Some(field) = self.find_member(owner, |class| class.field(&identifier)) else {
            return Ok(name.to_string());
        };
        field.identifier(&self.to).map(|id| id.name.clone()).ok_or_else(|| {
            Error::malformed_mapping(format!("{}.{}", owner, name), format!("no field name in namespace {}", self.to))
        })
    }

    /// First hit of `lookup` over the class mappings along `owner`'s inheritance path
    fn find_member<T>(&self, owner: &str, lookup: impl FnMut(&'a ClassMapping) -> Option<T>) -> Option<T> {
        let detached;
        let path = match self.tree.path(owner) {
            Some(path) => path,
            None => {
                log::debug!("Resolving hierarchy of {} on demand", owner);
                detached = InheritanceTree::detached(owner, self.reader);
                detached.path(owner)?
            }
        };
        let mappings = self.mappings;
        let from = self.from.as_str();
        path.to_check()
            .into_iter()
            .filter_map(|name| mappings.class_by_name(name, from))
            .find_map(lookup)
    }

    /// Map the classes named in a generic signature of a class, method or field
    pub fn map_signature(&self, signature: &str) -> Result<String> {
        SignatureMapper { remapper: self, signature, pos: 0, mapped: String::with_capacity(signature.len()) }.map()
    }

    /// Simple name to record in `InnerClasses` for `name` after remapping
    pub fn map_inner_class_name(&self, name: &str, inner_name: &str) -> Result<String> {
        let mapped = self.map_class_name(name)?;
        if mapped == name {
            return Ok(inner_name.to_string());
        }
        if let (Some(split), Some(mapped_split)) = (name.rfind('/'), mapped.rfind('/')) {
            if name[split..] == mapped[mapped_split..] {
                return Ok(inner_name.to_string());
            }
        }
        match mapped.rfind('$') {
            Some(dollar) => {
                let simple = mapped[dollar + 1..].trim_start_matches(|c: char| c.is_ascii_digit());
                Ok(simple.to_string())
            }
            None => Ok(inner_name.to_string()),
        }
    }
}

fn invalid_descriptor(descriptor: &str) -> Error {
    ClassFileError::InvalidDescriptor { descriptor: descriptor.to_string() }.into()
}

/// Recursive descent over the signature grammar, copying everything except
/// class names, which are mapped
struct SignatureMapper<'r, 'a> {
    remapper: &'r NamespaceRemapper<'a>,
    signature: &'r str,
    pos: usize,
    mapped: String,
}

impl SignatureMapper<'_, '_> {
    fn map(mut self) -> Result<String> {
        if self.peek() == Some('<') {
            self.type_parameters()?;
        }
        if self.peek() == Some('(') {
            self.copy();
            while self.peek() != Some(')') {
                self.type_signature()?;
            }
            self.copy();
            self.type_signature()?;
            while self.peek() == Some('^') {
                self.copy();
                self.type_signature()?;
            }
        }
        // Class signatures list the superclass and interfaces back to back
        while self.peek().is_some() {
            self.type_signature()?;
        }
        Ok(self.mapped)
    }

    fn peek(&self) -> Option<char> {
        self.signature[self.pos..].chars().next()
    }

    fn copy(&mut self) {
        if let Some(c) = self.peek() {
            self.mapped.push(c);
            self.pos += c.len_utf8();
        }
    }

    fn expect_more(&self) -> Result<char> {
        self.peek().ok_or_else(|| invalid_descriptor(self.signature))
    }

    /// Identifier up to (not including) any of `stops`
    fn identifier(&mut self, stops: &[char]) -> Result<&str> {
        let rest = &self.signature[self.pos..];
        let end = rest.find(stops).ok_or_else(|| invalid_descriptor(self.signature))?;
        let start = self.pos;
        self.pos += end;
        Ok(&self.signature[start..start + end])
    }

    fn type_parameters(&mut self) -> Result<()> {
        self.copy();
        while self.expect_more()? != '>' {
            let name = self.identifier(&[':'])?.to_string();
            self.mapped.push_str(&name);
            while self.peek() == Some(':') {
                self.copy();
                // An empty class bound is followed directly by an interface bound
                if matches!(self.peek(), Some('L' | 'T' | '[')) {
                    self.type_signature()?;
                }
            }
        }
        self.copy();
        Ok(())
    }

    fn type_signature(&mut self) -> Result<()> {
        match self.expect_more()? {
            'L' => self.class_type(),
            'T' => {
                let variable = self.identifier(&[';'])?.to_string();
                self.mapped.push_str(&variable);
                self.copy();
                Ok(())
            }
            '[' => {
                self.copy();
                self.type_signature()
            }
            'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z' | 'V' => {
                self.copy();
                Ok(())
            }
            _ => Err(invalid_descriptor(self.signature)),
        }
    }

    fn class_type(&mut self) -> Result<()> {
        self.copy();
        let mut outer = self.identifier(&['<', '.', ';'])?.to_string();
        let mut mapped_outer = self.remapper.map_class_name(&outer)?;
        self.mapped.push_str(&mapped_outer);
        loop {
            match self.expect_more()? {
                '<' => self.type_arguments()?,
                '.' => {
                    self.copy();
                    let inner = self.identifier(&['<', '.', ';'])?.to_string();
                    let name = format!("{}${}", outer, inner);
                    let mapped = self.remapper.map_class_name(&name)?;
                    let prefix = format!("{}$", mapped_outer);
                    let simple = match mapped.strip_prefix(&prefix) {
                        Some(simple) => simple,
                        None => &mapped[mapped.rfind('/').map_or(0, |i| i + 1)..],
                    };
                    self.mapped.push_str(simple);
                    outer = name;
                    mapped_outer = mapped;
                }
                ';' => {
                    self.copy();
                    return Ok(());
                }
                _ => return Err(invalid_descriptor(self.signature)),
            }
        }
    }

    fn type_arguments(&mut self) -> Result<()> {
        self.copy();
        while self.expect_more()? != '>' {
            match self.expect_more()? {
                '*' => self.copy(),
                '+' | '-' => {
                    self.copy();
                    self.type_signature()?;
                }
                _ => self.type_signature()?,
            }
        }
        self.copy();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{class_entry_name, ArchiveReference, Entry};
    use crate::classfile::builder::ClassBuilder;
    use crate::mapping::{ClassMappingBuilder, FieldMappingBuilder, MethodMappingBuilder};

    fn class(name: &str, super_name: &str) -> Entry {
        Entry::new(class_entry_name(name), ClassBuilder::new(name, Some(super_name)).build().unwrap())
    }

    fn archive() -> ArchiveReference {
        let mut archive = ArchiveReference::new("test");
        archive.insert(class("a", "java/lang/Object"));
        archive.insert(class("b", "a"));
        archive.insert(class("c", "java/lang/Object"));
        archive.insert(class("c$d", "java/lang/Object"));
        archive
    }

    fn mappings() -> ArchiveMapping {
        ArchiveMapping::builder()
            .class(
                ClassMappingBuilder::new()
                    .name("obf", "a")
                    .name("named", "pkg/Base")
                    .method(MethodMappingBuilder::new().name("obf", "m", "(La;)V").name("named", "accept", "(Lpkg/Base;)V"))
                    .field(FieldMappingBuilder::new().name("obf", "f", "I").name("named", "count", "I")),
            )
            .class(ClassMappingBuilder::new().name("obf", "b").name("named", "pkg/Derived"))
            .class(ClassMappingBuilder::new().name("obf", "c").name("named", "pkg/Outer"))
            .class(ClassMappingBuilder::new().name("obf", "c$d").name("named", "pkg/Outer$Inner"))
            .class(ClassMappingBuilder::new().name("obf", "half"))
            .build()
            .unwrap()
    }

    fn with_remapper(test: impl FnOnce(&NamespaceRemapper<'_>)) {
        let archive = archive();
        let mappings = mappings();
        let tree = InheritanceTree::build(&archive, &archive);
        test(&NamespaceRemapper::new(&mappings, "obf", "named", &tree, &archive));
    }

    #[test]
    fn test_class_names() {
        with_remapper(|r| {
            assert_eq!(r.map_class_name("a").unwrap(), "pkg/Base");
            assert_eq!(r.map_class_name("java/lang/String").unwrap(), "java/lang/String");
            assert!(matches!(r.map_class_name("half"), Err(Error::MalformedMapping { .. })));
            assert_eq!(r.map_type("[[La;").unwrap(), "[[Lpkg/Base;");
        });
    }

    #[test]
    fn test_descriptors() {
        with_remapper(|r| {
            assert!(r.map_method_descriptor("(La;").is_err());
            assert_eq!(
                r.map_method_descriptor("(I[La;Ljava/lang/String;)Lb;").unwrap(),
                "(I[Lpkg/Base;Ljava/lang/String;)Lpkg/Derived;"
            );
            assert_eq!(r.map_descriptor("J").unwrap(), "J");
        });
    }

    #[test]
    fn test_inherited_members_resolve_at_declaring_class() {
        with_remapper(|r| {
            assert_eq!(r.map_method_name("a", "m", "(La;)V").unwrap(), "accept");
            assert_eq!(r.map_method_name("b", "m", "(La;)V").unwrap(), "accept");
            assert_eq!(r.map_field_name("b", "f", "I").unwrap(), "count");
            assert_eq!(r.map_method_name("b", "m", "(I)V").unwrap(), "m");
            assert_eq!(r.map_method_name("b", "<init>", "()V").unwrap(), "<init>");
            assert_eq!(r.map_method_name("[La;", "clone", "()Ljava/lang/Object;").unwrap(), "clone");
        });
    }

    #[test]
    fn test_owner_outside_tree_resolves_on_demand() {
        let archive = archive();
        let mappings = mappings();
        let tree = InheritanceTree::new();
        let remapper = NamespaceRemapper::new(&mappings, "obf", "named", &tree, &archive);
        assert_eq!(remapper.map_method_name("b", "m", "(La;)V").unwrap(), "accept");
    }

    #[test]
    fn test_signatures() {
        with_remapper(|r| {
            assert_eq!(
                r.map_signature("<T:La;>Ljava/lang/Object;Ljava/util/List<+Lb;>;").unwrap(),
                "<T:Lpkg/Base;>Ljava/lang/Object;Ljava/util/List<+Lpkg/Derived;>;"
            );
            assert_eq!(
                r.map_signature("<K::Ljava/lang/Comparable<TK;>;>(TK;[La;)Lc<*>.d;^Lb;").unwrap(),
                "<K::Ljava/lang/Comparable<TK;>;>(TK;[Lpkg/Base;)Lpkg/Outer<*>.Inner;^Lpkg/Derived;"
            );
            assert_eq!(r.map_signature("TT;").unwrap(), "TT;");
            assert!(r.map_signature("Ljava/util/List<La;").is_err());
        });
    }

    #[test]
    fn test_inner_class_names() {
        with_remapper(|r| {
            assert_eq!(r.map_inner_class_name("c$d", "d").unwrap(), "Inner");
            assert_eq!(r.map_inner_class_name("x/Y$Z", "Z").unwrap(), "Z");
        });
    }
}
