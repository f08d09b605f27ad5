use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CtyError, ErrorKind};
use crate::text::nfc;
use crate::types::Type;

/// Attribute schema of an object type. Attribute names are NFC-normalized
/// and kept in sorted order, which is also the wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectType {
    attributes: BTreeMap<String, Type>,
    optional: BTreeSet<String>,
}

impl ObjectType {
    pub fn new<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Type)>,
        K: AsRef<str>,
    {
        ObjectType {
            attributes: attributes
                .into_iter()
                .map(|(k, t)| (nfc(k.as_ref()), t))
                .collect(),
            optional: BTreeSet::new(),
        }
    }

    /// Mark attributes as optional. Every name must already be declared.
    pub fn with_optional<I, K>(mut self, names: I) -> Result<Self, CtyError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for name in names {
            let name = nfc(name.as_ref());
            if !self.attributes.contains_key(&name) {
                return Err(CtyError::new(
                    ErrorKind::AttributeValidation,
                    format!("Optional attribute '{}' is not declared", name),
                ));
            }
            self.optional.insert(name);
        }
        Ok(self)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Type> {
        &self.attributes
    }

    pub fn optional_attributes(&self) -> &BTreeSet<String> {
        &self.optional
    }

    pub fn attribute_type(&self, name: &str) -> Option<&Type> {
        match self.attributes.get(name) {
            Some(t) => Some(t),
            None => self.attributes.get(&nfc(name)),
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_type(name).is_some()
    }

    pub fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(name) || self.optional.contains(&nfc(name))
    }

    /// `self` is usable where `other` is expected when every attribute of
    /// `other` is either present here with a usable type, or optional there.
    pub fn usable_as(&self, other: &ObjectType) -> bool {
        other.attributes.iter().all(|(name, want)| match self.attributes.get(name) {
            Some(have) => have.usable_as(want),
            None => other.optional.contains(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        let obj = ObjectType::new([("caf\u{0065}\u{0301}", Type::String)]);
        assert!(obj.has_attribute("caf\u{00e9}"));
        assert!(obj.has_attribute("cafe\u{0301}"));
    }

    #[test]
    fn optional_must_be_declared() {
        let obj = ObjectType::new([("name", Type::String)]);
        let err = obj.with_optional(["age"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeValidation);
    }

    #[test]
    fn superset_usable_as_subset() {
        let wide = ObjectType::new([("name", Type::String), ("age", Type::Number)]);
        let narrow = ObjectType::new([("name", Type::String)]);
        assert!(wide.usable_as(&narrow));
        assert!(!narrow.usable_as(&wide));

        let narrow_opt = ObjectType::new([("name", Type::String), ("age", Type::Number)])
            .with_optional(["age"])
            .unwrap();
        assert!(narrow.usable_as(&narrow_opt));
    }
}
