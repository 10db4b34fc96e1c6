//! Type identity used to key a node's children.

use std::any::{self, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Opaque per-type identity of a node type.
///
/// Equality and hashing only look at the `TypeId`; the type name is carried
/// along for logs, errors and tree rendering.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name, e.g. `nodecomp::samples::Value`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (generic arguments are kept).
    pub fn short_name(&self) -> &'static str {
        let head = self.name.split('<').next().unwrap_or(self.name);
        match head.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Alpha;
    struct Beta;
    struct Wrapper<T>(T);

    #[test]
    fn given_same_type_when_keyed_twice_then_keys_are_equal() {
        assert_eq!(TypeKey::of::<Alpha>(), TypeKey::of::<Alpha>());
        assert_ne!(TypeKey::of::<Alpha>(), TypeKey::of::<Beta>());

        let keys: HashSet<TypeKey> = [TypeKey::of::<Alpha>(), TypeKey::of::<Alpha>()]
            .into_iter()
            .collect();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn given_module_path_when_short_name_then_strips_path() {
        assert_eq!(TypeKey::of::<Alpha>().short_name(), "Alpha");
        assert!(TypeKey::of::<Alpha>().name().ends_with("::Alpha"));
        assert_eq!(TypeKey::of::<u32>().short_name(), "u32");
    }

    #[test]
    fn given_generic_type_when_short_name_then_keeps_arguments() {
        let key = TypeKey::of::<Wrapper<Alpha>>();
        assert!(key.short_name().starts_with("Wrapper<"));
        assert_ne!(key, TypeKey::of::<Wrapper<Beta>>());
    }
}
