use crate::descriptor::TypeDescriptor;
use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// A type-erased element that remembers its runtime type
///
/// Implemented for every `T: Any + Clone + Debug + Send + Sync`; there is no
/// need to implement it by hand.
pub trait DynValue: Any + Debug + Send + Sync {
    /// Borrow the value as `&dyn Any` for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Convert the boxed value into `Box<dyn Any>` for downcasting by value
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    /// The descriptor of the concrete type
    fn descriptor(&self) -> TypeDescriptor;

    /// Clone the value into a new box
    fn clone_value(&self) -> Box<dyn DynValue>;
}

impl<T> DynValue for T
where
    T: Any + Clone + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn clone_value(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }
}

/// A type-erased key that can be hashed and compared against keys of any type
///
/// Implemented for every `T: Any + Eq + Hash + Clone + Debug + Send + Sync`.
/// Keys of different concrete types never compare equal.
pub trait DynKey: DynValue {
    /// Equality against another erased key
    fn dyn_eq(&self, other: &dyn DynKey) -> bool;

    /// Feed the key, tagged with its type, into `state`
    fn dyn_hash(&self, state: &mut dyn Hasher);

    /// Clone the key into a new box
    fn clone_key(&self) -> Box<dyn DynKey>;
}

impl<T> DynKey for T
where
    T: Any + Eq + Hash + Clone + Debug + Send + Sync,
{
    fn dyn_eq(&self, other: &dyn DynKey) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }

    fn clone_key(&self) -> Box<dyn DynKey> {
        Box::new(self.clone())
    }
}

impl PartialEq for dyn DynKey {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

impl Eq for dyn DynKey {}

impl Hash for dyn DynKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dyn_hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(key: &dyn DynKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_keys_compare_by_type_and_value() {
        let a: Box<dyn DynKey> = Box::new("a".to_string());
        let also_a: Box<dyn DynKey> = Box::new("a".to_string());
        let b: Box<dyn DynKey> = Box::new("b".to_string());
        let str_a: Box<dyn DynKey> = Box::new("a");

        assert!(*a == *also_a);
        assert!(*a != *b);
        assert!(*a != *str_a);
        assert_eq!(hash_of(&*a), hash_of(&*also_a));
    }

    #[test]
    fn test_numeric_keys_of_different_width_differ() {
        let small: Box<dyn DynKey> = Box::new(1u8);
        let wide: Box<dyn DynKey> = Box::new(1u64);
        assert!(*small != *wide);
    }

    #[test]
    fn test_value_descriptor_and_downcast() {
        let value: Box<dyn DynValue> = Box::new(vec![1, 2, 3]);
        assert!((*value).descriptor().is::<Vec<i32>>());
        assert_eq!((*value).as_any().downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));

        let copy = (*value).clone_value();
        let owned = copy.into_any().downcast::<Vec<i32>>().map(|b| *b);
        assert_eq!(owned.ok(), Some(vec![1, 2, 3]));
    }
}
