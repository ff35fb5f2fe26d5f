use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of a key or element type
///
/// A descriptor pairs the `TypeId` used for comparisons with the type's name,
/// which is only used for rendering. Two descriptors are equal when they
/// describe the same type.
///
/// # Examples
///
/// ```
/// use sovran_concurrent_map::TypeDescriptor;
///
/// let desc = TypeDescriptor::of::<Vec<String>>();
/// assert_eq!(desc.kind(), "Vec<String>");
/// assert_eq!(desc, TypeDescriptor::of::<Vec<String>>());
/// assert_ne!(desc, TypeDescriptor::of::<Vec<i32>>());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Creates the descriptor for `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The `TypeId` this descriptor compares by
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name, e.g. `alloc::string::String`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name with every module path removed, e.g. `String`
    pub fn kind(&self) -> String {
        strip_paths(self.name)
    }

    /// Returns true if this descriptor describes `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind())
    }
}

// Drops every `path::` prefix, including ones nested inside generic arguments.
fn strip_paths(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
        } else {
            out.push(c);
            if !(c.is_alphanumeric() || c == '_') {
                segment_start = out.len();
            }
        }
    }
    out
}
