use crate::descriptor::TypeDescriptor;
use std::fmt::{self, Debug, Display, Write};

/// Writes `ConcurrentMap<KeyKind,ElemKind>{k1:v1 k2:v2}` with entries in
/// whatever order the iterator yields them, each one through `write_entry`.
pub(crate) fn entries<'a, K, V, I, W>(
    f: &mut fmt::Formatter<'_>,
    key_type: TypeDescriptor,
    elem_type: TypeDescriptor,
    entries: I,
    mut write_entry: W,
) -> fmt::Result
where
    K: ?Sized + 'a,
    V: ?Sized + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
    W: FnMut(&mut fmt::Formatter<'_>, &K, &V) -> fmt::Result,
{
    header(f, key_type, elem_type)?;
    f.write_char('{')?;
    let mut first = true;
    for (key, value) in entries {
        if !first {
            f.write_char(' ')?;
        }
        first = false;
        write_entry(f, key, value)?;
    }
    f.write_char('}')
}

/// `key:value` using `Display`, e.g. `a:1`.
pub(crate) fn display_entry<K, V>(f: &mut fmt::Formatter<'_>, key: &K, value: &V) -> fmt::Result
where
    K: Display + ?Sized,
    V: Display + ?Sized,
{
    write!(f, "{}:{}", key, value)
}

/// `key:value` using `Debug`, e.g. `"a":1`.
pub(crate) fn debug_entry<K, V>(f: &mut fmt::Formatter<'_>, key: &K, value: &V) -> fmt::Result
where
    K: Debug + ?Sized,
    V: Debug + ?Sized,
{
    write!(f, "{:?}:{:?}", key, value)
}

/// Rendering used when the table could not be read.
pub(crate) fn poisoned(
    f: &mut fmt::Formatter<'_>,
    key_type: TypeDescriptor,
    elem_type: TypeDescriptor,
) -> fmt::Result {
    header(f, key_type, elem_type)?;
    f.write_str("{<poisoned>}")
}

fn header(f: &mut fmt::Formatter<'_>, key_type: TypeDescriptor, elem_type: TypeDescriptor) -> fmt::Result {
    write!(f, "ConcurrentMap<{},{}>", key_type.kind(), elem_type.kind())
}
