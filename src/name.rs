use std::collections::HashSet;

/// Types that expose a comparable name.
pub trait HasName {
    fn get_name(&self) -> &str;
}

impl<T: HasName + ?Sized> HasName for &T {
    fn get_name(&self) -> &str {
        (*self).get_name()
    }
}

/// Name-based helpers for slices of `T: HasName`.
pub trait NameLookup<T> {
    /// Returns the first item with the given name.
    fn find_by_name(&self, name: &str) -> Option<&T>;

    /// Returns the first name that appears more than once.
    fn duplicate_name(&self) -> Option<&str>;
}

impl<T: HasName> NameLookup<T> for [T] {
    fn find_by_name(&self, name: &str) -> Option<&T> {
        self.iter().find(|item| item.get_name() == name)
    }

    fn duplicate_name(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.iter()
            .map(|item| item.get_name())
            .find(|name| !seen.insert(*name))
    }
}
