use serde::Serialize;
use std::collections::BTreeMap;

/// Named run counters
///
/// Always carries [`Counters::PAGES`], [`Counters::SCANNED`] and [`Counters::MIGRATED`];
/// custom counters declared in the run configuration start at zero and are incremented by
/// the caller's callbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    values: BTreeMap<String, u64>,
}

impl Counters {
    /// Pages fully processed
    pub const PAGES: &'static str = "pages";
    /// Items read from the table
    pub const SCANNED: &'static str = "scanned";
    /// Items selected by the filter
    pub const MIGRATED: &'static str = "migrated";

    const BUILT_IN: [&'static str; 3] = [Self::PAGES, Self::SCANNED, Self::MIGRATED];

    /// Counters with the built-in keys and `custom` names set to zero
    pub fn new<S: AsRef<str>>(custom: &[S]) -> Self {
        let values = Self::BUILT_IN
            .iter()
            .map(|name| name.to_string())
            .chain(custom.iter().map(|name| name.as_ref().to_string()))
            .map(|name| (name, 0))
            .collect();

        Self { values }
    }

    /// Current value; undeclared counters read as zero
    pub fn get(&self, name: &str) -> u64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    /// Add one to `name`
    pub fn increment(&mut self, name: &str) {
        self.add(name, 1);
    }

    /// Add `amount` to `name`, declaring it if needed
    pub fn add(&mut self, name: &str, amount: u64) {
        *self.values.entry(name.to_string()).or_insert(0) += amount;
    }

    /// Pages fully processed
    pub fn pages(&self) -> u64 {
        self.get(Self::PAGES)
    }

    /// Items read from the table
    pub fn scanned(&self) -> u64 {
        self.get(Self::SCANNED)
    }

    /// Items selected for migration
    pub fn migrated(&self) -> u64 {
        self.get(Self::MIGRATED)
    }

    /// Items the filter rejected
    pub fn filtered_out(&self) -> u64 {
        self.scanned().saturating_sub(self.migrated())
    }

    /// All counters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Counters other than the built-in ones
    pub fn custom(&self) -> impl Iterator<Item = (&str, u64)> {
        self.iter()
            .filter(|(name, _)| !Self::BUILT_IN.iter().any(|built_in| built_in == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_declares_built_in_and_custom() {
        let counters = Counters::new(&["renamed"]);

        assert_eq!(counters.pages(), 0);
        assert_eq!(counters.scanned(), 0);
        assert_eq!(counters.migrated(), 0);
        assert_eq!(counters.custom().collect::<Vec<_>>(), vec![("renamed", 0)]);
        assert_eq!(counters.iter().count(), 4);
    }

    #[test]
    fn test_increment_and_add() {
        let mut counters = Counters::new::<&str>(&[]);
        counters.add(Counters::SCANNED, 25);
        counters.add(Counters::MIGRATED, 20);
        counters.increment(Counters::PAGES);
        counters.increment("skipped_invalid");

        assert_eq!(counters.pages(), 1);
        assert_eq!(counters.filtered_out(), 5);
        assert_eq!(counters.get("skipped_invalid"), 1);
        assert_eq!(counters.get("unknown"), 0);
    }
}
