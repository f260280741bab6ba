//! The [`UniqueNames`] type, which hands out unique names by appending
//! an occurrence counter to repeated names.
//!
//! This is used to disambiguate tracks that share a file basename (which would
//! otherwise collide when staged into one directory), and track identifiers in
//! a rendered trackDb.

use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, Default)]
pub struct UniqueNames {
    occurrences: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `name` the first time it is seen, then `name_1`, `name_2`, ...
    pub fn unique(&mut self, name: &str) -> String {
        self.unique_with(name, |n| format!("{}_{}", name, n))
    }

    /// Like [`UniqueNames::unique`], but the counter is inserted before the
    /// file extension: `sample.bigWig`, `sample_1.bigWig`, ...
    pub fn unique_file_name(&mut self, file_name: &str) -> String {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.unique_with(file_name, |n| format!("{}_{}.{}", stem, n, ext))
            }
            _ => self.unique(file_name),
        }
    }

    fn unique_with<F>(&mut self, name: &str, numbered: F) -> String
    where
        F: Fn(usize) -> String,
    {
        let count = self.occurrences.entry(name.to_string()).or_insert(0);
        let mut candidate = if *count == 0 {
            name.to_string()
        } else {
            numbered(*count)
        };
        // skip over numbered names that were issued literally
        while self.issued.contains(&candidate) {
            *count += 1;
            candidate = numbered(*count);
        }
        *count += 1;
        self.issued.insert(candidate.clone());
        candidate
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.issued.contains(name)
    }
}
