use std::collections::BTreeMap;

/// Lifestyle keywords mapped to the phrases that contradict them
///
/// Keys are matched against single query words; opposites are matched as
/// substrings of a host's vibe text, so multi-word opposites such as
/// "night owl" work on the candidate side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl ConflictTable {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Build a table from `(keyword, opposites)` pairs; keywords are lowercased
    pub fn from_pairs<K, I, O>(pairs: I) -> Self
    where
        K: AsRef<str>,
        O: AsRef<str>,
        I: IntoIterator<Item = (K, Vec<O>)>,
    {
        let entries = pairs
            .into_iter()
            .map(|(key, opposites)| {
                (
                    key.as_ref().to_lowercase(),
                    opposites.iter().map(|o| o.as_ref().to_lowercase()).collect(),
                )
            })
            .collect();

        Self { entries }
    }

    /// Opposites listed for `word`, in table order
    #[inline]
    pub fn opposites(&self, word: &str) -> Option<&[String]> {
        self.entries.get(word).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConflictTable {
    /// The campus lifestyle table
    fn default() -> Self {
        Self::from_pairs([
            ("quiet", vec!["loud", "noisy", "party", "social", "night owl", "late night"]),
            ("loud", vec!["quiet", "silent", "peaceful", "calm", "early", "early bedtime"]),
            ("early", vec!["late", "night owl", "late night", "night"]),
            ("late", vec!["early", "early riser", "early bedtime", "morning"]),
            ("study", vec!["party", "social", "loud", "noisy"]),
            ("party", vec!["quiet", "study", "peaceful", "calm"]),
            ("social", vec!["quiet", "study", "solitary", "peaceful"]),
            ("night owl", vec!["early", "early riser", "early bedtime", "morning"]),
            ("peaceful", vec!["loud", "noisy", "party", "social"]),
        ])
    }
}
