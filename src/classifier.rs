use std::collections::HashSet;

/// Derived table an event kind is projected into, besides the generic events table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecializedKind {
    None,
    Offer,
    Trade,
    Swap,
}

impl SpecializedKind {
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "created" => SpecializedKind::Offer,
            "filled" => SpecializedKind::Trade,
            "swapCreated" => SpecializedKind::Swap,
            _ => SpecializedKind::None,
        }
    }

    /// Minimum payload length the projection reads.
    pub fn required_fields(&self) -> usize {
        match self {
            SpecializedKind::None => 0,
            SpecializedKind::Offer => 6,
            SpecializedKind::Trade => 7,
            SpecializedKind::Swap => 8,
        }
    }

    pub fn table(&self) -> Option<&'static str> {
        match self {
            SpecializedKind::None => None,
            SpecializedKind::Offer => Some("offers"),
            SpecializedKind::Trade => Some("trades"),
            SpecializedKind::Swap => Some("swaps"),
        }
    }
}

/// Strip the `0x` display prefix and lowercase, so hashes compare and store uniformly.
pub fn normalize_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Gate on the emitting contract and pick the specialized schema for an event.
#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    allow_list: HashSet<String>,
}

impl EventClassifier {
    pub fn new<I, S>(contract_hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allow_list: contract_hashes
                .into_iter()
                .map(|h| normalize_hash(h.as_ref()))
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Checked before any decoding work is done.
    pub fn is_in_scope(&self, script_hash: &str) -> bool {
        self.allow_list.contains(&normalize_hash(script_hash))
    }

    pub fn classify(&self, event_type: &str) -> SpecializedKind {
        SpecializedKind::from_event_type(event_type)
    }

    pub fn len(&self) -> usize {
        self.allow_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allow_list.is_empty()
    }
}
