use serde::Serialize;

/// One bar of a stats chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatEntry {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub keywords: Vec<StatEntry>,
    pub sources: Vec<StatEntry>,
}

fn entries(pairs: &[(&str, u32)]) -> Vec<StatEntry> {
    pairs
        .iter()
        .map(|(name, value)| StatEntry {
            name: name.to_string(),
            value: *value,
        })
        .collect()
}

// Placeholder figures. Keyword extraction and per-source counting are not
// implemented; the dashboard only needs a stable shape.
pub fn top_keywords() -> Vec<StatEntry> {
    entries(&[
        ("Technology", 35),
        ("Business", 25),
        ("Politics", 20),
        ("Health", 15),
        ("Sports", 5),
    ])
}

pub fn top_sources() -> Vec<StatEntry> {
    entries(&[
        ("Tech News", 30),
        ("Business Daily", 25),
        ("World Report", 20),
        ("Health Journal", 15),
        ("Sports Center", 10),
    ])
}

pub fn stats() -> Stats {
    Stats {
        keywords: top_keywords(),
        sources: top_sources(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_lists_are_sorted_descending() {
        for list in [top_keywords(), top_sources()] {
            assert_eq!(list.len(), 5);
            assert!(list.windows(2).all(|w| w[0].value >= w[1].value));
        }
    }
}
