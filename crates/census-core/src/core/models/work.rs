use std::io::BufRead;

/// A single unit of census work: one structure domain to self-align.
///
/// The index is the item's position in the supplied list and is what keeps result
/// ordering deterministic when items complete out of order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    index: usize,
    id: String,
}

impl WorkItem {
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Builds work items from identifiers, numbering them in the order given.
pub fn enumerate_items<I, S>(ids: I) -> Vec<WorkItem>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter()
        .enumerate()
        .map(|(index, id)| WorkItem::new(index, id))
        .collect()
}

/// Reads domain identifiers, one per line.
///
/// Surrounding whitespace is trimmed; blank lines and lines starting with `#` are ignored.
/// Only the first whitespace-separated field of a line is used, so annotated lists
/// (`d1a0pa_  some comment`) are accepted.
pub fn read_identifiers(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(id) = trimmed.split_whitespace().next() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}
