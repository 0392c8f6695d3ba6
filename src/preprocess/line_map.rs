//! Attribution of output lines to their source file and line.

/// Where one emitted line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRecord {
    /// Index into [`LineMap::file_names`]
    pub file_index: usize,
    /// Physical line in that file
    pub line: usize,
}

/// Append-only map from output line numbers to source locations.
///
/// One record is appended per emitted line, shared across every file
/// included by one top-level compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    file_names: Vec<String>,
    records: Vec<LineRecord>,
}

impl LineMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source file, returning its index. Known names are reused.
    pub fn add_file(&mut self, name: &str) -> usize {
        if let Some(index) = self.file_names.iter().position(|n| n == name) {
            return index;
        }
        self.file_names.push(name.to_string());
        self.file_names.len() - 1
    }

    /// Records the origin of the next emitted line.
    pub fn push(&mut self, file_index: usize, line: usize) {
        self.records.push(LineRecord { file_index, line });
    }

    /// Registered file names, in registration order.
    #[must_use]
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// All records, in output order.
    #[must_use]
    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    /// Number of emitted lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Source file and line of 1-based output line `output_line`.
    #[must_use]
    pub fn locate(&self, output_line: usize) -> Option<(&str, usize)> {
        let record = self.records.get(output_line.checked_sub(1)?)?;
        let name = self.file_names.get(record.file_index)?;
        Some((name.as_str(), record.line))
    }
}
