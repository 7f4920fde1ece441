/// Tab-separated table: one header line, then one line per row.
#[derive(Debug, Clone)]
pub(crate) struct Tsv {
    out: String,
    width: usize,
}

impl Tsv {
    pub(crate) fn new(header: &[&str]) -> Self {
        let mut out = header.join("\t");
        out.push('\n');
        Self {
            out,
            width: header.len(),
        }
    }

    pub(crate) fn row(&mut self, cells: impl IntoIterator<Item = String>) {
        let cells: Vec<String> = cells.into_iter().collect();
        debug_assert_eq!(cells.len(), self.width, "row width must match header");
        // A tab or newline inside a cell would shift every later column.
        let cells: Vec<String> = cells
            .into_iter()
            .map(|c| c.replace(['\t', '\n', '\r'], " "))
            .collect();
        self.out.push_str(&cells.join("\t"));
        self.out.push('\n');
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}
