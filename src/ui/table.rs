use crate::scope::ScopeSnapshot;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct ChainRow {
    #[tabled(rename = "Scope")]
    pub scope: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Depth")]
    pub depth: usize,
    #[tabled(rename = "Variables")]
    pub variables: String,
}

#[derive(Default)]
pub struct ChainTableBuilder {
    rows: Vec<ChainRow>,
}

impl ChainTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, scope: &str, kind: &str, depth: usize, variables: &[String]) {
        let variables = if variables.is_empty() {
            "-".to_string()
        } else {
            variables.join(", ")
        };
        self.rows.push(ChainRow {
            scope: scope.to_string(),
            kind: kind.to_string(),
            depth,
            variables,
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Render a snapshot innermost scope first
pub fn chain_table(snapshot: &ScopeSnapshot) -> String {
    let mut builder = ChainTableBuilder::new();
    for frame in &snapshot.frames {
        builder.add_row(
            &frame.id.to_string(),
            frame.kind.as_str(),
            frame.depth,
            &frame.variables,
        );
    }
    builder.build()
}
