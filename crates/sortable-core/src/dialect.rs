//! SQL dialect differences that matter for generated statements.

/// SQL dialect of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `$1` placeholders, `"ident"` quoting
    #[default]
    Postgres,
    /// `?1` placeholders, `"ident"` quoting
    Sqlite,
    /// `?` placeholders, `` `ident` `` quoting
    MySql,
}

impl Dialect {
    /// Render the placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::MySql => "?".to_string(),
        }
    }

    /// Quote an identifier, escaping embedded quote characters.
    pub fn quote_ident(self, ident: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => {
                format!("\"{}\"", ident.replace('"', "\"\""))
            }
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }
}
