use crate::dialect::Engine;

/// SQL grammar details the builders need to produce text the engine accepts.
///
/// Placeholders use the service's named style in both grammars: the n-th
/// bound value is written `:n` and sent as the parameter named `n`.
pub trait QueryCompiler: Send + Sync + std::fmt::Debug {
    fn engine(&self) -> Engine;

    /// Quote a single identifier, escaping the quote character.
    fn quote_part(&self, ident: &str) -> String;

    /// Quote a possibly qualified identifier (`schema.table`, `table.column`).
    /// `*` is left as is.
    fn quote_identifier(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    self.quote_part(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder text for the value bound at `index`.
    fn placeholder(&self, index: usize) -> String {
        format!(":{}", self.parameter_name(index))
    }

    /// Parameter name for the value bound at `index`.
    fn parameter_name(&self, index: usize) -> String {
        index.to_string()
    }

    /// Whether `INSERT ... RETURNING` is available.
    fn supports_returning(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCompiler;

impl QueryCompiler for PostgresCompiler {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn quote_part(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlCompiler;

impl QueryCompiler for MysqlCompiler {
    fn engine(&self) -> Engine {
        Engine::Mysql
    }

    fn quote_part(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn supports_returning(&self) -> bool {
        false
    }
}
