use crate::error::Result;
use crate::service::wire::SqlParameter;
use crate::types::marshal::to_wire;
use crate::types::SqlValue;

/// A finished SQL statement and its parameters, as handed to a driver.
///
/// Placeholders use the service's named style (`:name`). Parameters are
/// kept in bind order; positional binds are named by their index, so
/// `:0`, `:1`, ... match the first, second, ... bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<(String, SqlValue)>,
}

impl CompiledQuery {
    /// A query whose values bind to `:0`, `:1`, ... in order.
    pub fn new(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        let parameters = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| (i.to_string(), value))
            .collect();
        Self {
            sql: sql.into(),
            parameters,
        }
    }

    /// A query without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    /// Bind the next positional value.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        let name = self.parameters.len().to_string();
        self.parameters.push((name, value.into()));
        self
    }

    /// Bind a value to the `:name` placeholder.
    pub fn bind_named(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Marshal the parameters into wire form, preserving order.
    pub fn wire_parameters(&self) -> Result<Vec<SqlParameter>> {
        self.parameters
            .iter()
            .map(|(name, value)| to_wire(name.as_str(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::wire::Field;

    #[test]
    fn test_positional_binds_are_indexed() {
        let query = CompiledQuery::raw("SELECT :0, :1").bind("Ada").bind(36);
        assert_eq!(
            query.parameters,
            vec![
                ("0".to_string(), SqlValue::Text("Ada".into())),
                ("1".to_string(), SqlValue::Int(36)),
            ]
        );
    }

    #[test]
    fn test_named_binds_marshal_in_order() {
        let query = CompiledQuery::raw("INSERT INTO person (first_name) VALUES (:name)")
            .bind_named("name", "Ada");
        let params = query.wire_parameters().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "name");
        assert_eq!(params[0].value, Field::StringValue("Ada".into()));
    }
}
