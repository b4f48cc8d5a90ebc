//! Pluggable backend shape for a query-builder framework.
//!
//! A dialect bundles the driver with the SQL grammar and the schema
//! introspection strategy of the relational engine behind the service.
//! It holds no state of its own and passes driver errors through untouched.

mod compiler;
mod introspection;

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::drivers::DataApiDriver;
use crate::traits::Driver;

pub use self::compiler::{MysqlCompiler, PostgresCompiler, QueryCompiler};
pub use self::introspection::{
    ColumnInfo, Introspector, MysqlIntrospector, PostgresIntrospector, TableMetadata,
};

/// Relational engine behind the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    #[default]
    Postgres,
    Mysql,
}

/// Trait for dialect implementations: what a framework plugs in as a backend.
pub trait Dialect: Send + Sync {
    type Driver: Driver;

    fn driver(&self) -> Arc<Self::Driver>;

    fn compiler(&self) -> Arc<dyn QueryCompiler>;

    fn introspector(&self) -> Arc<dyn Introspector>;
}

/// Dialect for the SQL execution service.
#[derive(Debug, Clone)]
pub struct DataApiDialect {
    driver: Arc<DataApiDriver>,
    compiler: Arc<dyn QueryCompiler>,
    introspector: Arc<dyn Introspector>,
}

impl DataApiDialect {
    /// Build a dialect (and its driver) for the given engine.
    pub fn new(config: ServiceConfig, engine: Engine) -> Self {
        Self::with_driver(Arc::new(DataApiDriver::new(config)), engine)
    }

    pub fn with_driver(driver: Arc<DataApiDriver>, engine: Engine) -> Self {
        let (compiler, introspector): (Arc<dyn QueryCompiler>, Arc<dyn Introspector>) =
            match engine {
                Engine::Postgres => (Arc::new(PostgresCompiler), Arc::new(PostgresIntrospector)),
                Engine::Mysql => (Arc::new(MysqlCompiler), Arc::new(MysqlIntrospector)),
            };
        Self {
            driver,
            compiler,
            introspector,
        }
    }

    pub fn engine(&self) -> Engine {
        self.compiler.engine()
    }
}

impl Dialect for DataApiDialect {
    type Driver = DataApiDriver;

    fn driver(&self) -> Arc<DataApiDriver> {
        Arc::clone(&self.driver)
    }

    fn compiler(&self) -> Arc<dyn QueryCompiler> {
        Arc::clone(&self.compiler)
    }

    fn introspector(&self) -> Arc<dyn Introspector> {
        Arc::clone(&self.introspector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{DataApiService, InMemoryDataApiService};

    fn config() -> ServiceConfig {
        let client: Arc<dyn DataApiService> = Arc::new(InMemoryDataApiService::new());
        ServiceConfig::builder()
            .client(client)
            .database("scratch")
            .secret_arn("arn:secret")
            .resource_arn("arn:cluster")
            .build()
            .unwrap()
    }

    #[test]
    fn test_engine_selects_grammar() {
        let pg = DataApiDialect::new(config(), Engine::Postgres);
        assert_eq!(pg.engine(), Engine::Postgres);
        assert_eq!(pg.compiler().quote_identifier("person"), "\"person\"");

        let my = DataApiDialect::new(config(), Engine::Mysql);
        assert_eq!(my.engine(), Engine::Mysql);
        assert!(!my.compiler().supports_returning());
    }

    #[test]
    fn test_dialect_shares_one_driver() {
        let dialect = DataApiDialect::new(config(), Engine::Postgres);
        assert!(Arc::ptr_eq(&dialect.driver(), &dialect.driver()));
    }
}
