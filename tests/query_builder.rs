use std::sync::Arc;

use data_api::error::DataApiError;
use data_api::service::{
    DataApiService, Field, InMemoryDataApiService, InMemoryResponseBuilder, SqlParameter,
};
use data_api::types::SqlValue;
use data_api::{Client, Engine, ServiceConfig, WhereClause};

fn client_with(service: &Arc<InMemoryDataApiService>, engine: Engine) -> Client {
    let service: Arc<dyn DataApiService> = Arc::clone(service) as Arc<dyn DataApiService>;
    let config = ServiceConfig::builder()
        .client(service)
        .database("scratch")
        .secret_arn("arn:aws:secretsmanager:us-east-1:123456789012:secret:scratch")
        .resource_arn("arn:aws:rds:us-east-1:123456789012:cluster:scratch")
        .build()
        .unwrap();
    Client::from_config(config, engine)
}

fn text(name: &str, value: &str) -> SqlParameter {
    SqlParameter {
        name: name.to_string(),
        value: Field::StringValue(value.to_string()),
        type_hint: None,
    }
}

#[tokio::test]
async fn test_simple_select_single_column() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("id", "serial")
                .row(vec![Field::LongValue(1)])
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Postgres);

    let result = client
        .querier()
        .select()
        .columns(&["person.id"])
        .from("person")
        .execute()
        .await
        .unwrap();

    // Verify the statement that was sent
    service.assert_last_statement("SELECT \"person\".\"id\" FROM \"person\"", &[]);
    service.assert_statement_count(1);

    // Verify the result
    let row = result.single_row().unwrap();
    assert_eq!(row.get("id").unwrap(), &SqlValue::Int(1));
}

#[tokio::test]
async fn test_select_with_where_and_limit() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("id", "serial")
                .column("first_name", "varchar")
                .row(vec![Field::LongValue(1), Field::StringValue("John".into())])
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Postgres);

    let row = client
        .querier()
        .select()
        .columns(&["id", "first_name"])
        .from("person")
        .where_(WhereClause::eq("first_name", "John"))
        .limit(1)
        .execute()
        .await
        .unwrap()
        .single_row()
        .unwrap();

    service.assert_last_statement(
        "SELECT \"id\", \"first_name\" FROM \"person\" WHERE \"first_name\" = :0 LIMIT 1",
        &[text("0", "John")],
    );
    assert_eq!(row.get_as::<String>("first_name").unwrap(), "John");
}

#[tokio::test]
async fn test_select_multiple_rows_with_nulls() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("name", "varchar")
                .column("species", "varchar")
                .row(vec![Field::StringValue("Rex".into()), Field::null()])
                .row(vec![
                    Field::StringValue("Tom".into()),
                    Field::StringValue("cat".into()),
                ])
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Postgres);

    let rows = client
        .querier()
        .select()
        .columns(&["name", "species"])
        .from("pet")
        .execute()
        .await
        .unwrap()
        .rows();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_as::<Option<String>>("species").unwrap(), None);
    assert_eq!(
        rows[1].get_as::<Option<String>>("species").unwrap(),
        Some("cat".to_string())
    );
}

#[tokio::test]
async fn test_single_row_rejects_many() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("id", "int4")
                .row(vec![Field::LongValue(1)])
                .row(vec![Field::LongValue(2)])
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Postgres);

    let err = client
        .querier()
        .select()
        .columns(&["id"])
        .from("person")
        .execute()
        .await
        .unwrap()
        .single_row()
        .unwrap_err();

    assert!(matches!(
        err,
        DataApiError::UnexpectedRowCount {
            expected: 1,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_insert_returning_generated_id() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("id", "serial")
                .row(vec![Field::LongValue(42)])
                .updated(1)
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Postgres);

    let result = client
        .querier()
        .insert_into("person")
        .value("first_name", "Ada")
        .value("gender", "female")
        .returning(&["id"])
        .execute()
        .await
        .unwrap();

    service.assert_last_statement(
        "INSERT INTO \"person\" (\"first_name\", \"gender\") VALUES (:0, :1) RETURNING \"id\"",
        &[text("0", "Ada"), text("1", "female")],
    );
    assert_eq!(result.affected_rows(), 1);
    assert_eq!(result.single_row().unwrap().get_as::<i64>("id").unwrap(), 42);
}

#[tokio::test]
async fn test_mysql_insert_reports_generated_field() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .updated(1)
                .generated(Field::LongValue(7))
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Mysql);

    let result = client
        .querier()
        .insert_into("pet")
        .value("name", "Rex")
        .value("owner_id", 3)
        .execute()
        .await
        .unwrap();

    let sent = service.last_statement().unwrap();
    assert_eq!(sent.sql, "INSERT INTO `pet` (`name`, `owner_id`) VALUES (:0, :1)");
    assert_eq!(sent.parameters[1].value, Field::LongValue(3));
    assert_eq!(result.generated_id(), Some(&SqlValue::Int(7)));
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_remote_error_passes_through_verbatim() {
    let message = "ERROR: relation \"persons\" does not exist";
    let service = Arc::new(
        InMemoryDataApiService::new().with_error(DataApiError::RemoteRejected(message.into())),
    );
    let client = client_with(&service, Engine::Postgres);

    let err = client
        .querier()
        .select()
        .columns(&["*"])
        .from("persons")
        .execute()
        .await
        .unwrap_err();

    assert_eq!(err.remote_message(), Some(message));
}

#[tokio::test]
async fn test_introspection_groups_columns() {
    let service = Arc::new(
        InMemoryDataApiService::new().with_response(
            InMemoryResponseBuilder::new()
                .column("table_schema", "name")
                .column("table_name", "name")
                .column("table_type", "varchar")
                .column("column_name", "name")
                .column("data_type", "varchar")
                .column("is_nullable", "varchar")
                .column("has_default", "bool")
                .column("is_auto_increment", "bool")
                .row(vec![
                    Field::StringValue("public".into()),
                    Field::StringValue("person".into()),
                    Field::StringValue("BASE TABLE".into()),
                    Field::StringValue("id".into()),
                    Field::StringValue("integer".into()),
                    Field::StringValue("NO".into()),
                    Field::BooleanValue(true),
                    Field::BooleanValue(true),
                ])
                .row(vec![
                    Field::StringValue("public".into()),
                    Field::StringValue("person".into()),
                    Field::StringValue("BASE TABLE".into()),
                    Field::StringValue("first_name".into()),
                    Field::StringValue("character varying".into()),
                    Field::StringValue("YES".into()),
                    Field::BooleanValue(false),
                    Field::BooleanValue(false),
                ])
                .build(),
        ),
    );
    let client = client_with(&service, Engine::Postgres);

    let tables = client.get_tables().await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "person");
    assert!(tables[0].columns[0].is_auto_increment);
    assert!(tables[0].columns[1].is_nullable);
    assert!(service
        .last_statement()
        .unwrap()
        .sql
        .contains("information_schema.columns"));
}
