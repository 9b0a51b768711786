//! Tests for schema_uml
//!
//! End-to-end checks of the load, link, filter and render pipeline.

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::config::{Config, DatabaseConfig, DiagramConfig};
    use crate::schema::types::{Column, ForeignKey, Table};
    use crate::{prepare_tables, render_diagram, DatabaseConnection, Error, SchemaUmlClient};

    const CUSTOMER_ORDERS: &[&str] = &[
        "CREATE TABLE customer (id INTEGER PRIMARY KEY, name TEXT)",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER NOT NULL)",
    ];

    // Helper function to create a client over a fresh in-memory database
    async fn sqlite_client(ddl: &[&str], diagram: DiagramConfig) -> SchemaUmlClient {
        let config = Config {
            database: DatabaseConfig {
                driver: "sqlite".to_string(),
                url: "sqlite::memory:".to_string(),
                pool_size: Some(1),
                ..DatabaseConfig::default()
            },
            diagram,
            ..Config::default()
        };

        let client = SchemaUmlClient::new(config).await.expect("sqlite connects");
        if let DatabaseConnection::Sqlite(pool) = &client.db_connection {
            for statement in ddl {
                sqlx::query(statement).execute(pool).await.unwrap();
            }
        }
        client
    }

    fn diagram(title: &str) -> DiagramConfig {
        DiagramConfig {
            title: Some(title.to_string()),
            ..DiagramConfig::default()
        }
    }

    /// `accounts <- users <- sessions`, plus `audit_log -> users`
    fn linked_tables() -> Vec<Table> {
        let mut users = Table::new("users")
            .with_column(Column::new(1, "id", "int").primary_key())
            .with_column(Column::new(2, "account_id", "int"));
        users.add_foreign_key(
            ForeignKey::new("users_account_fk", "users", "account_id", "accounts", "id")
                .key_flags(false, true),
        );

        let mut sessions = Table::new("sessions")
            .with_column(Column::new(1, "id", "int").primary_key())
            .with_column(Column::new(2, "user_id", "int"));
        sessions.add_foreign_key(
            ForeignKey::new("sessions_user_fk", "sessions", "user_id", "users", "id")
                .key_flags(false, true),
        );

        let mut audit_log = Table::new("audit_log")
            .with_column(Column::new(1, "id", "int").primary_key())
            .with_column(Column::new(2, "user_id", "int"));
        audit_log.add_foreign_key(
            ForeignKey::new("audit_user_fk", "audit_log", "user_id", "users", "id")
                .key_flags(false, true),
        );

        let accounts = Table::new("accounts").with_column(Column::new(1, "id", "int").primary_key());

        vec![accounts, audit_log, sessions, users]
    }

    fn names(tables: &[Table]) -> Vec<&str> {
        tables.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_inferred_relations_are_drawn() {
        let client = sqlite_client(CUSTOMER_ORDERS, diagram("Shop")).await;

        let output = String::from_utf8(client.build_diagram().await.unwrap()).unwrap();

        let expected = r#"@startuml
title Shop
hide circle
skinparam linetype ortho
entity "**customer**" {
  + ""id"": INTEGER [PK]
  --
  ""name"": TEXT
}
entity "**orders**" {
  + ""id"": INTEGER [PK]
  --
  *""customer_id"": INTEGER [FK]
}
"**orders**" }-- "**customer**"
@enduml
"#;
        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn test_inference_can_be_disabled() {
        let config = DiagramConfig {
            infer_foreign_keys: false,
            ..DiagramConfig::default()
        };
        let client = sqlite_client(CUSTOMER_ORDERS, config).await;

        let output = String::from_utf8(client.build_diagram().await.unwrap()).unwrap();
        assert!(output.contains("  *\"\"customer_id\"\": INTEGER\n"));
        assert!(!output.contains("}--"));
    }

    #[tokio::test]
    async fn test_declared_keys_skip_inference() {
        let client = sqlite_client(
            &[
                "CREATE TABLE customer (id INTEGER PRIMARY KEY)",
                "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customer(id))",
                // would be inferred if nothing were declared
                "CREATE TABLE shipment (id INTEGER PRIMARY KEY, customer_id INTEGER)",
            ],
            DiagramConfig::default(),
        )
        .await;

        let tables = prepare_tables(client.load_tables().await.unwrap(), &client.config().diagram)
            .unwrap();

        let shipment = tables.iter().find(|t| t.name == "shipment").unwrap();
        assert!(shipment.foreign_keys.is_empty());
        assert!(!shipment.column("customer_id").unwrap().is_foreign_key);

        let orders = tables.iter().find(|t| t.name == "orders").unwrap();
        assert_eq!(orders.foreign_keys.len(), 1);
        assert!(orders.column("customer_id").unwrap().is_foreign_key);
    }

    #[tokio::test]
    async fn test_one_to_one_through_shared_key() {
        let client = sqlite_client(
            &[
                "CREATE TABLE users (id INTEGER PRIMARY KEY)",
                "CREATE TABLE profiles (user_id INTEGER PRIMARY KEY REFERENCES users(id))",
            ],
            DiagramConfig::default(),
        )
        .await;

        let output = String::from_utf8(client.build_diagram().await.unwrap()).unwrap();
        assert!(output.contains("\"**profiles**\" ||-|| \"**users**\"\n"));
        assert!(output.contains("  + \"\"user_id\"\": INTEGER [PK][FK]\n"));
    }

    #[tokio::test]
    async fn test_export_without_svg_is_plantuml() {
        let client = sqlite_client(CUSTOMER_ORDERS, DiagramConfig::default()).await;

        let exported = client.export().await.unwrap();
        assert_eq!(exported, client.build_diagram().await.unwrap());
        assert!(exported.starts_with(b"@startuml\n"));
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_the_pipeline() {
        let config = DiagramConfig {
            include: vec!["orders(".to_string()],
            ..DiagramConfig::default()
        };
        let client = sqlite_client(CUSTOMER_ORDERS, config).await;

        let err = client.build_diagram().await.unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "orders("));
    }

    #[test]
    fn test_include_then_exclude() {
        let config = DiagramConfig {
            include: vec!["users".to_string(), "sessions".to_string(), "audit".to_string()],
            exclude: vec!["audit".to_string()],
            infer_foreign_keys: false,
            ..DiagramConfig::default()
        };

        let tables = prepare_tables(linked_tables(), &config).unwrap();

        assert_eq!(names(&tables), vec!["sessions", "users"]);
        // accounts was filtered out, so the edge to it goes too
        let users = &tables[1];
        assert!(users.foreign_keys.is_empty());
        assert_eq!(tables[0].foreign_keys.len(), 1);
        assert_eq!(tables[0].foreign_keys[0].target_table, "users");
    }

    #[test]
    fn test_filtering_runs_after_resolution() {
        let config = DiagramConfig {
            exclude: vec!["accounts".to_string()],
            ..DiagramConfig::default()
        };

        let tables = prepare_tables(linked_tables(), &config).unwrap();

        // the edge was resolved before its target was filtered out
        let users = tables.iter().find(|t| t.name == "users").unwrap();
        assert!(users.column("account_id").unwrap().is_foreign_key);
        assert!(users.foreign_keys.is_empty());
    }

    #[test]
    fn test_dangling_edge_fails_before_filtering() {
        let mut tables = linked_tables();
        tables[2].add_foreign_key(ForeignKey::new(
            "sessions_device_fk",
            "sessions",
            "device_id",
            "devices",
            "id",
        ));

        let err = prepare_tables(tables, &DiagramConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedTable(ref name) if name == "devices"));
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, false)]
    #[case(2, true)]
    #[case(3, true)]
    fn test_composite_primary_key(#[case] key_columns: i32, #[case] composite: bool) {
        let mut table = Table::new("t");
        for ordinal in 1..=4 {
            let column = Column::new(ordinal, &format!("c{}", ordinal), "int");
            table.add_column(if ordinal <= key_columns {
                column.primary_key()
            } else {
                column
            });
        }
        assert_eq!(table.is_composite_pk(), composite);
    }

    #[rstest]
    #[case("", "@startuml\nhide circle\n")]
    #[case("Shop", "@startuml\ntitle Shop\nhide circle\n")]
    #[case("Billing & Co", "@startuml\ntitle Billing & Co\nhide circle\n")]
    fn test_document_frame(#[case] title: &str, #[case] prefix: &str) {
        let tables = prepare_tables(linked_tables(), &DiagramConfig::default()).unwrap();
        let output = String::from_utf8(render_diagram(&tables, title).unwrap()).unwrap();

        assert!(output.starts_with(prefix));
        assert!(output.ends_with("@enduml\n"));
        assert_eq!(output.matches("title ").count(), usize::from(!title.is_empty()));
    }
}
