use sea_orm::entity::prelude::*;
use sea_orm::EntityTrait;

/// Direction of money for categories and the transactions booked against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum EntryType {
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

/// A ledger category such as "Salary", "Advance" or "Service Income".
/// A transaction's type must match the type of its category.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "account_categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub category_type: EntryType,
    /// A description of what the category is for.
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_transaction::Entity")]
    AccountTransaction,
}

impl Related<super::account_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Case-insensitive name comparison, used to resolve configured categories.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }

    /// Looks up a category by name ignoring ASCII case.
    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<Option<Model>, DbErr> {
        let categories = Entity::find().all(db).await?;
        Ok(categories.into_iter().find(|c| c.is_named(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::SqliteQueryBuilder;
    use sea_orm::{Database, DbBackend, Schema, Set, Statement};

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let schema = Schema::new(DbBackend::Sqlite);
        let stmt = schema.create_table_from_entity(Entity);
        let statement =
            Statement::from_string(DbBackend::Sqlite, stmt.to_string(SqliteQueryBuilder));
        db.execute(statement).await.unwrap();

        db
    }

    async fn create_test_category(
        db: &DatabaseConnection,
        name: &str,
        category_type: EntryType,
    ) -> Model {
        ActiveModel {
            name: Set(name.to_string()),
            category_type: Set(category_type),
            description: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[test]
    fn test_is_named_ignores_case_and_padding() {
        let category = Model {
            id: 1,
            name: "Salary".to_string(),
            category_type: EntryType::Expense,
            description: None,
        };

        assert!(category.is_named("salary"));
        assert!(category.is_named(" SALARY "));
        assert!(!category.is_named("Salaries"));
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let db = setup_test_db().await;
        create_test_category(&db, "Salary", EntryType::Expense).await;
        let advance = create_test_category(&db, "Advance", EntryType::Expense).await;

        let found = Model::find_by_name(&db, "advance").await.unwrap();
        assert_eq!(found, Some(advance));

        let missing = Model::find_by_name(&db, "Rent").await.unwrap();
        assert!(missing.is_none());
    }
}
