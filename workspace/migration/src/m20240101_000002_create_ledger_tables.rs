use crate::entity_iden::EntityIden;
use model::entities::prelude::*;
use model::entities::{account_category, account_transaction, installment};
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create account_categories table
        manager
            .create_table(
                Table::create()
                    .table(AccountCategory::table())
                    .if_not_exists()
                    .col(pk_auto(AccountCategory::column(account_category::Column::Id)))
                    .col(string(AccountCategory::column(account_category::Column::Name)).unique_key())
                    .col(
                        string(AccountCategory::column(account_category::Column::CategoryType))
                            .string_len(10),
                    )
                    .col(string_null(AccountCategory::column(
                        account_category::Column::Description,
                    )))
                    .to_owned(),
            )
            .await?;

        // Create account_transactions table
        manager
            .create_table(
                Table::create()
                    .table(AccountTransaction::table())
                    .if_not_exists()
                    .col(pk_auto(AccountTransaction::column(account_transaction::Column::Id)))
                    .col(date(AccountTransaction::column(
                        account_transaction::Column::TransactionDate,
                    )))
                    .col(
                        string(AccountTransaction::column(
                            account_transaction::Column::TransactionType,
                        ))
                        .string_len(10),
                    )
                    .col(integer(AccountTransaction::column(
                        account_transaction::Column::CategoryId,
                    )))
                    .col(big_integer(AccountTransaction::column(
                        account_transaction::Column::Amount,
                    )))
                    .col(
                        string(AccountTransaction::column(
                            account_transaction::Column::PaymentMethod,
                        ))
                        .string_len(20),
                    )
                    .col(string_null(AccountTransaction::column(
                        account_transaction::Column::VendorCustomer,
                    )))
                    .col(string_null(AccountTransaction::column(
                        account_transaction::Column::InvoiceNumber,
                    )))
                    .col(string_null(AccountTransaction::column(
                        account_transaction::Column::ReceiptNumber,
                    )))
                    .col(string_null(AccountTransaction::column(
                        account_transaction::Column::ReferenceNumber,
                    )))
                    .col(text_null(AccountTransaction::column(
                        account_transaction::Column::Description,
                    )))
                    .col(integer_null(AccountTransaction::column(
                        account_transaction::Column::InstallmentId,
                    )))
                    .col(integer_null(AccountTransaction::column(
                        account_transaction::Column::ServiceTicketId,
                    )))
                    .col(
                        string(AccountTransaction::column(account_transaction::Column::Status))
                            .string_len(10),
                    )
                    .col(string(AccountTransaction::column(
                        account_transaction::Column::CreatedBy,
                    )))
                    .col(string_null(AccountTransaction::column(
                        account_transaction::Column::ApprovedBy,
                    )))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_transactions_category")
                            .from(
                                AccountTransaction::table(),
                                AccountTransaction::column(account_transaction::Column::CategoryId),
                            )
                            .to(
                                AccountCategory::table(),
                                AccountCategory::column(account_category::Column::Id),
                            )
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_transactions_installment")
                            .from(
                                AccountTransaction::table(),
                                AccountTransaction::column(
                                    account_transaction::Column::InstallmentId,
                                ),
                            )
                            .to(Installment::table(), Installment::column(installment::Column::Id))
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Summaries scan approved rows by date.
        manager
            .create_index(
                Index::create()
                    .name("idx_account_transactions_status_date")
                    .table(AccountTransaction::table())
                    .col(AccountTransaction::column(account_transaction::Column::Status))
                    .col(AccountTransaction::column(
                        account_transaction::Column::TransactionDate,
                    ))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountTransaction::table()).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountCategory::table()).to_owned())
            .await?;

        Ok(())
    }
}
