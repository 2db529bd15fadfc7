use crate::entity_iden::EntityIden;
use model::entities::prelude::*;
use model::entities::{agreement, installment, payment_record};
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create agreements table
        manager
            .create_table(
                Table::create()
                    .table(Agreement::table())
                    .if_not_exists()
                    .col(pk_auto(Agreement::column(agreement::Column::Id)))
                    .col(integer(Agreement::column(agreement::Column::ClientId)))
                    .col(date(Agreement::column(agreement::Column::AgreementDate)))
                    .col(integer(Agreement::column(agreement::Column::DesktopCount)).default(0))
                    .col(big_integer(Agreement::column(agreement::Column::DesktopRate)).default(0))
                    .col(integer(Agreement::column(agreement::Column::LaptopCount)).default(0))
                    .col(big_integer(Agreement::column(agreement::Column::LaptopRate)).default(0))
                    .col(integer(Agreement::column(agreement::Column::PrinterCount)).default(0))
                    .col(big_integer(Agreement::column(agreement::Column::PrinterRate)).default(0))
                    .col(integer(Agreement::column(agreement::Column::ServerCount)).default(0))
                    .col(big_integer(Agreement::column(agreement::Column::ServerRate)).default(0))
                    .col(integer(Agreement::column(agreement::Column::ScannerCount)).default(0))
                    .col(big_integer(Agreement::column(agreement::Column::ScannerRate)).default(0))
                    .col(
                        big_integer(Agreement::column(agreement::Column::NetworkingCharge))
                            .default(0),
                    )
                    .col(big_integer(Agreement::column(agreement::Column::Discount)).default(0))
                    .col(big_integer(Agreement::column(agreement::Column::Subtotal)))
                    .col(big_integer(Agreement::column(agreement::Column::TotalCost)))
                    .col(
                        string(Agreement::column(agreement::Column::PaymentFrequency))
                            .string_len(20),
                    )
                    .col(string(Agreement::column(agreement::Column::PaymentMode)).string_len(20))
                    .col(string(Agreement::column(agreement::Column::Status)).string_len(20))
                    .col(text_null(Agreement::column(agreement::Column::Notes)))
                    .col(integer(Agreement::column(agreement::Column::Version)).default(0))
                    .col(date_time(Agreement::column(agreement::Column::CreatedAt)))
                    .to_owned(),
            )
            .await?;

        // Create installments table
        manager
            .create_table(
                Table::create()
                    .table(Installment::table())
                    .if_not_exists()
                    .col(pk_auto(Installment::column(installment::Column::Id)))
                    .col(integer(Installment::column(installment::Column::AgreementId)))
                    .col(integer(Installment::column(installment::Column::PaymentNumber)))
                    .col(date(Installment::column(installment::Column::DueDate)))
                    .col(big_integer(Installment::column(installment::Column::Amount)))
                    .col(string(Installment::column(installment::Column::Status)).string_len(15))
                    .col(
                        boolean(Installment::column(installment::Column::ReminderSent))
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installments_agreement")
                            .from(
                                Installment::table(),
                                Installment::column(installment::Column::AgreementId),
                            )
                            .to(Agreement::table(), Agreement::column(agreement::Column::Id))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Payment numbers are gapless per agreement, so the pair is unique.
        manager
            .create_index(
                Index::create()
                    .name("idx_installments_agreement_number")
                    .table(Installment::table())
                    .col(Installment::column(installment::Column::AgreementId))
                    .col(Installment::column(installment::Column::PaymentNumber))
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Bucket queries filter pending rows by due date.
        manager
            .create_index(
                Index::create()
                    .name("idx_installments_status_due_date")
                    .table(Installment::table())
                    .col(Installment::column(installment::Column::Status))
                    .col(Installment::column(installment::Column::DueDate))
                    .to_owned(),
            )
            .await?;

        // Create payment_records table
        manager
            .create_table(
                Table::create()
                    .table(PaymentRecord::table())
                    .if_not_exists()
                    .col(pk_auto(PaymentRecord::column(payment_record::Column::Id)))
                    .col(integer(PaymentRecord::column(payment_record::Column::InstallmentId)))
                    .col(integer(PaymentRecord::column(payment_record::Column::AgreementId)))
                    .col(date(PaymentRecord::column(payment_record::Column::PaymentDate)))
                    .col(big_integer(PaymentRecord::column(payment_record::Column::AmountPaid)))
                    .col(
                        string(PaymentRecord::column(payment_record::Column::PaymentMethod))
                            .string_len(20),
                    )
                    .col(string_null(PaymentRecord::column(
                        payment_record::Column::ReferenceNumber,
                    )))
                    .col(text_null(PaymentRecord::column(payment_record::Column::Notes)))
                    .col(string_null(PaymentRecord::column(
                        payment_record::Column::RecordedBy,
                    )))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_records_installment")
                            .from(
                                PaymentRecord::table(),
                                PaymentRecord::column(payment_record::Column::InstallmentId),
                            )
                            .to(Installment::table(), Installment::column(installment::Column::Id))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_records_agreement")
                            .from(
                                PaymentRecord::table(),
                                PaymentRecord::column(payment_record::Column::AgreementId),
                            )
                            .to(Agreement::table(), Agreement::column(agreement::Column::Id))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one receipt may settle an installment.
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_records_installment")
                    .table(PaymentRecord::table())
                    .col(PaymentRecord::column(payment_record::Column::InstallmentId))
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentRecord::table()).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Installment::table()).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Agreement::table()).to_owned())
            .await?;

        Ok(())
    }
}
