//! `SeaORM` Entity for recurring_expenses table.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub currency: String,
    pub repeat_interval: String,
    pub day_of_month: Option<i32>,
    pub day_of_week: Option<i32>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub next_occurrence_date: Date,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Groups,
    #[sea_orm(has_many = "super::recurring_expense_payments::Entity")]
    RecurringExpensePayments,
    #[sea_orm(has_many = "super::recurring_expense_splits::Entity")]
    RecurringExpenseSplits,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::recurring_expense_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringExpensePayments.def()
    }
}

impl Related<super::recurring_expense_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringExpenseSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
