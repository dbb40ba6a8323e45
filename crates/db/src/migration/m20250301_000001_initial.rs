//! Initial database migration.
//!
//! Creates accounts, groups, the ledger tables, invitations, recurring
//! templates and the activity feed.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ACCOUNTS & GROUPS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(GROUPS_SQL).await?;
        db.execute_unprepared(FRIENDSHIPS_SQL).await?;

        // ============================================================
        // PART 2: PLACEHOLDERS & INVITATIONS
        // ============================================================
        db.execute_unprepared(PENDING_USERS_SQL).await?;
        db.execute_unprepared(GROUP_INVITATIONS_SQL).await?;

        // ============================================================
        // PART 3: RECURRING TEMPLATES
        // ============================================================
        db.execute_unprepared(RECURRING_EXPENSES_SQL).await?;

        // ============================================================
        // PART 4: EXPENSES & SETTLEMENTS
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(SETTLEMENTS_SQL).await?;

        // ============================================================
        // PART 5: ACTIVITY FEED
        // ============================================================
        db.execute_unprepared(GROUP_ACTIVITIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT users_email_lowercase CHECK (email = LOWER(email))
);
";

const GROUPS_SQL: &str = r"
CREATE TABLE groups (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    currency CHAR(3) NOT NULL DEFAULT 'USD',
    created_by UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE group_members (
    id UUID PRIMARY KEY,
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role VARCHAR(20) NOT NULL DEFAULT 'member',
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT group_members_unique UNIQUE (group_id, user_id),
    CONSTRAINT group_members_role CHECK (role IN ('admin', 'member'))
);

CREATE INDEX idx_group_members_user ON group_members(user_id) WHERE is_active;

CREATE TABLE expense_categories (
    id UUID PRIMARY KEY,
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT expense_categories_unique UNIQUE (group_id, name)
);
";

const FRIENDSHIPS_SQL: &str = r"
CREATE TABLE friendships (
    id UUID PRIMARY KEY,
    user_low_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    user_high_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    requested_by UUID NOT NULL REFERENCES users(id),
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT friendships_pair_unique UNIQUE (user_low_id, user_high_id),
    CONSTRAINT friendships_ordered CHECK (user_low_id < user_high_id),
    CONSTRAINT friendships_status CHECK (status IN ('pending', 'accepted', 'declined', 'blocked'))
);
";

const PENDING_USERS_SQL: &str = r"
CREATE TABLE pending_users (
    id UUID PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    name VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT pending_users_email_lowercase CHECK (email = LOWER(email))
);
";

const GROUP_INVITATIONS_SQL: &str = r"
CREATE TABLE group_invitations (
    id UUID PRIMARY KEY,
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    email VARCHAR(255) NOT NULL,
    token VARCHAR(128) NOT NULL UNIQUE,
    role VARCHAR(20) NOT NULL DEFAULT 'member',
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    invited_by UUID NOT NULL REFERENCES users(id),
    expires_at TIMESTAMPTZ NOT NULL,
    accepted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT group_invitations_status CHECK (status IN ('pending', 'accepted', 'declined'))
);

CREATE INDEX idx_group_invitations_email ON group_invitations(email) WHERE status = 'pending';
";

const RECURRING_EXPENSES_SQL: &str = r"
CREATE TABLE recurring_expenses (
    id UUID PRIMARY KEY,
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    title VARCHAR(255) NOT NULL,
    notes TEXT,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    currency CHAR(3) NOT NULL,
    repeat_interval VARCHAR(10) NOT NULL,
    day_of_month INTEGER,
    day_of_week INTEGER,
    start_date DATE NOT NULL,
    end_date DATE,
    next_occurrence_date DATE NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_by UUID NOT NULL REFERENCES users(id),
    updated_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT recurring_interval CHECK (repeat_interval IN ('daily', 'weekly', 'monthly', 'yearly')),
    CONSTRAINT recurring_day_of_month CHECK (day_of_month IS NULL OR day_of_month BETWEEN 1 AND 31),
    CONSTRAINT recurring_day_of_week CHECK (day_of_week IS NULL OR day_of_week BETWEEN 0 AND 6),
    CONSTRAINT recurring_date_range CHECK (end_date IS NULL OR end_date >= start_date)
);

CREATE INDEX idx_recurring_due ON recurring_expenses(next_occurrence_date) WHERE is_active;

CREATE TABLE recurring_expense_payments (
    id UUID PRIMARY KEY,
    recurring_expense_id UUID NOT NULL REFERENCES recurring_expenses(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    payment_method VARCHAR(50),
    position INTEGER NOT NULL
);

CREATE TABLE recurring_expense_splits (
    id UUID PRIMARY KEY,
    recurring_expense_id UUID NOT NULL REFERENCES recurring_expenses(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    amount_owed NUMERIC(19, 4) NOT NULL CHECK (amount_owed >= 0),
    split_type VARCHAR(20) NOT NULL DEFAULT 'equal',
    position INTEGER NOT NULL
);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY,
    group_id UUID REFERENCES groups(id) ON DELETE CASCADE,
    kind VARCHAR(10) NOT NULL,
    friend_low_id UUID REFERENCES users(id),
    friend_high_id UUID REFERENCES users(id),
    title VARCHAR(255) NOT NULL,
    notes TEXT,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    currency CHAR(3) NOT NULL,
    expense_date DATE NOT NULL,
    category_id UUID REFERENCES expense_categories(id) ON DELETE SET NULL,
    tags JSONB NOT NULL DEFAULT '[]'::jsonb,
    recurring_expense_id UUID REFERENCES recurring_expenses(id) ON DELETE SET NULL,
    created_by UUID NOT NULL REFERENCES users(id),
    updated_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT expenses_scope CHECK (
        (kind = 'group' AND group_id IS NOT NULL AND friend_low_id IS NULL AND friend_high_id IS NULL)
        OR (kind = 'friend' AND group_id IS NULL AND friend_low_id IS NOT NULL AND friend_high_id IS NOT NULL
            AND friend_low_id < friend_high_id)
    )
);

CREATE INDEX idx_expenses_group_date ON expenses(group_id, expense_date DESC, created_at DESC);
CREATE INDEX idx_expenses_friends ON expenses(friend_low_id, friend_high_id) WHERE kind = 'friend';

CREATE TABLE expense_payments (
    id UUID PRIMARY KEY,
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    user_id UUID REFERENCES users(id),
    pending_user_id UUID REFERENCES pending_users(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    payment_method VARCHAR(50),
    position INTEGER NOT NULL,
    CONSTRAINT expense_payments_one_participant CHECK ((user_id IS NULL) <> (pending_user_id IS NULL))
);

CREATE INDEX idx_expense_payments_expense ON expense_payments(expense_id);
CREATE INDEX idx_expense_payments_pending ON expense_payments(pending_user_id) WHERE pending_user_id IS NOT NULL;

CREATE TABLE expense_splits (
    id UUID PRIMARY KEY,
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    user_id UUID REFERENCES users(id),
    pending_user_id UUID REFERENCES pending_users(id) ON DELETE RESTRICT,
    amount_owed NUMERIC(19, 4) NOT NULL CHECK (amount_owed >= 0),
    split_type VARCHAR(20) NOT NULL DEFAULT 'equal',
    share_value NUMERIC(19, 4),
    position INTEGER NOT NULL,
    CONSTRAINT expense_splits_one_participant CHECK ((user_id IS NULL) <> (pending_user_id IS NULL))
);

CREATE INDEX idx_expense_splits_expense ON expense_splits(expense_id);
CREATE INDEX idx_expense_splits_pending ON expense_splits(pending_user_id) WHERE pending_user_id IS NOT NULL;
";

const SETTLEMENTS_SQL: &str = r"
CREATE TABLE settlements (
    id UUID PRIMARY KEY,
    group_id UUID REFERENCES groups(id) ON DELETE CASCADE,
    kind VARCHAR(10) NOT NULL,
    friend_low_id UUID REFERENCES users(id),
    friend_high_id UUID REFERENCES users(id),
    payer_user_id UUID REFERENCES users(id),
    payer_pending_id UUID REFERENCES pending_users(id) ON DELETE RESTRICT,
    payee_user_id UUID REFERENCES users(id),
    payee_pending_id UUID REFERENCES pending_users(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    currency CHAR(3) NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'pending',
    payment_method VARCHAR(50),
    transaction_reference VARCHAR(255),
    notes TEXT,
    created_by UUID NOT NULL REFERENCES users(id),
    updated_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT settlements_status CHECK (status IN ('pending', 'completed', 'cancelled')),
    CONSTRAINT settlements_one_payer CHECK ((payer_user_id IS NULL) <> (payer_pending_id IS NULL)),
    CONSTRAINT settlements_one_payee CHECK ((payee_user_id IS NULL) <> (payee_pending_id IS NULL)),
    CONSTRAINT settlements_distinct_users CHECK (payer_user_id <> payee_user_id),
    CONSTRAINT settlements_distinct_pending CHECK (payer_pending_id <> payee_pending_id),
    CONSTRAINT settlements_scope CHECK (
        (kind = 'group' AND group_id IS NOT NULL AND friend_low_id IS NULL AND friend_high_id IS NULL)
        OR (kind = 'friend' AND group_id IS NULL AND friend_low_id IS NOT NULL AND friend_high_id IS NOT NULL
            AND friend_low_id < friend_high_id)
    )
);

CREATE INDEX idx_settlements_group ON settlements(group_id, created_at DESC);
CREATE INDEX idx_settlements_payer_user ON settlements(payer_user_id);
CREATE INDEX idx_settlements_payee_user ON settlements(payee_user_id);
";

const GROUP_ACTIVITIES_SQL: &str = r"
CREATE TABLE group_activities (
    id UUID PRIMARY KEY,
    group_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    action VARCHAR(50) NOT NULL,
    entity_type VARCHAR(20) NOT NULL,
    entity_id UUID NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_group_activities_group ON group_activities(group_id, created_at DESC);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS group_activities CASCADE;
DROP TABLE IF EXISTS settlements CASCADE;
DROP TABLE IF EXISTS expense_splits CASCADE;
DROP TABLE IF EXISTS expense_payments CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS recurring_expense_splits CASCADE;
DROP TABLE IF EXISTS recurring_expense_payments CASCADE;
DROP TABLE IF EXISTS recurring_expenses CASCADE;
DROP TABLE IF EXISTS group_invitations CASCADE;
DROP TABLE IF EXISTS pending_users CASCADE;
DROP TABLE IF EXISTS friendships CASCADE;
DROP TABLE IF EXISTS expense_categories CASCADE;
DROP TABLE IF EXISTS group_members CASCADE;
DROP TABLE IF EXISTS groups CASCADE;
DROP TABLE IF EXISTS users CASCADE;
";
