//! Initial schema for monthly pratica invoicing.
//!
//! Creates the booking mirror, invoice rules, monthly praticas, invoices,
//! line items and the audit log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(BOOKINGS_SQL).await?;
        db.execute_unprepared(INVOICE_RULES_SQL).await?;
        db.execute_unprepared(MONTHLY_PRATICAS_SQL).await?;
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(AUDIT_LOG_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// PART 1: BOOKING MIRROR
// ============================================================
const BOOKINGS_SQL: &str = r"
CREATE TABLE bookings (
    booking_id BIGINT PRIMARY KEY,
    confirmation_code VARCHAR(64) NOT NULL,
    booked_at_raw VARCHAR(64) NOT NULL,
    total_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    currency VARCHAR(3),
    seller VARCHAR(255),
    customer JSONB NOT NULL,
    activities JSONB NOT NULL DEFAULT '[]'::jsonb,
    synced_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_bookings_confirmation_code ON bookings(confirmation_code);
";

// ============================================================
// PART 2: INVOICE RULES
// ============================================================
const INVOICE_RULES_SQL: &str = r"
CREATE TABLE invoice_rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    seller_names JSONB NOT NULL DEFAULT '[]'::jsonb,
    date_basis VARCHAR(16) NOT NULL DEFAULT 'creation',
    start_date DATE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_invoice_rules_date_basis CHECK (date_basis IN ('creation', 'travel')),
    CONSTRAINT chk_invoice_rules_sellers CHECK (jsonb_typeof(seller_names) = 'array')
);

-- Rule selection reads active rules in creation order
CREATE INDEX idx_invoice_rules_active ON invoice_rules(created_at, id) WHERE active;
";

// ============================================================
// PART 3: MONTHLY PRATICAS
// ============================================================
const MONTHLY_PRATICAS_SQL: &str = r"
CREATE TABLE monthly_praticas (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    year_month CHAR(7) NOT NULL,
    remote_id VARCHAR(64),
    display_number VARCHAR(64),
    period_code VARCHAR(16),
    status VARCHAR(16) NOT NULL DEFAULT 'open',
    total_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    booking_count INTEGER NOT NULL DEFAULT 0,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    finalized_at TIMESTAMPTZ,
    -- One aggregate per period; concurrent inserts lose here and re-read
    CONSTRAINT uq_monthly_praticas_year_month UNIQUE (year_month),
    CONSTRAINT chk_monthly_praticas_year_month CHECK (year_month ~ '^[0-9]{4}-(0[1-9]|1[0-2])$'),
    CONSTRAINT chk_monthly_praticas_status CHECK (status IN ('open', 'finalized')),
    CONSTRAINT chk_monthly_praticas_finalized CHECK (
        (status = 'finalized') = (finalized_at IS NOT NULL)
    ),
    CONSTRAINT chk_monthly_praticas_booking_count CHECK (booking_count >= 0)
);

CREATE INDEX idx_monthly_praticas_status ON monthly_praticas(status, year_month DESC);
";

// ============================================================
// PART 4: INVOICES AND LINE ITEMS
// ============================================================
const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    pratica_id UUID REFERENCES monthly_praticas(id),
    booking_id BIGINT NOT NULL,
    invoice_type VARCHAR(16) NOT NULL DEFAULT 'INVOICE',
    confirmation_code VARCHAR(64) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'pending',
    total_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    currency VARCHAR(3) NOT NULL,
    customer_name VARCHAR(255) NOT NULL,
    customer_email VARCHAR(255),
    seller_name VARCHAR(255),
    booking_created_on DATE,
    error_message TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    triggered_by VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    sent_at TIMESTAMPTZ,
    CONSTRAINT uq_invoices_booking_type UNIQUE (booking_id, invoice_type),
    CONSTRAINT chk_invoices_type CHECK (invoice_type IN ('INVOICE', 'CREDIT_NOTE')),
    CONSTRAINT chk_invoices_status CHECK (status IN ('pending', 'sent', 'failed')),
    CONSTRAINT chk_invoices_retry_count CHECK (retry_count >= 0)
);

-- Retry pass: failed invoices, oldest first
CREATE INDEX idx_invoices_failed ON invoices(created_at) WHERE status = 'failed';

-- Total recompute: sent invoices per pratica
CREATE INDEX idx_invoices_pratica_sent ON invoices(pratica_id) WHERE status = 'sent';

-- Listing, newest first
CREATE INDEX idx_invoices_created ON invoices(created_at DESC);
CREATE INDEX idx_invoices_confirmation_code ON invoices(confirmation_code);

CREATE TABLE invoice_line_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    activity_id BIGINT NOT NULL,
    remote_service_id VARCHAR(64) NOT NULL,
    remote_pricing_line_id VARCHAR(64) NOT NULL,
    remote_payment_id VARCHAR(64) NOT NULL,
    product_title TEXT NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 1,
    unit_price NUMERIC(19, 2) NOT NULL,
    total_price NUMERIC(19, 2) NOT NULL,
    service_date DATE,
    participant_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_line_items_quantity CHECK (quantity > 0)
);

CREATE INDEX idx_invoice_line_items_invoice ON invoice_line_items(invoice_id, created_at);
";

// ============================================================
// PART 5: AUDIT LOG
// ============================================================
const AUDIT_LOG_SQL: &str = r"
-- Append-only; entity_id has no foreign key
CREATE TABLE invoice_audit_log (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entity_type VARCHAR(32) NOT NULL,
    entity_id UUID NOT NULL,
    action VARCHAR(64) NOT NULL,
    old_status VARCHAR(16),
    new_status VARCHAR(16),
    details JSONB NOT NULL DEFAULT '{}'::jsonb,
    actor VARCHAR(64) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_audit_entity_type CHECK (entity_type IN ('invoice', 'monthly_pratica'))
);

CREATE INDEX idx_invoice_audit_log_entity ON invoice_audit_log(entity_type, entity_id, created_at);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS invoice_audit_log CASCADE;
DROP TABLE IF EXISTS invoice_line_items CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS monthly_praticas CASCADE;
DROP TABLE IF EXISTS invoice_rules CASCADE;
DROP TABLE IF EXISTS bookings CASCADE;
";
