//! Initial database migration.
//!
//! Creates the enums, the four tables, and the `updated_at` trigger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(IMAGES_SQL).await?;
        db.execute_unprepared(CLASSIFICATIONS_SQL).await?;
        db.execute_unprepared(IMAGE_CLASSIFICATION_FK_SQL).await?;
        db.execute_unprepared(FEEDBACK_SQL).await?;

        // ============================================================
        // PART 3: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

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

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('user', 'admin');

CREATE TYPE feedback_status AS ENUM ('pending', 'approved', 'rejected');

CREATE TYPE classification_label AS ENUM (
    'edible',
    'poisonous',
    'deadly',
    'conditionally_edible',
    'not_a_mushroom'
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    role user_role NOT NULL DEFAULT 'user',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_users_role ON users(role) WHERE role = 'admin';
";

const IMAGES_SQL: &str = r"
CREATE TABLE images (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    file_name VARCHAR(255) NOT NULL,
    url TEXT NOT NULL,
    storage_key TEXT NOT NULL,
    analyzed BOOLEAN NOT NULL DEFAULT false,
    classification_id UUID,
    upload_date TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_images_analyzed_classification CHECK (
        (analyzed AND classification_id IS NOT NULL)
        OR (NOT analyzed AND classification_id IS NULL)
    )
);

CREATE INDEX idx_images_user ON images(user_id, upload_date DESC);
CREATE INDEX idx_images_upload_date ON images(upload_date DESC);
";

const CLASSIFICATIONS_SQL: &str = r"
CREATE TABLE classifications (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    image_id UUID NOT NULL REFERENCES images(id) ON DELETE CASCADE,
    label classification_label NOT NULL,
    confidence NUMERIC(5, 4) NOT NULL,
    details TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_classifications_confidence CHECK (confidence >= 0 AND confidence <= 1)
);

CREATE INDEX idx_classifications_image ON classifications(image_id);
";

// Added after both tables exist; the two reference each other.
const IMAGE_CLASSIFICATION_FK_SQL: &str = r"
ALTER TABLE images
    ADD CONSTRAINT fk_images_classification
    FOREIGN KEY (classification_id) REFERENCES classifications(id) ON DELETE SET NULL;
";

const FEEDBACK_SQL: &str = r"
CREATE TABLE feedback (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    image_id UUID NOT NULL REFERENCES images(id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    status feedback_status NOT NULL DEFAULT 'pending',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_feedback_user ON feedback(user_id);
CREATE INDEX idx_feedback_image ON feedback(image_id);
CREATE INDEX idx_feedback_status_created ON feedback(status, created_at DESC);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_users_updated_at
    BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_users_updated_at ON users;
DROP FUNCTION IF EXISTS set_updated_at();

ALTER TABLE IF EXISTS images DROP CONSTRAINT IF EXISTS fk_images_classification;

DROP TABLE IF EXISTS feedback;
DROP TABLE IF EXISTS classifications;
DROP TABLE IF EXISTS images;
DROP TABLE IF EXISTS users;

DROP TYPE IF EXISTS classification_label;
DROP TYPE IF EXISTS feedback_status;
DROP TYPE IF EXISTS user_role;
";
