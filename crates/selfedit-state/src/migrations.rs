//! SurrealDB schema initialization for the candidate backend.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::storage_traits::StorageResult;

/// Define the `candidates` and `evaluations` tables.
///
/// Idempotent; safe to run on every connect.
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing selfedit SurrealDB schema");

    init_candidates_table(db).await?;
    init_evaluations_table(db).await?;

    info!("selfedit schema initialization complete");
    Ok(())
}

/// Schema:
/// ```text
/// TABLE candidates {
///   candidate_id: STRING (unique)
///   status:       STRING (generated | evaluating | accepted | rejected | human_review)
///   payload:      STRING (candidate JSON document)
/// }
/// ```
///
/// Candidates are overwritten in place and never deleted.
async fn init_candidates_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing candidates table");

    let sql = r#"
        DEFINE TABLE candidates AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_candidate_id ON TABLE candidates COLUMNS candidate_id UNIQUE;
        DEFINE INDEX idx_candidate_status ON TABLE candidates COLUMNS status;
    "#;

    db.query(sql).await?;
    Ok(())
}

/// Schema:
/// ```text
/// TABLE evaluations {
///   candidate_id: STRING (unique)
///   payload:      STRING (evaluation artifact JSON)
/// }
/// ```
async fn init_evaluations_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing evaluations table");

    let sql = r#"
        DEFINE TABLE evaluations AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX idx_eval_candidate_id ON TABLE evaluations COLUMNS candidate_id UNIQUE;
    "#;

    db.query(sql).await?;
    Ok(())
}
