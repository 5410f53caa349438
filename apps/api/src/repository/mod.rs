//! PostgreSQL implementation of the pipeline's repository ports.
//!
//! Runtime-checked `sqlx` queries over a shared pool; each call borrows a pooled
//! connection for its own duration.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::aggregate::PartialApplicantRecord;
use crate::models::applicant::{
    ApplicantId, ApplicantIdentity, ApplicantSet, ApplicationRecord, ApplicationStatus,
    JobPosting, RegistrationRecord,
};
use crate::models::ranking::{RankingRequestRow, RequestStatus, ShortlistEntry};
use crate::pipeline::ports::{
    ApplicantSource, CreateRequestOutcome, RepositoryError, RequestQueue, ResultSink,
};

#[derive(Debug, FromRow)]
struct ApplicantRow {
    id: Uuid,
    name: String,
}

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicantSource for PgRepository {
    async fn fetch_job_posting(&self, post_id: Uuid) -> Result<Option<JobPosting>, RepositoryError> {
        Ok(sqlx::query_as::<_, JobPosting>(
            "SELECT id, title, description, details FROM job_posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn fetch_applicant_set(&self, post_id: Uuid) -> Result<ApplicantSet, RepositoryError> {
        let applications = sqlx::query_as::<_, ApplicationRecord>(
            r#"
            SELECT id, post_id, user_id, registration_id, application_type,
                   resume, linkedin, github, skill_matches, interests,
                   cover_letter, work_experience, status
            FROM applications
            WHERE post_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        let user_ids: Vec<Uuid> = applications.iter().filter_map(|a| a.user_id).collect();
        if user_ids.is_empty() {
            return Ok(ApplicantSet {
                applications,
                ..Default::default()
            });
        }

        let users = sqlx::query_as::<_, ApplicantRow>(
            "SELECT id, name FROM applicants WHERE id = ANY($1) ORDER BY created_at",
        )
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| ApplicantIdentity {
            id: row.id,
            name: row.name,
            post_id,
        })
        .collect();

        let registrations = sqlx::query_as::<_, RegistrationRecord>(
            r#"
            SELECT id, owner, resume, linkedin, github, skills,
                   explain_yourself, passion, expectations
            FROM registrations
            WHERE owner = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ApplicantSet {
            applications,
            users,
            registrations,
        })
    }
}

#[async_trait]
impl ResultSink for PgRepository {
    async fn persist_aggregate(
        &self,
        post_id: Uuid,
        record: &PartialApplicantRecord,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO applicant_aggregates (post_id, applicant_id, record, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (post_id, applicant_id)
            DO UPDATE SET record = EXCLUDED.record, updated_at = now()
            "#,
        )
        .bind(post_id)
        .bind(record.identity.id)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn persist_ranking_result(
        &self,
        post_id: Uuid,
        shortlist: &[ShortlistEntry],
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO ranked_applicants (id, post_id, entries) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(Json(shortlist))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_application_status(
        &self,
        post_id: Uuid,
        applicant_id: ApplicantId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE applications SET status = $3 WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(applicant_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RequestQueue for PgRepository {
    async fn pending_requests(&self) -> Result<Vec<RankingRequestRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, RankingRequestRow>(
            r#"
            SELECT id, post_id, status, result, requested_via, created_at, processed_at
            FROM ranking_requests
            WHERE status IS NULL OR status = 'pending'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_request_status(
        &self,
        post_id: Uuid,
        status: RequestStatus,
        result: Option<Value>,
    ) -> Result<(), RepositoryError> {
        let terminal = matches!(status, RequestStatus::Completed | RequestStatus::Failed);
        sqlx::query(
            r#"
            UPDATE ranking_requests
            SET status = $2,
                result = COALESCE($3, result),
                processed_at = CASE WHEN $4 THEN now() ELSE processed_at END
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .bind(status.as_str())
        .bind(result)
        .bind(terminal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_request(
        &self,
        post_id: Uuid,
        requested_via: &str,
    ) -> Result<CreateRequestOutcome, RepositoryError> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO ranking_requests (id, post_id, status, requested_via)
            VALUES ($1, $2, 'pending', $3)
            ON CONFLICT (post_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(requested_via)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(request_id) = inserted {
            return Ok(CreateRequestOutcome::Created { request_id });
        }
        let existing = self.find_request(post_id).await?.ok_or_else(|| {
            RepositoryError::Unavailable(format!("ranking request for {post_id} vanished"))
        })?;
        Ok(CreateRequestOutcome::Existing {
            request_id: existing.id,
            status: existing.status,
        })
    }

    async fn find_request(
        &self,
        post_id: Uuid,
    ) -> Result<Option<RankingRequestRow>, RepositoryError> {
        Ok(sqlx::query_as::<_, RankingRequestRow>(
            r#"
            SELECT id, post_id, status, result, requested_via, created_at, processed_at
            FROM ranking_requests
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?)
    }
}
