// src/services/campus_service.rs

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::WorkflowStore,
    models::{
        audit::AuditLog,
        campus::Campus,
        profile::Role,
    },
    services::authorization,
};

#[derive(Clone)]
pub struct CampusService {
    store: Arc<dyn WorkflowStore>,
    span: Span,
}

impl CampusService {
    pub fn new(store: Arc<dyn WorkflowStore>, span: Span) -> Self {
        Self { store, span }
    }

    pub async fn list_campuses(&self) -> Result<Vec<Campus>, AppError> {
        let span = tracing::debug_span!(parent: &self.span, "list_campuses");
        async {
            let mut tx = self.store.begin().await?;
            tx.list_campuses().await
        }
        .instrument(span)
        .await
    }

    /// Liga um diretor a um campus nos dois sentidos. O antigo diretor do
    /// campus perde o campus, e o antigo campus do diretor fica sem diretor.
    pub async fn assign_director_to_campus(
        &self,
        actor_id: Uuid,
        campus_id: Uuid,
        director_id: Uuid,
    ) -> Result<Campus, AppError> {
        let span = tracing::info_span!(
            parent: &self.span,
            "assign_director_to_campus",
            %actor_id,
            %campus_id,
            %director_id
        );
        self.assign_in_tx(actor_id, campus_id, director_id)
            .instrument(span)
            .await
    }

    async fn assign_in_tx(&self, actor_id: Uuid, campus_id: Uuid, director_id: Uuid) -> Result<Campus, AppError> {
        let mut tx = self.store.begin().await?;

        let actor = authorization::load_actor(&mut *tx, actor_id).await?;
        authorization::require_super_admin(&actor)?;

        let mut campus = tx
            .lock_campus(campus_id)
            .await?
            .ok_or(AppError::CampusNotFound(campus_id))?;
        let director = tx
            .find_profile(director_id)
            .await?
            .ok_or(AppError::ProfileNotFound(director_id))?;

        match director.role {
            Role::DirecteurCampus => {}
            Role::SuperAdmin | Role::Comptable | Role::Enseignant => {
                return Err(AppError::InvalidInput(format!(
                    "O perfil {} não é DIRECTEUR_CAMPUS.",
                    director.id
                )));
            }
        }

        if campus.director_id == Some(director.id) && director.campus_id == Some(campus.id) {
            tracing::info!("Diretor já atribuído a este campus");
            return Ok(campus);
        }

        let previous_director = campus.director_id.filter(|id| *id != director.id);
        if let Some(previous) = previous_director {
            tx.set_profile_campus(previous, None).await?;
        }

        // Solta o campus anterior antes de ocupar o novo (um diretor por campus)
        let previous_campus = tx
            .find_campus_by_director(director.id)
            .await?
            .map(|old| old.id)
            .filter(|id| *id != campus.id);
        if let Some(old_campus) = previous_campus {
            tx.set_campus_director(old_campus, None).await?;
        }

        tx.set_campus_director(campus.id, Some(director.id)).await?;
        tx.set_profile_campus(director.id, Some(campus.id)).await?;
        campus.director_id = Some(director.id);

        tx.insert_audit_log(&AuditLog::new(
            actor.id,
            "assign_director_to_campus",
            "campus",
            campus.id,
            json!({
                "directorId": director.id,
                "previousDirectorId": previous_director,
                "previousCampusId": previous_campus,
            }),
            Utc::now(),
        ))
        .await?;
        tx.commit().await?;

        tracing::info!(campus = %campus.name, "Diretor atribuído");
        Ok(campus)
    }
}
