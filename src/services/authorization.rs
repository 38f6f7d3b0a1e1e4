// src/services/authorization.rs
//
// Regras de papel e de escopo de campus. Toda verificação parte de um Profile
// recém-lido do banco, nunca de algo enviado pelo cliente.

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InvoiceScope, WorkflowTx},
    models::{
        invoice::Invoice,
        profile::{Profile, Role},
    },
};

pub async fn load_actor(tx: &mut dyn WorkflowTx, actor_id: Uuid) -> Result<Profile, AppError> {
    tx.find_profile(actor_id)
        .await?
        .ok_or(AppError::ProfileNotFound(actor_id))
}

/// Diretor com campus atribuído; devolve o campus dele.
pub fn require_director(actor: &Profile) -> Result<Uuid, AppError> {
    match actor.role {
        Role::DirecteurCampus => actor
            .scoped_campus()
            .ok_or_else(|| AppError::Forbidden("Diretor sem campus atribuído.".into())),
        Role::SuperAdmin | Role::Comptable | Role::Enseignant => Err(AppError::Forbidden(format!(
            "O papel {} não pode pré-validar nem rejeitar linhas.",
            actor.role.as_str()
        ))),
    }
}

/// Diretor agindo sobre uma entidade do próprio campus.
pub fn require_director_of(actor: &Profile, campus_id: Uuid) -> Result<(), AppError> {
    let own_campus = require_director(actor)?;
    if own_campus != campus_id {
        return Err(AppError::campus_mismatch());
    }
    Ok(())
}

pub fn require_finance(actor: &Profile) -> Result<(), AppError> {
    if actor.role.is_finance() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "O papel {} não pode validar nem pagar faturas.",
            actor.role.as_str()
        )))
    }
}

pub fn require_super_admin(actor: &Profile) -> Result<(), AppError> {
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::DirecteurCampus | Role::Comptable | Role::Enseignant => Err(AppError::Forbidden(
            "Apenas o SUPER_ADMIN pode alterar atribuições de campus.".into(),
        )),
    }
}

/// Faturas visíveis para o ator.
pub fn invoice_scope(actor: &Profile) -> Result<InvoiceScope, AppError> {
    match actor.role {
        Role::SuperAdmin | Role::Comptable => Ok(InvoiceScope::All),
        Role::DirecteurCampus => require_director(actor).map(InvoiceScope::Campus),
        Role::Enseignant => Ok(InvoiceScope::Teacher(actor.id)),
    }
}

pub fn require_read_access(actor: &Profile, invoice: &Invoice) -> Result<(), AppError> {
    match invoice_scope(actor)? {
        InvoiceScope::All => Ok(()),
        InvoiceScope::Campus(campus_id) if campus_id == invoice.campus_id => Ok(()),
        InvoiceScope::Campus(_) => Err(AppError::campus_mismatch()),
        InvoiceScope::Teacher(teacher_id) if teacher_id == invoice.teacher_id => Ok(()),
        InvoiceScope::Teacher(_) => Err(AppError::Forbidden(
            "Um professor só pode consultar as próprias faturas.".into(),
        )),
    }
}

/// Quem pode alterar uma linha ainda pendente: o próprio professor ou o SUPER_ADMIN.
pub fn require_line_editor(actor: &Profile, invoice: &Invoice) -> Result<(), AppError> {
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::Enseignant if actor.id == invoice.teacher_id => Ok(()),
        Role::Enseignant | Role::DirecteurCampus | Role::Comptable => Err(AppError::Forbidden(
            "Apenas o professor dono da fatura pode alterar as linhas.".into(),
        )),
    }
}
