// src/services/test_support.rs
//
// Cenário comum aos testes dos serviços: dois campi, um diretor em cada,
// um contador, um super admin e um professor do campus A.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use tracing::Span;
use uuid::Uuid;

use crate::{
    config::AppState,
    db::{memory_store::MemoryWorkflowStore, WorkflowStore},
    models::{
        campus::Campus,
        invoice::{Invoice, InvoiceLine, NewInvoiceLine},
        profile::{Profile, Role},
    },
    services::{auth::AuthService, CampusService, InvoiceService, WorkflowService},
};

pub struct World {
    pub store: MemoryWorkflowStore,
    pub campus_a: Campus,
    pub campus_b: Campus,
    pub director_a: Profile,
    pub director_b: Profile,
    pub accountant: Profile,
    pub admin: Profile,
    pub teacher: Profile,
}

pub fn profile(role: Role, campus_id: Option<Uuid>) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        email: format!("{}@ecole.fr", Uuid::new_v4().simple()),
        full_name: role.as_str().to_lowercase(),
        role,
        campus_id,
        created_at: Utc::now(),
    }
}

pub fn campus(name: &str) -> Campus {
    Campus {
        id: Uuid::new_v4(),
        name: name.into(),
        address: None,
        director_id: None,
        created_at: Utc::now(),
    }
}

pub fn february() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
}

/// Uma linha de uma hora ao preço `amount`, no dia `day` de fevereiro.
pub fn line_input(day: u32, amount: i64) -> NewInvoiceLine {
    NewInvoiceLine {
        date: NaiveDate::from_ymd_opt(2025, 2, day).unwrap(),
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        program: Some("BTS MCO".into()),
        class_name: Some("MCO1".into()),
        description: None,
        quantite_heures: Decimal::ONE,
        prix_unitaire: Decimal::from(amount),
        is_late: false,
    }
}

impl World {
    pub async fn new() -> Self {
        let store = MemoryWorkflowStore::new();

        let mut campus_a = campus("Roquette");
        let mut campus_b = campus("Jaurès");
        let director_a = profile(Role::DirecteurCampus, Some(campus_a.id));
        let director_b = profile(Role::DirecteurCampus, Some(campus_b.id));
        campus_a.director_id = Some(director_a.id);
        campus_b.director_id = Some(director_b.id);

        let accountant = profile(Role::Comptable, None);
        let admin = profile(Role::SuperAdmin, None);
        let teacher = profile(Role::Enseignant, Some(campus_a.id));

        store.insert_campus(campus_a.clone()).await;
        store.insert_campus(campus_b.clone()).await;
        for person in [&director_a, &director_b, &accountant, &admin, &teacher] {
            store.insert_profile(person.clone()).await;
        }

        Self {
            store,
            campus_a,
            campus_b,
            director_a,
            director_b,
            accountant,
            admin,
            teacher,
        }
    }

    pub fn shared_store(&self) -> Arc<dyn WorkflowStore> {
        Arc::new(self.store.clone())
    }

    pub fn span() -> Span {
        tracing::info_span!("test")
    }

    /// Estado dos handlers sobre o armazenamento em memória. O pool nunca
    /// chega a conectar.
    pub fn app_state(&self) -> AppState {
        let store = self.shared_store();
        AppState {
            db_pool: PgPoolOptions::new()
                .connect_lazy("postgres://localhost/campus_invoices_test")
                .unwrap(),
            auth_service: AuthService::new("segredo".into()),
            workflow_service: WorkflowService::new(store.clone(), Self::span()),
            invoice_service: InvoiceService::new(store.clone(), Self::span()),
            campus_service: CampusService::new(store, Self::span()),
        }
    }

    /// Grava direto no armazenamento uma fatura pendente do professor no
    /// campus A, uma linha por valor. Devolve o id da fatura e das linhas.
    pub async fn seed_invoice(&self, amounts: &[i64]) -> (Uuid, Vec<Uuid>) {
        let now = Utc::now();
        let mut invoice = Invoice::new(self.teacher.id, self.campus_a.id, february(), now);
        let lines: Vec<InvoiceLine> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| InvoiceLine::new(&invoice, &line_input(i as u32 + 3, *amount), Decimal::from(*amount), now))
            .collect();
        assert!(invoice.recompute_total(&lines));

        let mut tx = self.store.begin().await.unwrap();
        tx.insert_invoice(&invoice).await.unwrap();
        for line in &lines {
            tx.insert_line(line).await.unwrap();
        }
        tx.commit().await.unwrap();

        (invoice.id, lines.iter().map(|line| line.id).collect())
    }
}
