use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use courier_core::jobs::{
    self, HelpOrder, HelpOrderStudent, QuestionAnsweredMail, RegistrationMail,
};
use courier_core::mail::LogMailer;
use courier_core::{
    InMemoryStore, JobId, QueueClient, QueueStore, StoreConfig, WorkerConfig, WorkerGroup,
};

/// Logging for the worker process; `RUST_LOG` overrides the default level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn all_terminal(store: &Arc<dyn QueueStore>, ids: &[JobId]) -> bool {
    for id in ids {
        match store.fetch(*id).await {
            Ok(Some(record)) if record.status.is_terminal() => {}
            _ => return false,
        }
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // (A) store, registry, client
    let store: Arc<dyn QueueStore> = Arc::new(InMemoryStore::new(StoreConfig::default()));
    let registry = Arc::new(jobs::mail_registry(Arc::new(LogMailer))?);
    let client = QueueClient::new(Arc::clone(&store));

    // (B) dispatchers
    let workers = WorkerGroup::spawn(
        2,
        Arc::clone(&store),
        registry,
        WorkerConfig::default(),
    );

    // (C) what request handlers would enqueue after committing their
    // primary mutation
    let end_date = (chrono::Utc::now() + chrono::Months::new(3)).to_rfc3339();
    let registration = client
        .enqueue(&RegistrationMail {
            student_name: "Ana Souza".into(),
            student_email: "ana@example.com".into(),
            plan_title: "Gold".into(),
            end_date,
            plan_price: 119.0,
            total_price: 357.0,
        })
        .await?;

    let answered = client
        .enqueue(&QuestionAnsweredMail {
            help_order: HelpOrder {
                id: 1,
                question: "Posso treinar aos domingos?".into(),
                answer: "Sim, das 8h às 14h.".into(),
                answer_at: chrono::Utc::now().to_rfc3339(),
                student: HelpOrderStudent {
                    name: "Bruno Lima".into(),
                    email: "bruno@example.com".into(),
                },
            },
        })
        .await?;

    tracing::info!(%registration, %answered, "jobs enqueued");

    // (D) wait for both records to reach a terminal state
    let ids = [registration, answered];
    while !all_terminal(&store, &ids).await {
        sleep(Duration::from_millis(50)).await;
    }

    let counts = store.counts().await?;
    tracing::info!(?counts, "all jobs finished");

    // (E) stop taking claims and wait for the dispatchers
    workers.shutdown_and_join().await;
    Ok(())
}
