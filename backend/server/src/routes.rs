use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use tracing::{error, info};

use crate::{
    error::AppError,
    mail::Notifier,
    models::{Ack, Consultation, ConsultationList},
    state::AppState,
    utils::parse_form,
};

pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, AppError> {
    let fields = parse_form(&headers, &body)?;
    info!("Received consultation with {} fields", fields.len());

    #[cfg(feature = "verbose")]
    info!("Form data: {:?}", fields);

    let consultation = Consultation::new(fields);

    state
        .store
        .append(&consultation)
        .await
        .map_err(AppError::SaveFailed)?;

    info!("Saved consultation {}", consultation.id());

    notify_detached(state.notifier.clone(), consultation);

    Ok(Json(Ack::submitted()))
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConsultationList>, AppError> {
    let consultations = state
        .store
        .list_all()
        .await
        .map_err(AppError::FetchFailed)?;

    Ok(Json(consultations.into()))
}

/// The response never waits on the relay, a slow or failing send only shows up in the log.
fn notify_detached(notifier: Arc<dyn Notifier>, consultation: Consultation) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&consultation).await {
            error!("Failed to send notification for {}: {e}", consultation.id());
        }
    });
}
