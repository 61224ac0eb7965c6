use actix_web::{web, HttpResponse};

use super::helpers::{ConfirmFormData, FormData};
use crate::domain::Intent;
use crate::verification::{ProtocolError, VerificationProtocol};

/// Subscriptions handler: mail a verification code to a prospective subscriber
#[tracing::instrument(
    name = "Requesting a subscription",
    skip(form, protocol),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    form: web::Form<FormData>,
    protocol: web::Data<VerificationProtocol>,
) -> Result<HttpResponse, ProtocolError> {
    protocol
        .request_action(form.0.email, Intent::Register)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Subscription confirmation handler
#[tracing::instrument(
    name = "Confirming a subscription",
    skip(form, protocol),
    fields(subscriber_email = %form.email)
)]
pub async fn confirm_subscription(
    form: web::Form<ConfirmFormData>,
    protocol: web::Data<VerificationProtocol>,
) -> Result<HttpResponse, ProtocolError> {
    let ConfirmFormData { email, code } = form.0;
    protocol
        .confirm_action(email, code, Intent::Register)
        .await?;
    Ok(HttpResponse::Ok().finish())
}
