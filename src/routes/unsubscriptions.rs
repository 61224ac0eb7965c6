use actix_web::http::header::ContentType;
use actix_web::{web, HttpResponse};

use super::helpers::{ConfirmFormData, FormData};
use crate::domain::Intent;
use crate::verification::{ProtocolError, VerificationProtocol};

/// Unsubscription page, linked from every digest
pub async fn unsubscribe_form() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>Unsubscribe</title>
</head>
<body>
    <h2>Unsubscribe from the daily comic digest</h2>
    <form action="/unsubscriptions" method="post">
        <label>Email
            <input
                type="email"
                placeholder="Enter your email address"
                name="email"
> </label>
        <button type="submit">Send verification code</button>
    </form>
    <form action="/unsubscriptions/confirm" method="post">
        <label>Email
            <input
                type="email"
                placeholder="Enter your email address"
                name="email"
> </label>
        <label>Code
            <input
                type="text"
                placeholder="Enter the 6-digit code"
                name="code"
> </label>
        <button type="submit">Unsubscribe</button>
    </form>
</body>
</html>"#,
        )
}

/// Unsubscriptions handler
#[tracing::instrument(
    name = "Requesting an unsubscription",
    skip(form, protocol),
    fields(subscriber_email = %form.email)
)]
pub async fn unsubscribe(
    form: web::Form<FormData>,
    protocol: web::Data<VerificationProtocol>,
) -> Result<HttpResponse, ProtocolError> {
    protocol
        .request_action(form.0.email, Intent::Unregister)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Unsubscription confirmation handler
#[tracing::instrument(
    name = "Confirming an unsubscription",
    skip(form, protocol),
    fields(subscriber_email = %form.email)
)]
pub async fn confirm_unsubscription(
    form: web::Form<ConfirmFormData>,
    protocol: web::Data<VerificationProtocol>,
) -> Result<HttpResponse, ProtocolError> {
    let ConfirmFormData { email, code } = form.0;
    protocol
        .confirm_action(email, code, Intent::Unregister)
        .await?;
    Ok(HttpResponse::Ok().finish())
}
