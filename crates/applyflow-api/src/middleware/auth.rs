//! Shared-secret authentication middleware.
//!
//! Checks `Authorization: Bearer <secret>` (or the `X-Api-Secret` header)
//! against the configured secret and answers 401 with a JSON body on a
//! missing or wrong value. When no secret is configured and the service is
//! not in production mode, every request passes. The health endpoint is
//! always open so load balancers can probe without credentials.

use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use log::debug;

use crate::models::error_body;

/// Auth configuration handed down from the server config.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret: Option<String>,
    /// Production mode: a secret must be configured and every request
    /// (except health) must present it
    pub required: bool,
}

impl AuthSettings {
    pub fn disabled() -> Self {
        Self {
            secret: None,
            required: false,
        }
    }
}

/// Paths that never require credentials.
const OPEN_PATHS: &[&str] = &["/v1/health"];

/// Authentication middleware factory.
pub struct SecretAuth {
    settings: Arc<AuthSettings>,
}

impl SecretAuth {
    pub fn new(settings: AuthSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecretAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecretAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecretAuthService {
            service: Rc::new(service),
            settings: self.settings.clone(),
        }))
    }
}

pub struct SecretAuthService<S> {
    service: Rc<S>,
    settings: Arc<AuthSettings>,
}

fn presented_secret(req: &ServiceRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        if let Ok(value) = header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }
    req.headers()
        .get("X-Api-Secret")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
}

impl<S, B> Service<ServiceRequest> for SecretAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let settings = self.settings.clone();

        Box::pin(async move {
            let open = OPEN_PATHS.iter().any(|p| req.path() == *p);
            let authorized = if open {
                true
            } else {
                match &settings.secret {
                    Some(expected) => presented_secret(&req).as_deref() == Some(expected.as_str()),
                    None => !settings.required,
                }
            };

            if !authorized {
                debug!("Rejected unauthenticated request to {}", req.path());
                let (request, _) = req.into_parts();
                let response = HttpResponse::Unauthorized()
                    .json(error_body("Missing or invalid API secret"))
                    .map_into_right_body();
                return Ok(ServiceResponse::new(request, response));
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
