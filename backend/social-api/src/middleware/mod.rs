/// HTTP middleware for social-api
///
/// [`BearerAuth`] resolves an `Authorization: Bearer <token>` header once per
/// request and records the outcome in the request extensions. Handlers that
/// need an authenticated caller take an [`Actor`] argument; public handlers
/// simply don't, so a bad token never breaks a public route.
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::SocialGraphService;

/// Authenticated caller, extracted from request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub Uuid);

/// Why a request carried no usable credential
#[derive(Debug, Clone)]
struct AuthFailure(String);

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub struct BearerAuth;

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthService {
            service: Rc::new(service),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let header = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .map(str::to_owned);

            if let Some(header) = header {
                let outcome = match bearer_token(&header) {
                    None => Err("Invalid Authorization scheme".to_string()),
                    Some(token) => match req.app_data::<web::Data<SocialGraphService>>() {
                        Some(graph) => graph.authenticate(token).map_err(|e| match e {
                            AppError::InvalidCredential(reason) => reason,
                            other => other.to_string(),
                        }),
                        None => Err("Authentication is not available".to_string()),
                    },
                };

                match outcome {
                    Ok(user_id) => {
                        req.extensions_mut().insert(Actor(user_id));
                    }
                    Err(reason) => {
                        req.extensions_mut().insert(AuthFailure(reason));
                    }
                }
            }

            service.call(req).await
        })
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let extensions = req.extensions();
        let result = match extensions.get::<Actor>() {
            Some(actor) => Ok(*actor),
            None => match extensions.get::<AuthFailure>() {
                Some(AuthFailure(reason)) => Err(AppError::InvalidCredential(reason.clone())),
                None => Err(AppError::InvalidCredential(
                    "No token provided".to_string(),
                )),
            },
        };
        ready(result)
    }
}
