/// HTTP middleware for blog-service
///
/// Bearer-token authentication: a valid RS256 token puts the requester's
/// `UserId` into the request extensions. Requests without an `Authorization`
/// header pass through anonymously so that handlers can answer with their own
/// "Unauthorized!" result; a header that is present but invalid is rejected
/// here with 401.
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

/// Extracted user identifier stored in request extensions after auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: i64,
}

/// Validates bearer tokens against a configured RS256 public key.
#[derive(Clone)]
pub struct JwtAuth {
    decoding_key: Option<Arc<DecodingKey>>,
}

impl JwtAuth {
    pub fn from_public_key_pem(pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())?;
        Ok(Self {
            decoding_key: Some(Arc::new(key)),
        })
    }

    /// No key configured: every bearer token is rejected.
    pub fn disabled() -> Self {
        Self { decoding_key: None }
    }

    fn validate(&self, token: &str) -> Result<UserId, &'static str> {
        let key = self
            .decoding_key
            .as_ref()
            .ok_or("Authentication is not configured")?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(token, key, &validation)
            .map_err(|_| "Invalid or expired token")?;

        Uuid::parse_str(&data.claims.sub)
            .map(UserId)
            .map_err(|_| "Invalid user ID")
    }
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthService {
            service: Rc::new(service),
            auth: self.clone(),
        }))
    }
}

pub struct JwtAuthService<S> {
    service: Rc<S>,
    auth: JwtAuth,
}

impl<S, B> Service<ServiceRequest> for JwtAuthService<S>
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
        let auth = self.auth.clone();

        Box::pin(async move {
            let header = match req.headers().get("Authorization") {
                None => return service.call(req).await,
                Some(value) => value
                    .to_str()
                    .map_err(|_| ErrorUnauthorized("Invalid Authorization header"))?,
            };

            let token =
                bearer_token(header).ok_or_else(|| ErrorUnauthorized("Invalid Authorization scheme"))?;

            let user_id = auth.validate(token).map_err(|reason| {
                tracing::debug!(reason, "bearer token rejected");
                ErrorUnauthorized(reason)
            })?;

            req.extensions_mut().insert(user_id);

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| ErrorUnauthorized("User ID missing")),
        )
    }
}
