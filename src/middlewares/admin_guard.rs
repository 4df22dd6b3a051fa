use crate::error::AppError;
use actix_web::http::Method;
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;

pub const ADMIN_PASSWORD_HEADER: &str = "X-Admin-Password";

/// Rejects requests that do not carry the configured admin password.
pub struct AdminGuard {
    password: Rc<str>,
}

impl AdminGuard {
    pub fn new(password: String) -> Self {
        Self {
            password: Rc::from(password),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardService {
            service,
            password: self.password.clone(),
        }))
    }
}

pub struct AdminGuardService<S> {
    service: S,
    password: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for AdminGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // let CORS preflight through
        if req.method() == Method::OPTIONS {
            return Box::pin(self.service.call(req));
        }

        let supplied = req
            .headers()
            .get(ADMIN_PASSWORD_HEADER)
            .and_then(|v| v.to_str().ok());

        match supplied {
            Some(p) if p == &*self.password => Box::pin(self.service.call(req)),
            Some(_) => {
                log::warn!("Rejected admin request to {}: wrong password", req.path());
                let error = AppError::AuthError("Wrong admin password".to_string());
                Box::pin(async move { Err(error.into()) })
            }
            None => {
                let error = AppError::AuthError("Missing admin password".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}
