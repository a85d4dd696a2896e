use crate::account::error::AccountError;
use crate::account::session::SessionStore;
use crate::account::usecase::{AccountUseCase, AccountUseCaseImpl};
use crate::auth::bearer_token;
use crate::error::ApiError;
use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use shared::models::account::{AuthUser, Credentials, SessionResponse};
use shared::result::ActionFailure;
use uuid::Uuid;

async fn open_session(
    sessions: &dyn SessionStore,
    user: AuthUser,
) -> Result<SessionResponse, AccountError> {
    let session_id = Uuid::new_v4().to_string();
    sessions.set_session(&session_id, &user).await.map_err(|e| {
        error!("Session store error while opening session: user_id={} error={}", user.id, e);
        AccountError::SessionError(e)
    })?;
    info!("Session opened: user_id={}", user.id);
    Ok(SessionResponse { session_id, user })
}

fn account_failure(err: AccountError) -> Result<HttpResponse, ApiError> {
    match err {
        AccountError::Validation(errors) => {
            Ok(HttpResponse::BadRequest().json(ActionFailure::validation(errors)))
        }
        other => Err(other.into()),
    }
}

#[post("/sign-up")]
pub async fn sign_up_handler(
    credentials: web::Json<Credentials>,
    accounts: web::Data<AccountUseCaseImpl>,
    sessions: web::Data<dyn SessionStore>,
) -> Result<HttpResponse, ApiError> {
    let user = match accounts.sign_up(credentials.into_inner()).await {
        Ok(user) => user,
        Err(e) => return account_failure(e),
    };
    match open_session(sessions.get_ref(), user).await {
        Ok(response) => Ok(HttpResponse::Created().json(response)),
        Err(e) => account_failure(e),
    }
}

#[post("/sign-in")]
pub async fn sign_in_handler(
    credentials: web::Json<Credentials>,
    accounts: web::Data<AccountUseCaseImpl>,
    sessions: web::Data<dyn SessionStore>,
) -> Result<HttpResponse, ApiError> {
    let user = match accounts.sign_in(credentials.into_inner()).await {
        Ok(user) => user,
        Err(e) => return account_failure(e),
    };
    match open_session(sessions.get_ref(), user).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => account_failure(e),
    }
}

#[post("/sign-out")]
pub async fn sign_out_handler(
    req: HttpRequest,
    sessions: web::Data<dyn SessionStore>,
) -> Result<HttpResponse, ApiError> {
    let Some(session_id) = bearer_token(req.headers()) else {
        warn!("Sign-out attempt without Authorization header");
        return Err(ApiError::bad_request("Missing Authorization header"));
    };

    sessions.delete_session(&session_id).await.map_err(|e| {
        error!("Session store error during sign-out: {}", e);
        ApiError::from(AccountError::SessionError(e))
    })?;
    info!("Session closed");
    Ok(HttpResponse::NoContent().finish())
}
