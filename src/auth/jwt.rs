use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, state::AppState};

/// Verification half of the provider's token keys. Tokens are only ever issued by
/// the provider, never by this service.
#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Authenticated caller identity, passed explicitly into every repository call.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthUser {
    /// Denormalized author name stamped onto recipes.
    pub fn author_name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Anonymous")
    }
}

impl From<Claims> for AuthUser {
    fn from(c: Claims) -> Self {
        Self {
            uid: c.sub,
            display_name: c.name,
            email: c.email,
            photo_url: c.picture,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Auth("Invalid Authorization header".into()))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                return Err(AppError::Auth("Invalid or expired token".into()));
            }
        };

        if claims.sub.trim().is_empty() {
            return Err(AppError::Auth("Token has no subject".into()));
        }

        Ok(AuthUser::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    use super::*;

    fn cfg(issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: "dev-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    fn sign(cfg: &JwtConfig, sub: &str, name: Option<&str>) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: sub.into(),
            iat: now,
            exp: now + 300,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
            name: name.map(Into::into),
            email: None,
            picture: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verify_accepts_provider_token() {
        let cfg = cfg("test-issuer", "test-aud");
        let token = sign(&cfg, "uid-1", Some("Ada"));
        let claims = JwtKeys::from(&cfg).verify(&token).expect("verify token");
        assert_eq!(claims.sub, "uid-1");
        assert_eq!(claims.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = cfg("good-iss", "good-aud");
        let bad = cfg("bad-iss", "bad-aud");
        let token = sign(&good, "uid-1", None);
        assert!(JwtKeys::from(&bad).verify(&token).is_err());
    }

    #[test]
    fn author_name_falls_back_to_anonymous() {
        let mut user = AuthUser {
            uid: "u".into(),
            display_name: None,
            email: None,
            photo_url: None,
        };
        assert_eq!(user.author_name(), "Anonymous");
        user.display_name = Some("   ".into());
        assert_eq!(user.author_name(), "Anonymous");
        user.display_name = Some(" Ada ".into());
        assert_eq!(user.author_name(), "Ada");
    }

    async fn extract(state: &AppState, header: Option<String>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/feed");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn extractor_reads_bearer_token() {
        let state = AppState::fake();
        let token = sign(&state.config.jwt, "uid-7", Some("Grace"));
        let user = extract(&state, Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.uid, "uid-7");
        assert_eq!(user.author_name(), "Grace");
    }

    #[tokio::test]
    async fn extractor_rejects_missing_or_malformed_header() {
        let state = AppState::fake();
        let err = extract(&state, None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = extract(&state, Some("Token abc".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = extract(&state, Some("Bearer not-a-jwt".into())).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token");
    }
}
