use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::{Error as JwtError, ErrorKind as JwtErrorKind},
    DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{self, FromRequest},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::common::Rights;
use crate::model::db::User;
use crate::model::store::Id;

use super::user::{AnyUser, Clearance};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with specific
/// rights. The type parameter is the clearance a request guard demands;
/// issuing and signing are clearance-agnostic.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    id: Id,
    #[serde(rename = "rgt")]
    rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

// `Derive(Clone)` would demand `U: Clone`, which the markers don't need.
impl<U> Clone for AuthToken<U> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            rights: self.rights,
            phantom: PhantomData,
        }
    }
}

impl<U> Copy for AuthToken<U> {}

impl AuthToken<AnyUser> {
    /// Issue a token for the given account, with rights derived from its
    /// role.
    pub fn issue(user: &User) -> Self {
        Self {
            id: user.id,
            rights: user.role.rights(),
            phantom: PhantomData,
        }
    }
}

impl<U> AuthToken<U> {
    /// Get the user ID.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the user's rights.
    pub fn rights(&self) -> Rights {
        self.rights
    }

    /// Sign this token into its JWT form, expiring after the configured TTL.
    pub fn encode(&self, config: &Config) -> String {
        let claims = Claims {
            token: *self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .unwrap() // Infallible.
    }

    /// Wrap the signed token in the auth cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        Cookie::build(AUTH_TOKEN_COOKIE, self.encode(config))
            .max_age(time::Duration::seconds(config.auth_ttl().num_seconds()))
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Decode and verify a signed token.
    fn decode(token: &str, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: Clearance,
{
    type Error = JwtError;

    /// Pull the token from the `Authorization: Bearer` header or the auth
    /// cookie, verify it, and check it clears the demanded level.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap(); // Valid as `Config` is always managed

        let raw = req
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(str::to_string)
            .or_else(|| {
                req.cookies()
                    .get(AUTH_TOKEN_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            });
        let Some(raw) = raw else {
            return request::Outcome::Failure((
                Status::Unauthorized,
                JwtErrorKind::InvalidToken.into(),
            ));
        };

        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => return request::Outcome::Failure((Status::Unauthorized, e)),
        };

        if U::permits(token.rights) {
            request::Outcome::Success(token)
        } else {
            // Fall through so under-privileged callers see the same 404 as
            // everyone else probing for hidden routes.
            request::Outcome::Forward(())
        }
    }
}
