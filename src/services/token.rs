use std::time::Duration;

use axum::http::{header, HeaderMap, Request, Uri};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use uuid::Uuid;

use crate::config::AuthorizationConfig;
use crate::error::{
    Error, InternalError, Result, ResultExt, TOKEN_DECRYPTION, TOKEN_EXPIRED, TOKEN_NOT_FOUND,
    TOKEN_PARSE_CLAIMS, TOKEN_SIGNATURE_INVALID, TOKEN_VERIFICATION,
};

const ALGORITHM: Algorithm = Algorithm::RS256;
const ACCESS_TOKEN_PARAM: &str = "access_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: i64,
}

/// Issues user tokens. Kept as a trait so the users usecase does not depend
/// on the key material.
pub trait TokenProvider: Send + Sync {
    fn generate_user_token(&self, user_id: Uuid) -> Result<String>;
}

/// RS256 token issuer and verifier. The private key is used only for
/// signing; verification needs nothing but the public key.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthorizationConfig) -> Result<Self> {
        let private_key = normalize_pem(&config.private_key);
        let public_key = normalize_pem(&config.public_key);

        let encoding_key =
            EncodingKey::from_rsa_pem(private_key.as_bytes()).context("failed to parse private key")?;
        let decoding_key =
            DecodingKey::from_rsa_pem(public_key.as_bytes()).context("failed to parse public key")?;

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            ttl: config.token_ttl(),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key).context("failed to sign token")
    }

    /// Checks signature, algorithm and expiry and returns the embedded user id.
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.user_id)
            .map_err(|err| {
                tracing::debug!(err = %err, "token rejected");
                Error::from(classify(err.kind()))
            })
    }

    pub fn verified_user_id_from_parts(&self, headers: &HeaderMap, uri: &Uri) -> Result<Uuid> {
        let token = bearer_token(headers, uri).ok_or(TOKEN_NOT_FOUND)?;
        self.verify_token(&token)
    }

    pub fn verified_user_id<B>(&self, request: &Request<B>) -> Result<Uuid> {
        self.verified_user_id_from_parts(request.headers(), request.uri())
    }
}

impl TokenProvider for TokenService {
    fn generate_user_token(&self, user_id: Uuid) -> Result<String> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(1));
        let claims = Claims {
            user_id,
            exp: (Utc::now() + ttl).timestamp(),
        };
        self.sign(&claims)
    }
}

fn classify(kind: &ErrorKind) -> InternalError {
    match kind {
        ErrorKind::InvalidSignature => TOKEN_SIGNATURE_INVALID,
        ErrorKind::ExpiredSignature => TOKEN_EXPIRED,
        ErrorKind::Crypto(_) | ErrorKind::RsaFailedSigning => TOKEN_DECRYPTION,
        ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::MissingRequiredClaim(_) => TOKEN_PARSE_CLAIMS,
        _ => TOKEN_VERIFICATION,
    }
}

/// Token from `Authorization: Bearer <token>`, falling back to the
/// `access_token` query parameter.
fn bearer_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
        });

    from_header
        .or_else(|| {
            form_urlencoded::parse(uri.query()?.as_bytes())
                .find(|(key, _)| key == ACCESS_TOKEN_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|token| !token.is_empty())
}

// Keys passed through env files often carry escaped newlines.
fn normalize_pem(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    const PRIMARY_KEY: &str = include_str!("../testing/keys/primary.key.pem");
    const PRIMARY_PUB: &str = include_str!("../testing/keys/primary.pub.pem");
    const OTHER_KEY: &str = include_str!("../testing/keys/other.key.pem");
    const OTHER_PUB: &str = include_str!("../testing/keys/other.pub.pem");

    fn service(private_key: &str, public_key: &str) -> TokenService {
        TokenService::new(&AuthorizationConfig {
            private_key: private_key.to_string(),
            public_key: public_key.to_string(),
            token_ttl_secs: 3600,
            password_hash_cost: 4,
        })
        .unwrap()
    }

    fn request_with_header(value: &str) -> Request<Body> {
        let mut request = Request::new(Body::empty());
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        request
    }

    #[test]
    fn round_trip_yields_user_id() {
        let tokens = service(PRIMARY_KEY, PRIMARY_PUB);
        let user_id = Uuid::new_v4();
        let token = tokens.generate_user_token(user_id).unwrap();

        assert_eq!(tokens.verify_token(&token).unwrap(), user_id);

        let request = request_with_header(&format!("Bearer {token}"));
        assert_eq!(tokens.verified_user_id(&request).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service(PRIMARY_KEY, PRIMARY_PUB);
        let token = tokens
            .sign(&Claims {
                user_id: Uuid::new_v4(),
                exp: Utc::now().timestamp() - 10,
            })
            .unwrap();

        assert!(tokens.verify_token(&token).unwrap_err().is(&TOKEN_EXPIRED));
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let issuer = service(OTHER_KEY, OTHER_PUB);
        let verifier = service(PRIMARY_KEY, PRIMARY_PUB);
        let token = issuer.generate_user_token(Uuid::new_v4()).unwrap();

        assert!(verifier.verify_token(&token).unwrap_err().is(&TOKEN_SIGNATURE_INVALID));
    }

    #[test]
    fn symmetric_algorithm_is_rejected() {
        let verifier = service(PRIMARY_KEY, PRIMARY_PUB);
        let claims = Claims {
            user_id: Uuid::new_v4(),
            exp: Utc::now().timestamp() + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(PRIMARY_PUB.as_bytes()),
        )
        .unwrap();

        assert!(verifier.verify_token(&token).unwrap_err().is(&TOKEN_VERIFICATION));
    }

    #[test]
    fn garbage_token_fails_verification() {
        let tokens = service(PRIMARY_KEY, PRIMARY_PUB);
        assert!(tokens.verify_token("not-a-token").unwrap_err().is(&TOKEN_VERIFICATION));
    }

    #[test]
    fn missing_token_is_reported() {
        let tokens = service(PRIMARY_KEY, PRIMARY_PUB);
        let err = tokens.verified_user_id(&Request::new(Body::empty())).unwrap_err();
        assert!(err.is(&TOKEN_NOT_FOUND));

        let err = tokens.verified_user_id(&request_with_header("Basic abc")).unwrap_err();
        assert!(err.is(&TOKEN_NOT_FOUND));
    }

    #[test]
    fn token_accepted_from_query() {
        let tokens = service(PRIMARY_KEY, PRIMARY_PUB);
        let user_id = Uuid::new_v4();
        let token = tokens.generate_user_token(user_id).unwrap();

        let request = Request::builder()
            .uri(format!("/books?expand=tags&access_token={token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(tokens.verified_user_id(&request).unwrap(), user_id);
    }

    #[test]
    fn query_token_is_percent_decoded() {
        let tokens = service(PRIMARY_KEY, PRIMARY_PUB);
        let user_id = Uuid::new_v4();
        let token = tokens.generate_user_token(user_id).unwrap();
        let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
        let encoded = encoded.replace('.', "%2E");

        let request = Request::builder()
            .uri(format!("/books?access_token={encoded}&expand=tags"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(tokens.verified_user_id(&request).unwrap(), user_id);
    }

    #[test]
    fn escaped_newlines_in_keys_are_accepted() {
        let escaped_key = PRIMARY_KEY.replace('\n', "\\n");
        let escaped_pub = PRIMARY_PUB.replace('\n', "\\n");
        let tokens = service(&escaped_key, &escaped_pub);
        let user_id = Uuid::new_v4();
        let token = tokens.generate_user_token(user_id).unwrap();
        assert_eq!(tokens.verify_token(&token).unwrap(), user_id);
    }

    #[test]
    fn invalid_keys_fail_construction() {
        let result = TokenService::new(&AuthorizationConfig {
            private_key: "not a key".into(),
            public_key: PRIMARY_PUB.into(),
            token_ttl_secs: 60,
            password_hash_cost: 4,
        });
        assert!(result.is_err());
    }
}
