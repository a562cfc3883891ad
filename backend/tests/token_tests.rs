use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use movie_admin::{
    AppError,
    token::{Claims, TokenService},
};
use uuid::Uuid;

const SECRET: &str = "token-test-secret";

fn service() -> TokenService {
    TokenService::new(SECRET, Duration::minutes(60))
}

#[test]
fn test_issue_then_verify_returns_user_id() {
    let tokens = service();
    let user_id = Uuid::new_v4();

    let token = tokens.issue(user_id).unwrap();
    assert_eq!(tokens.verify(&token).unwrap(), user_id);
}

#[test]
fn test_claims_carry_subject_and_lifetime() {
    let tokens = service();
    let user_id = Uuid::new_v4();
    let token = tokens.issue(user_id).unwrap();

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap();

    assert_eq!(data.claims.sub, user_id);
    assert_eq!(data.claims.exp - data.claims.iat, tokens.ttl().num_seconds());
}

#[test]
fn test_expired_token_is_rejected() {
    let tokens = service();
    let issued_at = Utc::now() - tokens.ttl() - Duration::seconds(5);
    let token = tokens.issue_at(Uuid::new_v4(), issued_at).unwrap();

    assert!(matches!(tokens.verify(&token), Err(AppError::InvalidToken)));
}

#[test]
fn test_token_near_expiry_is_still_valid() {
    let tokens = service();
    let user_id = Uuid::new_v4();
    let issued_at = Utc::now() - tokens.ttl() + Duration::seconds(60);
    let token = tokens.issue_at(user_id, issued_at).unwrap();

    assert_eq!(tokens.verify(&token).unwrap(), user_id);
}

#[test]
fn test_tampered_signature_is_rejected() {
    let tokens = service();
    let token = tokens.issue(Uuid::new_v4()).unwrap();

    let (head, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{head}.{flipped}{}", &signature[1..]);

    assert!(matches!(tokens.verify(&tampered), Err(AppError::InvalidToken)));
}

#[test]
fn test_token_from_other_secret_is_rejected() {
    let other = TokenService::new("some-other-secret", Duration::minutes(60));
    let token = other.issue(Uuid::new_v4()).unwrap();

    assert!(matches!(service().verify(&token), Err(AppError::InvalidToken)));
}

#[test]
fn test_malformed_token_is_rejected() {
    let tokens = service();
    for garbage in ["", "not-a-token", "a.b.c"] {
        assert!(
            matches!(tokens.verify(garbage), Err(AppError::InvalidToken)),
            "{garbage:?} should not verify"
        );
    }
}
