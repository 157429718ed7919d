//! Session token verification
//!
//! Checks run in a fixed order: structure, header, payload, expiry,
//! signature, actor type. Expiry is checked before the signature so an
//! expired token always reports `Expired`, letting callers tell "sign in
//! again" apart from "tampered token".

use chrono::{DateTime, TimeZone, Utc};
use innotaxi_shared::{ActorType, Identity};

use super::error::TokenError;
use super::jwt::{decode_segment, Claims, Header, SigningKey, ALGORITHM, TOKEN_TYPE};

/// Outcome of a successful verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

impl Verified {
    /// Lifetime left at `now`, `None` once expired
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

/// Token verifier bound to one signing key
#[derive(Clone)]
pub struct TokenVerifier {
    key: SigningKey,
}

impl TokenVerifier {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Verify `token` at `now`
    ///
    /// With `expected` set, a token tagged with a different (or unknown)
    /// actor type is rejected. Untagged tokens are user tokens.
    pub fn verify(
        &self,
        token: &str,
        expected: Option<ActorType>,
        now: DateTime<Utc>,
    ) -> Result<Verified, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_segment, payload_segment, signature_segment] = segments[..] else {
            return Err(TokenError::Malformed("expected three segments"));
        };

        let header: Header = decode_segment(header_segment)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenError::Malformed("header is not base64url JSON"))?;
        if header.typ != TOKEN_TYPE {
            return Err(TokenError::Malformed("unsupported token type"));
        }
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed("unsupported algorithm"));
        }

        let claims: Claims = decode_segment(payload_segment)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(TokenError::Malformed("payload is not base64url JSON with user_id and exp"))?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        let signing_input = &token[..header_segment.len() + 1 + payload_segment.len()];
        let signature_ok = decode_segment(signature_segment)
            .map(|signature| self.key.verify(signing_input, &signature))
            .unwrap_or(false);
        if !signature_ok {
            return Err(TokenError::InvalidSignature);
        }

        let actor = match claims.actor.as_deref() {
            None => ActorType::User,
            Some(name) => name
                .parse::<ActorType>()
                .map_err(|_| TokenError::UnknownOrWrongActorType)?,
        };
        if expected.is_some_and(|expected| expected != actor) {
            return Err(TokenError::UnknownOrWrongActorType);
        }

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::Malformed("exp out of range"))?;

        Ok(Verified {
            identity: Identity::new(actor, claims.user_id),
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{encode_segment, JwtService, TokenKind};
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;

    const SECRET: &str = "verifier-test-secret";

    fn service() -> JwtService {
        JwtService::new(SECRET, 15 * 60, 7 * 86_400)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    /// Sign arbitrary header/payload JSON with the test secret
    fn forge(header: &str, payload: &str) -> String {
        let input = format!("{}.{}", encode_segment(header.as_bytes()), encode_segment(payload.as_bytes()));
        let signature = SigningKey::new(SECRET).sign(&input).unwrap();
        format!("{}.{}", input, encode_segment(&signature))
    }

    fn future_exp() -> i64 {
        now().timestamp() + 600
    }

    #[test]
    fn test_round_trip_returns_identity() {
        let service = service();
        let issued = service.issue(Identity::User(9), TokenKind::Access, now()).unwrap();

        let verified = service.verifier().verify(&issued.token, Some(ActorType::User), now()).unwrap();

        assert_eq!(verified.identity, Identity::User(9));
        assert_eq!(verified.expires_at.timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn test_expired_token_reports_expired() {
        let service = service();
        let issued = service.issue(Identity::User(9), TokenKind::Access, now()).unwrap();
        let later = now() + Duration::minutes(16);

        assert_eq!(
            service.verifier().verify(&issued.token, None, later),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_zero_ttl_token_is_expired_immediately() {
        let service = JwtService::new(SECRET, 0, 0);
        let issued = service.issue(Identity::User(9), TokenKind::Access, now()).unwrap();

        assert_eq!(
            service.verifier().verify(&issued.token, None, now()),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_token_is_valid_until_last_second() {
        let service = service();
        let issued = service.issue(Identity::User(9), TokenKind::Access, now()).unwrap();
        let verifier = service.verifier();

        assert!(verifier.verify(&issued.token, None, issued.expires_at - Duration::seconds(1)).is_ok());
        assert_eq!(verifier.verify(&issued.token, None, issued.expires_at), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_is_reported_before_bad_signature() {
        let issued = JwtService::new("other-secret", 60, 60)
            .issue(Identity::User(9), TokenKind::Access, now())
            .unwrap();
        let later = now() + Duration::minutes(5);

        assert_eq!(service().verifier().verify(&issued.token, None, later), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let issued = JwtService::new("other-secret", 60, 60)
            .issue(Identity::User(9), TokenKind::Access, now())
            .unwrap();

        assert_eq!(
            service().verifier().verify(&issued.token, None, now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let service = service();
        let issued = service.issue(Identity::User(9), TokenKind::Access, now()).unwrap();
        let parts: Vec<&str> = issued.token.split('.').collect();
        let payload = format!(r#"{{"user_id":8,"exp":{},"type":"user"}}"#, future_exp());
        let tampered = format!("{}.{}.{}", parts[0], encode_segment(payload.as_bytes()), parts[2]);

        assert_eq!(
            service.verifier().verify(&tampered, None, now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_undecodable_signature_is_invalid_signature() {
        let service = service();
        let issued = service.issue(Identity::User(9), TokenKind::Access, now()).unwrap();
        let (input, _) = issued.token.rsplit_once('.').unwrap();

        assert_eq!(
            service.verifier().verify(&format!("{}.@@@", input), None, now()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("a.b")]
    #[case("a.b.c.d")]
    fn test_wrong_segment_count_is_malformed(#[case] token: &str) {
        assert!(matches!(
            service().verifier().verify(token, None, now()),
            Err(TokenError::Malformed(_))
        ));
    }

    #[rstest]
    #[case(r#"{"alg":"HS256","typ":"JWS"}"#)]
    #[case(r#"{"alg":"none","typ":"JWT"}"#)]
    #[case(r#"{"alg":"HS512","typ":"JWT"}"#)]
    #[case(r#"{"typ":"JWT"}"#)]
    #[case("not json")]
    fn test_bad_header_is_malformed(#[case] header: &str) {
        let payload = format!(r#"{{"user_id":9,"exp":{}}}"#, future_exp());
        let token = forge(header, &payload);

        assert!(matches!(
            service().verifier().verify(&token, None, now()),
            Err(TokenError::Malformed(_))
        ));
    }

    #[rstest]
    #[case(r#"{"exp":1900000000}"#)]
    #[case(r#"{"user_id":9}"#)]
    #[case(r#"{"user_id":"9","exp":1900000000}"#)]
    #[case(r#"{"user_id":9,"exp":"soon"}"#)]
    #[case("[]")]
    fn test_bad_payload_is_malformed(#[case] payload: &str) {
        let token = forge(r#"{"alg":"HS256","typ":"JWT"}"#, payload);

        assert!(matches!(
            service().verifier().verify(&token, None, now()),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_untagged_token_is_a_user_token() {
        let payload = format!(r#"{{"user_id":5,"exp":{}}}"#, future_exp());
        let token = forge(r#"{"alg":"HS256","typ":"JWT"}"#, &payload);

        let verified = service().verifier().verify(&token, Some(ActorType::User), now()).unwrap();
        assert_eq!(verified.identity, Identity::User(5));
    }

    #[test]
    fn test_driver_token_rejected_in_user_context() {
        let service = service();
        let issued = service.issue(Identity::Driver(3), TokenKind::Access, now()).unwrap();
        let verifier = service.verifier();

        assert_eq!(
            verifier.verify(&issued.token, Some(ActorType::User), now()),
            Err(TokenError::UnknownOrWrongActorType)
        );
        assert_eq!(
            verifier.verify(&issued.token, Some(ActorType::Driver), now()).unwrap().identity,
            Identity::Driver(3)
        );
    }

    #[test]
    fn test_unknown_actor_tag_is_rejected() {
        let payload = format!(r#"{{"user_id":5,"exp":{},"type":"admin"}}"#, future_exp());
        let token = forge(r#"{"alg":"HS256","typ":"JWT"}"#, &payload);

        assert_eq!(
            service().verifier().verify(&token, None, now()),
            Err(TokenError::UnknownOrWrongActorType)
        );
    }

    #[test]
    fn test_remaining_lifetime() {
        let verified = Verified {
            identity: Identity::User(1),
            expires_at: now() + Duration::seconds(90),
        };

        assert_eq!(verified.remaining(now()), Some(std::time::Duration::from_secs(90)));
        assert_eq!(verified.remaining(now() + Duration::seconds(90)), None);
    }

    fn identity_strategy() -> impl Strategy<Value = Identity> {
        prop_oneof![
            any::<u64>().prop_map(Identity::User),
            any::<u64>().prop_map(Identity::Driver),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_issue_then_verify_returns_identity(
            identity in identity_strategy(),
            secret in "[ -~]{1,64}",
            offset in 0i64..1_000_000_000,
        ) {
            let now = now() + Duration::seconds(offset);
            let service = JwtService::new(secret, 60, 86_400);
            let issued = service.issue(identity, TokenKind::Access, now).unwrap();

            let verified = service.verifier().verify(&issued.token, None, now).unwrap();
            prop_assert_eq!(verified.identity, identity);
        }

        #[test]
        fn prop_expired_regardless_of_signature(
            user_id in any::<u64>(),
            past in 1i64..100_000,
            signature in "[A-Za-z0-9_-]{0,43}",
        ) {
            let service = service();
            let issued = service.issue(Identity::User(user_id), TokenKind::Access, now()).unwrap();
            let (input, _) = issued.token.rsplit_once('.').unwrap();
            let token = format!("{}.{}", input, signature);
            let later = issued.expires_at + Duration::seconds(past);

            prop_assert_eq!(service.verifier().verify(&token, None, later), Err(TokenError::Expired));
        }

        #[test]
        fn prop_altered_signature_is_rejected(
            user_id in any::<u64>(),
            signature in "[A-Za-z0-9_-]{1,64}",
        ) {
            let service = service();
            let issued = service.issue(Identity::User(user_id), TokenKind::Access, now()).unwrap();
            let (input, original) = issued.token.rsplit_once('.').unwrap();
            prop_assume!(signature != original);
            let token = format!("{}.{}", input, signature);

            prop_assert_eq!(
                service.verifier().verify(&token, None, now()),
                Err(TokenError::InvalidSignature)
            );
        }
    }
}
