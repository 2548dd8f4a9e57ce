use crate::{
    config::{AppConfig, JwtSettings},
    database::MongoDB,
    models::{
        AuthResponse, AuthUser, ForgotPasswordRequest, LoginRequest, PasswordResetResponse,
        RegisterRequest, ResetPasswordRequest, Role, UpdateDetailsRequest, UpdatePasswordRequest,
        User, UserInfo,
    },
    services::notification_service::{self, Notifier},
    utils::{time::to_bson, AppError},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::Validate;

const RESET_TOKEN_BYTES: usize = 32;
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id (hex)
    pub role: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

// ==================== TOKENS ====================

pub fn generate_jwt(user: &User, jwt: &JwtSettings) -> Result<String, AppError> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::internal("Cannot issue a token for an unsaved user"))?;
    let now = Utc::now();

    let claims = Claims {
        sub: user_id.to_hex(),
        role: user.role.as_str().to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(jwt.expires_in_hours)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: jwt.audience.clone(),
        iss: jwt.issuer.clone(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_ref()),
    )
    .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
}

pub fn verify_token(token: &str, jwt: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[jwt.audience.as_str()]);
    validation.set_issuer(&[jwt.issuer.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        log::debug!("Token rejected: {}", e);
        AppError::unauthorized("Not authorized to access this route")
    })
}

/// Raw password-reset token handed to the user. Only its hash is stored.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn auth_response(user: &User, config: &AppConfig) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        success: true,
        token: generate_jwt(user, &config.jwt)?,
        user: UserInfo::from(user),
    })
}

// ==================== ACCOUNT LOOKUP ====================

/// Loads the user behind a verified token, rejecting deleted or deactivated accounts.
pub async fn load_active_user(db: &MongoDB, user_id: &str) -> Result<AuthUser, AppError> {
    let id = ObjectId::parse_str(user_id)
        .map_err(|_| AppError::unauthorized("Not authorized to access this route"))?;

    let user = db
        .users()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::unauthorized("The user belonging to this token no longer exists"))?;

    if !user.is_active {
        return Err(AppError::unauthorized("Account has been deactivated. Please contact support."));
    }

    AuthUser::from_user(&user).ok_or_else(|| AppError::internal("Stored user has no id"))
}

async fn find_user(db: &MongoDB, id: ObjectId) -> Result<User, AppError> {
    db.users()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

// ==================== OPERATIONS ====================

pub async fn register(
    db: &MongoDB,
    config: &AppConfig,
    notifier: &Notifier,
    request: &RegisterRequest,
) -> Result<AuthResponse, AppError> {
    request.validate()?;

    if request.role == Role::Admin {
        return Err(AppError::validation("You cannot register as an admin"));
    }

    let email = normalize_email(&request.email);
    if db.users().find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::Conflict("User already exists with this email".to_string()));
    }

    let mut user = User {
        id: None,
        name: request.name.trim().to_string(),
        email,
        password: hash(&request.password, DEFAULT_COST)?,
        role: request.role,
        phone: request.phone.clone(),
        is_active: true,
        password_reset_token: None,
        password_reset_expires: None,
        cases: vec![],
        appointments: vec![],
        created_at: BsonDateTime::now(),
    };

    let result = db.users().insert_one(&user).await?;
    user.id = result.inserted_id.as_object_id();

    if let (Role::Client, Some(id)) = (user.role, user.id) {
        notifier.notify(notification_service::welcome(id));
    }

    log::info!("✅ User registered successfully: {} ({})", user.email, user.role);
    auth_response(&user, config)
}

pub async fn login(
    db: &MongoDB,
    config: &AppConfig,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    let (email, password) = match (request.email.as_deref(), request.password.as_deref()) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (normalize_email(email), password)
        }
        _ => return Err(AppError::validation("Please provide email and password")),
    };

    let user = db
        .users()
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::unauthorized("Incorrect email or password"))?;

    if !verify(password, &user.password)? {
        return Err(AppError::unauthorized("Incorrect email or password"));
    }

    if !user.is_active {
        return Err(AppError::unauthorized("Account has been deactivated. Please contact support."));
    }

    auth_response(&user, config)
}

pub async fn me(db: &MongoDB, user: &AuthUser) -> Result<UserInfo, AppError> {
    let user = find_user(db, user.id).await?;
    Ok(UserInfo::from(&user))
}

pub async fn update_details(
    db: &MongoDB,
    user: &AuthUser,
    request: &UpdateDetailsRequest,
) -> Result<UserInfo, AppError> {
    request.validate()?;

    let mut changes = Document::new();
    if let Some(name) = &request.name {
        changes.insert("name", name.trim());
    }
    if let Some(email) = &request.email {
        let email = normalize_email(email);
        let taken = db
            .users()
            .find_one(doc! { "email": &email, "_id": { "$ne": user.id } })
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Duplicate field value entered".to_string()));
        }
        changes.insert("email", email);
    }
    if let Some(phone) = &request.phone {
        changes.insert("phone", phone.as_str());
    }

    if changes.is_empty() {
        return me(db, user).await;
    }

    let updated = db
        .users()
        .find_one_and_update(doc! { "_id": user.id }, doc! { "$set": changes })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(UserInfo::from(&updated))
}

pub async fn update_password(
    db: &MongoDB,
    config: &AppConfig,
    user: &AuthUser,
    request: &UpdatePasswordRequest,
) -> Result<AuthResponse, AppError> {
    request.validate()?;

    let mut stored = find_user(db, user.id).await?;
    if !verify(&request.current_password, &stored.password)? {
        return Err(AppError::unauthorized("Password is incorrect"));
    }

    stored.password = hash(&request.new_password, DEFAULT_COST)?;
    db.users()
        .update_one(doc! { "_id": user.id }, doc! { "$set": { "password": &stored.password } })
        .await?;

    auth_response(&stored, config)
}

pub async fn forgot_password(
    db: &MongoDB,
    config: &AppConfig,
    request: &ForgotPasswordRequest,
) -> Result<PasswordResetResponse, AppError> {
    let email = normalize_email(&request.email);
    let user = db
        .users()
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::not_found("There is no user with that email address"))?;

    let reset_token = generate_reset_token();
    let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

    db.users()
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": {
                "passwordResetToken": hash_token(&reset_token),
                "passwordResetExpires": to_bson(expires),
            } },
        )
        .await?;

    let reset_url = format!(
        "{}/api/auth/resetpassword/{}",
        config.public_base_url.trim_end_matches('/'),
        reset_token
    );

    log::info!("🔑 Password reset token generated for {}", email);

    Ok(PasswordResetResponse {
        success: true,
        message: "Password reset token generated".to_string(),
        reset_token,
        reset_url,
    })
}

pub async fn reset_password(
    db: &MongoDB,
    config: &AppConfig,
    token: &str,
    request: &ResetPasswordRequest,
) -> Result<AuthResponse, AppError> {
    request.validate()?;

    let now = BsonDateTime::now();
    let mut user = db
        .users()
        .find_one(doc! {
            "passwordResetToken": hash_token(token),
            "passwordResetExpires": { "$gt": now },
        })
        .await?
        .ok_or_else(|| AppError::validation("Token is invalid or has expired"))?;

    user.password = hash(&request.password, DEFAULT_COST)?;
    user.password_reset_token = None;
    user.password_reset_expires = None;

    db.users()
        .update_one(
            doc! { "_id": user.id },
            doc! {
                "$set": { "password": &user.password },
                "$unset": { "passwordResetToken": "", "passwordResetExpires": "" },
            },
        )
        .await?;

    auth_response(&user, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn stored_user(role: Role) -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: String::new(),
            role,
            phone: None,
            is_active: true,
            password_reset_token: None,
            password_reset_expires: None,
            cases: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn issued_token_verifies_with_same_settings() {
        let config = test_config();
        let user = stored_user(Role::Lawyer);

        let token = generate_jwt(&user, &config.jwt).unwrap();
        let claims = verify_token(&token, &config.jwt).unwrap();

        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.role, "lawyer");
        assert_eq!(claims.aud, config.jwt.audience);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_rejected_with_other_secret_or_audience() {
        let config = test_config();
        let token = generate_jwt(&stored_user(Role::Client), &config.jwt).unwrap();

        let mut other = config.jwt.clone();
        other.secret = "another-secret".into();
        assert!(verify_token(&token, &other).is_err());

        let mut other = config.jwt.clone();
        other.audience = "someone-else".into();
        assert!(verify_token(&token, &other).is_err());

        assert!(verify_token("not-a-jwt", &config.jwt).is_err());
    }

    #[test]
    fn unsaved_user_cannot_get_token() {
        let mut user = stored_user(Role::Client);
        user.id = None;
        assert!(generate_jwt(&user, &test_config().jwt).is_err());
    }

    #[test]
    fn reset_tokens_are_random_and_url_safe() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43); // 32 bytes, unpadded base64
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let raw = generate_reset_token();
        assert_ne!(hash_token(&raw), raw);
        assert_eq!(hash_token(&raw).len(), 64);
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    fn register_request(email: &str, role: Role) -> RegisterRequest {
        RegisterRequest {
            name: "Test User".into(),
            email: email.into(),
            password: "password123".into(),
            role,
            phone: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn register_login_and_reset_flow() {
        let db = crate::database::test_database().await;
        let config = test_config();
        let (notifier, mut events) = Notifier::channel();
        let email = format!("{}@example.com", Uuid::new_v4());

        let admin = register(&db, &config, &notifier, &register_request(&email, Role::Admin)).await;
        assert!(matches!(admin, Err(AppError::Validation(_))));

        let registered = register(&db, &config, &notifier, &register_request(&email, Role::Client))
            .await
            .unwrap();
        assert!(events.try_recv().is_ok(), "clients get a welcome notification");

        let duplicate = register(&db, &config, &notifier, &register_request(&email, Role::Client)).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let login_ok = login(
            &db,
            &config,
            &LoginRequest { email: Some(email.to_uppercase()), password: Some("password123".into()) },
        )
        .await
        .unwrap();
        assert_eq!(login_ok.user.id, registered.user.id);

        let missing = forgot_password(
            &db,
            &config,
            &ForgotPasswordRequest { email: format!("missing-{}", email) },
        )
        .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let reset = forgot_password(&db, &config, &ForgotPasswordRequest { email: email.clone() })
            .await
            .unwrap();
        assert!(reset.reset_url.ends_with(&reset.reset_token));

        let stored = db.users().find_one(doc! { "email": &email }).await.unwrap().unwrap();
        let stored_hash = stored.password_reset_token.unwrap();
        assert_ne!(stored_hash, reset.reset_token);
        assert_eq!(stored_hash, hash_token(&reset.reset_token));

        reset_password(
            &db,
            &config,
            &reset.reset_token,
            &ResetPasswordRequest { password: "new-password".into() },
        )
        .await
        .unwrap();

        let reused = reset_password(
            &db,
            &config,
            &reset.reset_token,
            &ResetPasswordRequest { password: "another-one".into() },
        )
        .await;
        assert!(matches!(reused, Err(AppError::Validation(_))));
    }
}
