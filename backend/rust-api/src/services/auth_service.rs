use crate::error::ApiError;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::user::{
    AuthResponse, LoginRequest, RegisterRequest, User, UserProfile, UserRole,
};
use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use super::is_duplicate_key_error;

pub struct AuthService {
    mongo: Database,
    jwt_service: JwtService,
    token_ttl_seconds: i64,
}

impl AuthService {
    pub fn new(mongo: Database, jwt_service: JwtService, token_ttl_seconds: i64) -> Self {
        Self {
            mongo,
            jwt_service,
            token_ttl_seconds,
        }
    }

    /// Hash a password using bcrypt with the default cost
    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        Ok(hash(password, DEFAULT_COST).context("Failed to hash password")?)
    }

    /// Verify a password against a hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        Ok(verify(password, hash).context("Failed to verify password")?)
    }

    /// Register a new user
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ApiError> {
        // Students and instructors may self-register; admin is never
        // self-assigned.
        let role = match req.role.unwrap_or_default() {
            UserRole::Admin => {
                return Err(ApiError::forbidden("Admin accounts cannot be self-assigned"))
            }
            role => role,
        };

        let users_collection = self.mongo.collection::<User>("users");

        let existing_user = users_collection
            .find_one(doc! { "email": &req.email })
            .await
            .context("Failed to check existing user")?;

        if existing_user.is_some() {
            return Err(ApiError::conflict("User with this email already exists"));
        }

        let password_hash = self.hash_password(&req.password)?;

        let now = Utc::now();
        let user = User {
            id: None, // MongoDB will generate
            email: req.email,
            password_hash,
            name: req.name,
            role,
            created_at: now,
            updated_at: now,
        };

        // The unique index on email closes the check-then-insert race.
        let insert_result = match users_collection.insert_one(&user).await {
            Ok(result) => result,
            Err(err) if is_duplicate_key_error(&err) => {
                return Err(ApiError::conflict("User with this email already exists"))
            }
            Err(err) => return Err(anyhow::Error::new(err).context("Failed to insert user").into()),
        };

        let user_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted user ID"))?;

        let token = self.generate_access_token(&user_id, role)?;

        let mut user_with_id = user;
        user_with_id.id = Some(user_id);

        tracing::info!(user_id = %user_id.to_hex(), role = role.as_str(), "User registered");

        Ok(AuthResponse {
            token,
            user: UserProfile::from(user_with_id),
        })
    }

    /// Login user with email and password
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        let users_collection = self.mongo.collection::<User>("users");

        let user = users_collection
            .find_one(doc! { "email": &req.email })
            .await
            .context("Failed to query user")?
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(email = %req.email, "Failed login attempt: invalid password");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }

        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("User document missing _id"))?;

        let token = self.generate_access_token(&user_id, user.role)?;

        tracing::info!(user_id = %user_id.to_hex(), "Successful login");

        Ok(AuthResponse {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Profile for the authenticated subject (`GET /api/auth/me`)
    pub async fn current_profile(&self, claims: &JwtClaims) -> Result<UserProfile, ApiError> {
        let object_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::unauthorized("Invalid token subject"))?;

        let users_collection = self.mongo.collection::<User>("users");
        let user = users_collection
            .find_one(doc! { "_id": object_id })
            .await
            .context("Failed to query user")?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

        Ok(UserProfile::from(user))
    }

    /// Generate JWT access token
    fn generate_access_token(&self, user_id: &ObjectId, role: UserRole) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.token_ttl_seconds);

        let claims = JwtClaims {
            sub: user_id.to_hex(),
            role,
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        self.jwt_service
            .generate_token(claims)
            .map_err(|e| anyhow::anyhow!("Failed to generate token: {}", e).into())
    }
}
