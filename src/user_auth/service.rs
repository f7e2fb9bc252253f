use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::MemberId;
use crate::member::{Member, MemberRepository, NewMember};
use crate::network::model::Side;
use crate::network::placement::PlacementService;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (member_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

impl Claims {
    pub fn member_id(&self) -> MemberId {
        self.sub.parse().unwrap_or_default()
    }
}

/// Member Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Alice Johnson")]
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[schema(example = "alice@example.com")]
    #[validate(email)]
    pub email: String,
    #[schema(example = "9900000001")]
    #[validate(length(min = 7, max = 15))]
    pub mobile: String,
    #[schema(example = "password123")]
    #[validate(length(min = 8))]
    pub password: String,
    /// Referral code of the sponsoring member, if any
    #[schema(example = "AU000003")]
    pub sponsor_code: Option<String>,
    /// Requested leg under the sponsor: "left" | "right"
    #[schema(example = "left")]
    pub preferred_side: Option<String>,
}

/// Member Login Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice@example.com")]
    #[validate(email)]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    pub referral_code: String,
}

pub struct UserAuthService {
    db: Pool<Postgres>,
    placement: Arc<PlacementService>,
    jwt_secret: String,
    token_ttl_hours: i64,
}

impl UserAuthService {
    pub fn new(
        db: Pool<Postgres>,
        placement: Arc<PlacementService>,
        jwt_secret: String,
        token_ttl_hours: i64,
    ) -> Self {
        Self {
            db,
            placement,
            jwt_secret,
            token_ttl_hours,
        }
    }

    /// Register a new member: profile + wallet + tree placement.
    ///
    /// The first member ever registered becomes the platform root. A
    /// sponsorless signup afterwards is placed under the root by spillover.
    pub async fn register(&self, req: RegisterRequest) -> Result<MemberId> {
        // 1. Resolve sponsor by referral code
        let sponsor: Option<Member> = match &req.sponsor_code {
            Some(code) => Some(
                MemberRepository::get_by_referral_code(&self.db, code)
                    .await
                    .context("Sponsor lookup failed")?
                    .ok_or_else(|| anyhow::anyhow!("Sponsor code not found"))?,
            ),
            None => None,
        };

        let preferred_side = req
            .preferred_side
            .as_deref()
            .and_then(Side::parse)
            .or_else(|| sponsor.as_ref().and_then(|s| s.preferred_side));

        // 2. Hash password
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Hashing failed: {}", e))?
            .to_string();

        // 3. Allocate a unique referral code
        let referral_code = self.generate_referral_code().await?;

        // 4. Insert member + wallet
        let new = NewMember {
            name: req.name,
            email: req.email,
            mobile: req.mobile,
            password_hash,
            referral_code,
            sponsor_id: sponsor.as_ref().map(|s| s.id),
            sponsor_name: sponsor.as_ref().map(|s| s.name.clone()),
            preferred_side,
        };
        let member_id = MemberRepository::create(&self.db, &new)
            .await
            .context("Failed to insert member")?;

        // 5. Place in the binary tree
        let side = preferred_side.unwrap_or(Side::Left);
        match (&sponsor, self.placement.root().await?) {
            (Some(s), _) => {
                self.placement.place_member(member_id, s.id, side).await?;
            }
            (None, Some(root)) => {
                self.placement.place_member(member_id, root, side).await?;
            }
            (None, None) => {
                self.placement.bootstrap_root(member_id).await?;
            }
        }

        Ok(member_id)
    }

    /// Login member and issue JWT
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse> {
        // 1. Find credentials by email
        let (member_id, password_hash) = MemberRepository::credentials_by_email(&self.db, &req.email)
            .await
            .context("DB query failed")?
            .ok_or_else(|| anyhow::anyhow!("Invalid email or password"))?;

        // 2. Verify password
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| anyhow::anyhow!("Invalid email or password"))?;

        // 3. Generate JWT
        let token = self.issue_token(member_id)?;

        let member = MemberRepository::get_by_id(&self.db, member_id)
            .await
            .context("Member lookup failed")?
            .ok_or_else(|| anyhow::anyhow!("Member record missing"))?;

        Ok(AuthResponse {
            token,
            member_id,
            name: member.name,
            email: member.email,
            referral_code: member.referral_code,
        })
    }

    pub fn issue_token(&self, member_id: MemberId) -> Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(self.token_ttl_hours))
            .context("valid timestamp")?
            .timestamp();

        let claims = Claims {
            sub: member_id.to_string(),
            exp: expiration as usize,
            iat: Utc::now().timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .context("Failed to generate token")
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Random "AU" + 6 digits, retried on the rare collision.
    async fn generate_referral_code(&self) -> Result<String> {
        for _ in 0..8 {
            let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
            let code = format!("AU{:06}", n);
            if MemberRepository::get_by_referral_code(&self.db, &code)
                .await
                .context("Referral code lookup failed")?
                .is_none()
            {
                return Ok(code);
            }
        }
        Err(anyhow::anyhow!("Could not allocate a referral code"))
    }
}
