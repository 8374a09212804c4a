use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use redis::AsyncCommands;
use sea_orm::*;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::{
        config::Config,
        constants::*,
        enums::AdminRole,
        error::AppError,
    },
    dtos::{
        auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
        user::UserProfile,
    },
    entity::{roles, users},
    services::map_write_error,
    state::AppState,
    utils::{limiter::check_rate_limit, now},
};

#[inline]
fn refresh_key(token: &str) -> String {
    format!("{}{}", REDIS_PREFIX_REFRESH, token)
}
/// Redis 中的黑名单键，鉴权中间件同样使用
#[inline]
pub fn blacklist_key(token: &str) -> String {
    format!("{}{}", REDIS_PREFIX_BLACKLIST, token)
}

/// 生成访问令牌（Access Token）。纯函数，只负责根据用户信息签发 JWT。
/// 令牌包含用户 ID、用户名、角色以及子管理员绑定的权限角色。
pub fn generate_access_token(config: &Config, user: &users::Model) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::seconds(config.jwt_expiration)).timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.to_string(),
        role_id: user.role_id.map(|id| id.to_string()),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token generation failed: {}", e)))
}

/// 校验签名与过期时间并解析声明
pub fn decode_access_token(config: &Config, token: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("⚠️ Token validation failed: {}", e);
            AppError::AuthError("Invalid or expired token".to_string())
        })
}

/// 创建后台账号。sub-admin 必须绑定一个存在的权限角色。
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<UserProfile, AppError> {
    let role_id = match (req.role, req.role_id) {
        (AdminRole::SubAdmin, None) => {
            return Err(AppError::BadRequest("A sub-admin requires role_id".to_string()));
        }
        (_, Some(role_id)) => {
            let exists = roles::Entity::find_by_id(role_id).count(&state.db).await?;
            if exists == 0 {
                return Err(AppError::BadRequest(format!("Role {} not found", role_id)));
            }
            Some(role_id)
        }
        (_, None) => None,
    };

    let user = insert_user(&state.db, req, role_id).await?;
    tracing::info!("👤 Registered {} ({})", user.username, user.role);
    Ok(user.into())
}

/// 首次启动时创建超级管理员。users 表非空时不做任何事，返回 `None`。
pub async fn bootstrap_super_admin(
    db: &DatabaseConnection,
    username: &str,
    password: &SecretString,
) -> Result<Option<UserProfile>, AppError> {
    if users::Entity::find().count(db).await? > 0 {
        return Ok(None);
    }

    let req = RegisterRequest {
        username: username.trim().to_string(),
        password: password.expose_secret().to_string(),
        phone: None,
        role: AdminRole::SuperAdmin,
        role_id: None,
    };
    req.validate()?;

    let user = insert_user(db, req, None).await?;
    tracing::info!("👑 Bootstrapped super-admin {}", user.username);
    Ok(Some(user.into()))
}

/// 密码使用 Argon2 + 随机盐哈希后落库
async fn insert_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
    role_id: Option<Uuid>,
) -> Result<users::Model, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(format!("Hash failed: {}", e)))?
        .to_string();

    let timestamp = now();
    users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(req.username),
        password_hash: Set(password_hash),
        phone: Set(req.phone),
        role: Set(req.role),
        role_id: Set(role_id),
        is_active: Set(true),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
    .insert(db)
    .await
    .map_err(|e| map_write_error(e, "Username or Phone already exists"))
}

/// 登录：支持用户名或手机号。签发访问令牌，刷新令牌存入 Redis。
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    // 找不到用户与密码错误返回同一个错误，避免泄露账号是否存在
    let user = users::Entity::find()
        .filter(
            Condition::any()
                .add(users::Column::Username.eq(&req.account))
                .add(users::Column::Phone.eq(&req.account)),
        )
        .one(&state.db)
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalServerError("Auth failed".to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::AuthError("Invalid credentials".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("Account is disabled".to_string()));
    }

    let access_token = generate_access_token(&state.config, &user)?;
    let refresh_token = Uuid::new_v4().to_string();

    let mut redis = state.redis.clone();
    let _: () = redis
        .set_ex(
            refresh_key(&refresh_token),
            user.id.to_string(),
            state.config.refresh_token_expiration as u64,
        )
        .await?;

    tracing::info!("🔑 {} logged in", user.username);
    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

/// 刷新令牌轮换：每个刷新令牌只能使用一次，使用后标记为 USED 并在宽限期后过期。
/// 重复使用视为泄露，返回 409。
pub async fn refresh(state: &AppState, old_token: String) -> Result<LoginResponse, AppError> {
    let redis_key_old = refresh_key(&old_token);
    let mut redis = state.redis.clone();

    let user_id_raw: String = redis
        .get(&redis_key_old)
        .await
        .map_err(|_| AppError::AuthError("Invalid or expired refresh token".to_string()))?;

    let (user_id, is_used) = if let Some(stripped) = user_id_raw.strip_prefix(REDIS_PREFIX_USED) {
        (stripped, true)
    } else {
        (user_id_raw.as_str(), false)
    };

    check_rate_limit(&state.redis, "refresh_token", user_id, 10, 60).await?;

    if is_used {
        tracing::warn!("🚨 Refresh token reused! User: {}", user_id);
        return Err(AppError::Conflict("Token reused. Please login again.".to_string()));
    }

    let uid = Uuid::parse_str(user_id)
        .map_err(|_| AppError::InternalServerError("ID error".to_string()))?;
    let user = users::Entity::find_by_id(uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    if !user.is_active {
        return Err(AppError::Forbidden("User inactive".to_string()));
    }

    // 宽限期内并发的刷新请求仍会读到 USED 标记
    let used_val = format!("{}{}", REDIS_PREFIX_USED, user_id);
    let _: () = redis.set_ex(&redis_key_old, used_val, ROTATION_GRACE_PERIOD).await?;

    let new_access = generate_access_token(&state.config, &user)?;
    let new_refresh = Uuid::new_v4().to_string();

    let _: () = redis
        .set_ex(
            refresh_key(&new_refresh),
            user_id,
            state.config.refresh_token_expiration as u64,
        )
        .await?;

    Ok(LoginResponse {
        access_token: new_access,
        refresh_token: new_refresh,
    })
}

/// 登出：把访问令牌加入黑名单，过期时间与令牌剩余有效期一致。无效令牌直接忽略。
pub async fn logout(state: &AppState, token: &str) -> Result<(), AppError> {
    if let Ok(claims) = decode_access_token(&state.config, token) {
        let ttl = claims.exp as i64 - Utc::now().timestamp();

        if ttl > 0 {
            let mut redis = state.redis.clone();
            let _: () = redis.set_ex(blacklist_key(token), "logout", ttl as u64).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, memory_db};

    fn config(secret: &str, exp: i64) -> Config {
        Config {
            jwt_secret: SecretString::from(secret.to_string()),
            jwt_expiration: exp,
            ..test_support::config("uploads")
        }
    }

    fn user(role: AdminRole, role_id: Option<Uuid>) -> users::Model {
        let ts = now();
        users::Model {
            id: Uuid::new_v4(),
            username: "ops".into(),
            password_hash: String::new(),
            phone: None,
            role,
            role_id,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn access_token_carries_role_and_binding() {
        let cfg = config("test-secret", 3600);
        let role_id = Uuid::new_v4();
        let u = user(AdminRole::SubAdmin, Some(role_id));

        let token = generate_access_token(&cfg, &u).unwrap();
        let claims = decode_access_token(&cfg, &token).unwrap();

        assert_eq!(claims.sub, u.id.to_string());
        assert_eq!(claims.role, "sub-admin");
        assert_eq!(claims.role_id, Some(role_id.to_string()));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let admin = user(AdminRole::Admin, None);
        let token = generate_access_token(&config("one", 3600), &admin).unwrap();
        let decoded = decode_access_token(&config("two", 3600), &token);
        assert!(matches!(decoded, Err(AppError::AuthError(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        // 超出 jsonwebtoken 默认 60 秒的时钟偏差容忍
        let cfg = config("secret", -120);
        let token = generate_access_token(&cfg, &user(AdminRole::Admin, None)).unwrap();
        assert!(decode_access_token(&cfg, &token).is_err());
    }

    #[tokio::test]
    async fn super_admin_is_bootstrapped_once() {
        let db = memory_db().await;
        let password = SecretString::from("change-me".to_string());

        let created = bootstrap_super_admin(&db, " root ", &password).await.unwrap().unwrap();
        assert_eq!(created.username, "root");
        assert_eq!(created.role, AdminRole::SuperAdmin);

        let stored = users::Entity::find().one(&db).await.unwrap().unwrap();
        let hash = PasswordHash::new(&stored.password_hash).unwrap();
        assert!(Argon2::default().verify_password(b"change-me", &hash).is_ok());

        let other = SecretString::from("another-pass".to_string());
        assert!(bootstrap_super_admin(&db, "second", &other).await.unwrap().is_none());
        assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn weak_bootstrap_password_is_rejected() {
        let db = memory_db().await;
        let short = SecretString::from("123".to_string());
        let result = bootstrap_super_admin(&db, "root", &short).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(users::Entity::find().count(&db).await.unwrap(), 0);
    }
}
