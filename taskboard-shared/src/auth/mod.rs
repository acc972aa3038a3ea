/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and strength rules
/// - [`jwt`]: HS256 access/refresh tokens
/// - [`middleware`]: Axum bearer-token middleware and the `AuthContext` extractor
/// - [`authorization`]: board role policy and the authorization gate
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::issue_token_pair;
/// use taskboard_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "an-example-secret-that-is-32-bytes!";
/// let user_id = Uuid::new_v4();
///
/// let tokens = issue_token_pair(user_id, secret)?;
/// let auth = authenticate(&tokens.access_token, secret)?;
/// assert_eq!(auth.user_id, user_id);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
