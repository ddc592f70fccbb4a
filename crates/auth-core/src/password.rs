//! 密码哈希（argon2id，PHC 字符串格式）

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use passage_errors::{AppError, AppResult};

/// argon2 代价参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherParams {
    pub time_cost: u32,
    /// KiB
    pub memory_cost: u32,
    pub parallelism: u32,
    pub output_len: usize,
}

impl Default for HasherParams {
    fn default() -> Self {
        Self {
            time_cost: 1,
            memory_cost: 64 * 1024,
            parallelism: 4,
            output_len: 32,
        }
    }
}

/// 凭据哈希器
///
/// 输出形如 `$argon2id$v=19$m=65536,t=1,p=4$<salt>$<hash>`，参数与盐都编码在字符串里，
/// 校验时从字符串中读取，不依赖当前配置。
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(params: HasherParams) -> AppResult<Self> {
        let params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(params.output_len),
        )
        .map_err(|e| AppError::internal(format!("Invalid argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// 使用随机 16 字节盐哈希
    pub fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hash_salted(password, &salt)
    }

    /// 使用给定盐哈希，相同盐与参数得到相同结果
    pub fn hash_with_salt(&self, password: &str, salt: &[u8]) -> AppResult<String> {
        let salt = SaltString::encode_b64(salt)
            .map_err(|e| AppError::internal(format!("Invalid salt: {}", e)))?;
        self.hash_salted(password, &salt)
    }

    fn hash_salted(&self, password: &str, salt: &SaltString) -> AppResult<String> {
        self.argon2
            .hash_password(password.as_bytes(), salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
    }

    /// 校验密码；哈希串格式错误时返回 false
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(encoded) else {
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> CredentialHasher {
        CredentialHasher::new(HasherParams {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            output_len: 32,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = light();
        let hash = hasher.hash("Abc123!@").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
        assert!(hasher.verify("Abc123!@", &hash));
        assert!(!hasher.verify("Abc123!#", &hash));
    }

    #[test]
    fn test_random_salt_per_call() {
        let hasher = light();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_fixed_salt_is_deterministic() {
        let hasher = light();
        let salt = [7u8; 16];
        let a = hasher.hash_with_salt("p@ssW0rd", &salt).unwrap();
        let b = hasher.hash_with_salt("p@ssW0rd", &salt).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_false() {
        let hasher = light();
        assert!(!hasher.verify("anything", ""));
        assert!(!hasher.verify("anything", "not-a-hash"));
        assert!(!hasher.verify("anything", "$argon2id$v=19$m=1024,t=1,p=1$$"));
    }

    #[test]
    fn test_params_read_from_hash() {
        // 用不同参数的哈希器校验，参数以哈希串为准
        let hash = light().hash("Secret1!").unwrap();
        let other = CredentialHasher::new(HasherParams {
            time_cost: 2,
            memory_cost: 2048,
            parallelism: 1,
            output_len: 32,
        })
        .unwrap();
        assert!(other.verify("Secret1!", &hash));
    }

    #[test]
    fn test_printable_ascii_roundtrip() {
        let hasher = light();
        let samples = ["a", " ", "~", "P4ss w0rd!", "{}[]<>|\\\"'`"];
        for (i, p) in samples.iter().enumerate() {
            let hash = hasher.hash(p).unwrap();
            assert!(hasher.verify(p, &hash));
            let other = samples[(i + 1) % samples.len()];
            assert!(!hasher.verify(other, &hash));
        }
    }
}
