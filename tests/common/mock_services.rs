//! テスト用のモックサービス
//!
//! [`MockSshServer`] はSSHユーザー認証の公開鍵ステップだけを再現する。
//! クライアントはセッションのチャレンジに署名して秘密鍵の所持を示し、
//! サーバーは `authorized_keys` の行でその署名を検証する。

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use sshgit::infrastructure::ssh::KeyPair;

/// Outcome of one authentication attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Accepted { user: String },
    UnknownKey,
    BadSignature,
}

/// Mock SSH server holding `authorized_keys` entries
pub struct MockSshServer {
    authorized_keys: Vec<String>,
    session_id: Vec<u8>,
    attempts: RefCell<Vec<AuthResult>>,
}

impl MockSshServer {
    pub fn new(session_id: &[u8]) -> Self {
        Self {
            authorized_keys: Vec::new(),
            session_id: session_id.to_vec(),
            attempts: RefCell::new(Vec::new()),
        }
    }

    /// Add an `authorized_keys` line (`ssh-rsa AAAA... [comment]`)
    pub fn authorize(mut self, line: &str) -> Self {
        self.authorized_keys.push(line.trim().to_string());
        self
    }

    /// Data the client signs: session id, user name and public key blob
    pub fn challenge(&self, user: &str, public_key_blob: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for field in [self.session_id.as_slice(), user.as_bytes(), public_key_blob] {
            data.extend_from_slice(&(field.len() as u32).to_be_bytes());
            data.extend_from_slice(field);
        }
        data
    }

    /// Client side: sign the challenge with the key pair and submit it
    pub fn authenticate(&self, user: &str, key_pair: &KeyPair) -> AuthResult {
        let blob = key_pair.public_key_blob();
        let challenge = self.challenge(user, &blob);
        let signature = key_pair.sign_sha256(&challenge).expect("Failed to sign");
        self.verify(user, &blob, &signature)
    }

    /// Server side: check the key is authorized and the signature is valid
    pub fn verify(&self, user: &str, public_key_blob: &[u8], signature: &[u8]) -> AuthResult {
        let result = match self.find_authorized(public_key_blob) {
            None => AuthResult::UnknownKey,
            Some(public_key) => {
                let digest = Sha256::digest(self.challenge(user, public_key_blob));
                match public_key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature) {
                    Ok(()) => AuthResult::Accepted {
                        user: user.to_string(),
                    },
                    Err(_) => AuthResult::BadSignature,
                }
            }
        };
        self.attempts.borrow_mut().push(result.clone());
        result
    }

    pub fn attempts(&self) -> Vec<AuthResult> {
        self.attempts.borrow().clone()
    }

    fn find_authorized(&self, public_key_blob: &[u8]) -> Option<RsaPublicKey> {
        self.authorized_keys.iter().find_map(|line| {
            let mut fields = line.split_whitespace();
            if fields.next()? != "ssh-rsa" {
                return None;
            }
            let blob = STANDARD.decode(fields.next()?).ok()?;
            if blob != public_key_blob {
                return None;
            }
            parse_rsa_blob(&blob)
        })
    }
}

/// Decode `string "ssh-rsa", mpint e, mpint n`
fn parse_rsa_blob(blob: &[u8]) -> Option<RsaPublicKey> {
    let mut rest = blob;
    let key_type = read_field(&mut rest)?;
    if key_type != b"ssh-rsa" {
        return None;
    }
    let e = BigUint::from_bytes_be(read_field(&mut rest)?);
    let n = BigUint::from_bytes_be(read_field(&mut rest)?);
    RsaPublicKey::new(n, e).ok()
}

fn read_field<'a>(rest: &mut &'a [u8]) -> Option<&'a [u8]> {
    let len_bytes: [u8; 4] = rest.get(..4)?.try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let field = rest.get(4..4 + len)?;
    *rest = &rest[4 + len..];
    Some(field)
}
