use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;
use tracing::debug;

use super::error::SessionFactoryError;

/// known_hostsの照合結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyStatus {
    /// 同じ鍵が登録されている
    Match,
    /// 同じ種類の異なる鍵が登録されている
    Mismatch,
    /// 登録されていない
    NotFound,
}

#[derive(Debug, Clone)]
struct KnownHostEntry {
    patterns: Vec<String>,
    key_type: String,
    key: Vec<u8>,
}

impl KnownHostEntry {
    fn matches(&self, name: &str) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            match pattern.strip_prefix('!') {
                Some(negated) if negated.eq_ignore_ascii_case(name) => return false,
                Some(_) => {}
                None if pattern.eq_ignore_ascii_case(name) => matched = true,
                None => {}
            }
        }
        matched
    }
}

/// `<ssh_dir>/known_hosts`
///
/// Plain host names and `[host]:port` patterns only. Hashed entries (`|1|`)
/// and marker lines (`@cert-authority`, `@revoked`) are skipped.
#[derive(Debug, Clone, Default)]
pub struct KnownHosts {
    entries: Vec<KnownHostEntry>,
}

impl KnownHosts {
    pub const FILE_NAME: &'static str = "known_hosts";

    pub fn load(ssh_dir: &Path) -> Result<Self, SessionFactoryError> {
        let path = ssh_dir.join(Self::FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| {
            SessionFactoryError::ReadConfig {
                path: path.clone(),
                source,
            }
        })?;
        let known_hosts = Self::parse(&contents);
        debug!(path = %path.display(), entries = known_hosts.len(), "Loaded known_hosts");
        Ok(known_hosts)
    }

    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('@'))
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let hosts = fields.next()?;
                if hosts.starts_with('|') {
                    return None;
                }
                let key_type = fields.next()?;
                let key = STANDARD.decode(fields.next()?).ok()?;
                Some(KnownHostEntry {
                    patterns: hosts.split(',').map(str::to_string).collect(),
                    key_type: key_type.to_string(),
                    key,
                })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// ホスト鍵（SSHワイヤ形式）を照合する
    pub fn check(&self, host: &str, port: Option<u16>, key: &[u8]) -> HostKeyStatus {
        let name = match port {
            Some(port) if port != 22 => format!("[{}]:{}", host, port),
            _ => host.to_string(),
        };
        let key_type = wire_key_type(key);

        let mut status = HostKeyStatus::NotFound;
        for entry in self.entries.iter().filter(|entry| entry.matches(&name)) {
            if entry.key == key {
                return HostKeyStatus::Match;
            }
            if key_type.as_deref() == Some(entry.key_type.as_str()) {
                status = HostKeyStatus::Mismatch;
            }
        }
        status
    }
}

/// 鍵データ先頭の `string` から鍵の種類を読む
fn wire_key_type(key: &[u8]) -> Option<String> {
    let len_bytes: [u8; 4] = key.get(..4)?.try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let name = key.get(4..4 + len)?;
    String::from_utf8(name.to_vec()).ok()
}
