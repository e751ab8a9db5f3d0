use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::SessionFactoryError;

/// `StrictHostKeyChecking` の値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictHostKeyChecking {
    Yes,
    No,
    AcceptNew,
    Ask,
}

impl StrictHostKeyChecking {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" | "off" => Some(Self::No),
            "accept-new" => Some(Self::AcceptNew),
            "ask" => Some(Self::Ask),
            _ => None,
        }
    }
}

/// ホストに適用される設定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSettings {
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,
    pub identity_files: Vec<PathBuf>,
    pub user: Option<String>,
}

#[derive(Debug, Clone)]
struct HostPattern {
    negated: bool,
    regex: Regex,
}

#[derive(Debug, Clone)]
struct HostBlock {
    patterns: Vec<HostPattern>,
    options: Vec<(String, String)>,
}

impl HostBlock {
    fn matches(&self, host: &str) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            if pattern.regex.is_match(host) {
                if pattern.negated {
                    return false;
                }
                matched = true;
            }
        }
        matched
    }
}

/// `<ssh_dir>/config` の `Host` ブロック
///
/// `Match` ブロックは評価せず読み飛ばす。
#[derive(Debug, Clone, Default)]
pub struct SshConfig {
    blocks: Vec<HostBlock>,
}

impl SshConfig {
    pub const FILE_NAME: &'static str = "config";

    /// SSHディレクトリの設定ファイルを読み込む（存在しなければ空）
    pub fn load(ssh_dir: &Path, home_dir: &Path) -> Result<Self, SessionFactoryError> {
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
        let config = Self::parse(&contents, ssh_dir, home_dir);
        debug!(path = %path.display(), blocks = config.blocks.len(), "Loaded SSH config");
        Ok(config)
    }

    pub fn parse(contents: &str, ssh_dir: &Path, home_dir: &Path) -> Self {
        let mut blocks = Vec::new();
        // options before the first Host line apply to every host
        let mut current = Some(HostBlock {
            patterns: glob_patterns("*"),
            options: Vec::new(),
        });

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((keyword, value)) = split_keyword(line) else {
                continue;
            };

            match keyword.as_str() {
                "host" => {
                    blocks.extend(current.take());
                    current = Some(HostBlock {
                        patterns: glob_patterns(&value),
                        options: Vec::new(),
                    });
                }
                "match" => {
                    blocks.extend(current.take());
                }
                _ => {
                    if let Some(block) = current.as_mut() {
                        let value = if keyword == "identityfile" {
                            expand_path(&value, ssh_dir, home_dir)
                                .to_string_lossy()
                                .into_owned()
                        } else {
                            value
                        };
                        block.options.push((keyword, value));
                    }
                }
            }
        }
        blocks.extend(current);

        Self { blocks }
    }

    /// ホストに適用される設定を集める（最初に現れた値が優先）
    pub fn settings_for(&self, host: &str) -> HostSettings {
        let mut settings = HostSettings::default();

        for block in self.blocks.iter().filter(|block| block.matches(host)) {
            for (keyword, value) in &block.options {
                match keyword.as_str() {
                    "stricthostkeychecking" => {
                        if settings.strict_host_key_checking.is_none() {
                            settings.strict_host_key_checking = StrictHostKeyChecking::parse(value);
                        }
                    }
                    "user" => {
                        if settings.user.is_none() {
                            settings.user = Some(value.clone());
                        }
                    }
                    "identityfile" => {
                        let path = PathBuf::from(value);
                        if !settings.identity_files.contains(&path) {
                            settings.identity_files.push(path);
                        }
                    }
                    _ => {}
                }
            }
        }

        settings
    }
}

/// `Keyword value` / `Keyword=value` を分割する
fn split_keyword(line: &str) -> Option<(String, String)> {
    let end = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let keyword = line[..end].to_ascii_lowercase();
    let rest = line[end..].trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest).trim();
    let value = rest
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(rest);
    if value.is_empty() {
        return None;
    }
    Some((keyword, value.to_string()))
}

fn glob_patterns(value: &str) -> Vec<HostPattern> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .filter_map(|pattern| {
            let (negated, glob) = match pattern.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, pattern),
            };
            let regex = Regex::new(&glob_to_regex(glob)).ok()?;
            Some(HostPattern { negated, regex })
        })
        .collect()
}

fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::from("(?i)^");
    for c in glob.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

fn expand_path(value: &str, ssh_dir: &Path, home_dir: &Path) -> PathBuf {
    if value == "~" {
        home_dir.to_path_buf()
    } else if let Some(rest) = value.strip_prefix("~/") {
        home_dir.join(rest)
    } else {
        let path = Path::new(value);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            ssh_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(contents: &str) -> SshConfig {
        SshConfig::parse(contents, Path::new("/home/ci/.ssh"), Path::new("/home/ci"))
    }

    #[test]
    fn test_transient_config_disables_host_key_checking() {
        let config = parse("Host github.com\n  AddKeysToAgent no\n  StrictHostKeyChecking no");
        let settings = config.settings_for("github.com");
        assert_eq!(
            settings,
            HostSettings {
                strict_host_key_checking: Some(StrictHostKeyChecking::No),
                ..HostSettings::default()
            }
        );

        let other = config.settings_for("gitlab.com");
        assert_eq!(other, HostSettings::default());
    }

    #[test]
    fn test_first_value_wins() {
        let config = parse(
            "Host *.example.com\n  User deploy\n  StrictHostKeyChecking yes\n\
             Host *\n  User git\n  StrictHostKeyChecking accept-new\n",
        );
        let settings = config.settings_for("git.example.com");
        assert_eq!(settings.user.as_deref(), Some("deploy"));
        assert_eq!(settings.strict_host_key_checking, Some(StrictHostKeyChecking::Yes));

        let settings = config.settings_for("github.com");
        assert_eq!(settings.user.as_deref(), Some("git"));
        assert_eq!(
            settings.strict_host_key_checking,
            Some(StrictHostKeyChecking::AcceptNew)
        );
    }

    #[test]
    fn test_negated_pattern() {
        let config = parse("Host * !internal.example.com\n  StrictHostKeyChecking=no\n");
        assert_eq!(
            config.settings_for("github.com").strict_host_key_checking,
            Some(StrictHostKeyChecking::No)
        );
        assert_eq!(
            config.settings_for("internal.example.com").strict_host_key_checking,
            None
        );
    }

    #[test]
    fn test_identity_files_are_expanded_and_accumulated() {
        let config = parse(
            "IdentityFile ~/.ssh/global_key\n\
             Host github.com\n  IdentityFile deploy_key\n  IdentityFile \"/etc/keys/ci key\"\n",
        );
        let settings = config.settings_for("github.com");
        assert_eq!(
            settings.identity_files,
            vec![
                PathBuf::from("/home/ci/.ssh/global_key"),
                PathBuf::from("/home/ci/.ssh/deploy_key"),
                PathBuf::from("/etc/keys/ci key"),
            ]
        );
    }

    #[test]
    fn test_match_blocks_are_skipped() {
        let config = parse("Match host github.com\n  User ignored\nHost github.com\n  User git\n");
        assert_eq!(config.settings_for("github.com").user.as_deref(), Some("git"));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let config = parse("HOST GitHub.com\n  stricthostkeychecking NO\n");
        assert_eq!(
            config.settings_for("github.com").strict_host_key_checking,
            Some(StrictHostKeyChecking::No)
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = SshConfig::load(dir.path(), dir.path()).unwrap();
        assert_eq!(config.settings_for("github.com"), HostSettings::default());
    }
}
