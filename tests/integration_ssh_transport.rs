//! SSHトランスポートの統合テスト
//!
//! PEM鍵の読み込み、モックSSHサーバーでの公開鍵認証、
//! 一時ファイルの書き出しと削除を検証する

mod common;

use common::mock_services::{AuthResult, MockSshServer};
use common::test_fixtures::{KeyFixture, TEST_RSA_FINGERPRINT};
use pretty_assertions::assert_eq;
use sshgit::{
    domain::value_objects::{CredentialSource, SshOptions},
    infrastructure::ssh::{
        load_key_pair, transport::transient_config_contents, Identity, KeyLoadError,
        PemKeyFiles, SessionFactory, SessionFactoryError, SshTransport, StopOutcome,
    },
};
use tempfile::TempDir;

#[test]
fn test_loaded_key_pair_authenticates_against_mock_server() {
    let pair = load_key_pair(&KeyFixture::public_pem(), &KeyFixture::private_pem()).unwrap();
    let server =
        MockSshServer::new(b"session-0001").authorize(&KeyFixture::openssh_public_line());

    let result = server.authenticate("git", &pair);
    assert_eq!(
        result,
        AuthResult::Accepted {
            user: "git".to_string()
        }
    );
}

#[test]
fn test_unauthorized_key_is_refused() {
    let pair = load_key_pair(&KeyFixture::public_pem(), &KeyFixture::private_pem()).unwrap();
    let server = MockSshServer::new(b"session-0002");

    assert_eq!(server.authenticate("git", &pair), AuthResult::UnknownKey);
}

#[test]
fn test_signature_over_other_session_is_refused() {
    let pair = load_key_pair(&KeyFixture::public_pem(), &KeyFixture::private_pem()).unwrap();
    let server =
        MockSshServer::new(b"session-0003").authorize(&KeyFixture::openssh_public_line());
    let replayed = MockSshServer::new(b"session-9999");

    let blob = pair.public_key_blob();
    let signature = pair
        .sign_sha256(&replayed.challenge("git", &blob))
        .unwrap();

    assert_eq!(
        server.verify("git", &blob, &signature),
        AuthResult::BadSignature
    );
    assert_eq!(server.attempts(), vec![AuthResult::BadSignature]);
}

#[test]
fn test_openssh_line_and_fingerprint() {
    let pair = load_key_pair(&KeyFixture::public_pem(), &KeyFixture::private_pem()).unwrap();

    assert_eq!(pair.openssh_public_key(), KeyFixture::openssh_public_line());
    assert_eq!(pair.fingerprint(), TEST_RSA_FINGERPRINT);
}

#[test]
fn test_missing_key_file() {
    let temp = TempDir::new().unwrap();
    let result = load_key_pair(&temp.path().join("missing.pem"), &KeyFixture::private_pem());

    assert!(matches!(result, Err(KeyLoadError::Read { .. })));
}

#[test]
fn test_corrupted_base64_is_rejected() {
    let temp = TempDir::new().unwrap();
    let corrupted = temp.path().join("corrupted.pem");
    let text = std::fs::read_to_string(KeyFixture::private_pem()).unwrap();
    std::fs::write(&corrupted, text.replacen("MII", "M!I", 1)).unwrap();

    let result = load_key_pair(&KeyFixture::public_pem(), &corrupted);
    assert!(matches!(result, Err(KeyLoadError::Base64 { .. })));
}

#[test]
fn test_any_substituted_private_key_character_is_rejected() {
    let temp = TempDir::new().unwrap();
    let corrupted = temp.path().join("corrupted.pem");
    let text = std::fs::read_to_string(KeyFixture::private_pem()).unwrap();

    let mut accepted = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if !line.starts_with("-----") {
            for (i, c) in line.char_indices() {
                if !(c.is_ascii_alphanumeric() || c == '+' || c == '/') {
                    continue;
                }
                let mut bytes = text.clone().into_bytes();
                bytes[offset + i] = if c == 'A' { b'B' } else { b'A' };
                std::fs::write(&corrupted, &bytes).unwrap();

                if load_key_pair(&KeyFixture::public_pem(), &corrupted).is_ok() {
                    accepted.push(offset + i);
                }
            }
        }
        offset += line.len();
    }

    assert_eq!(accepted, Vec::<usize>::new());
}

#[test]
fn test_mismatched_pair_is_rejected() {
    let result = load_key_pair(&KeyFixture::other_public_pem(), &KeyFixture::private_pem());

    assert!(matches!(result, Err(KeyLoadError::Mismatch)));
}

#[test]
fn test_non_rsa_key_is_unsupported() {
    let result = load_key_pair(
        &KeyFixture::ed25519_public_pem(),
        &KeyFixture::ed25519_private_pem(),
    );

    assert!(matches!(
        result,
        Err(KeyLoadError::UnsupportedAlgorithm { .. })
    ));
}

#[test]
fn test_pem_key_files_supply_single_memory_identity() {
    let temp = TempDir::new().unwrap();
    let factory = SessionFactory::builder()
        .home_directory(temp.path())
        .default_keys_provider(PemKeyFiles::new(
            KeyFixture::public_pem(),
            KeyFixture::private_pem(),
        ))
        .build()
        .unwrap();

    let identities = factory.identities(Some("github.com")).unwrap();
    assert_eq!(identities.len(), 1);
    match &identities[0] {
        Identity::Memory(pair) => assert_eq!(pair.fingerprint(), TEST_RSA_FINGERPRINT),
        other => panic!("unexpected identity: {other:?}"),
    }
}

#[test]
fn test_key_file_pair_transport_needs_no_ssh_directory() {
    let temp = TempDir::new().unwrap();
    let source =
        CredentialSource::key_file_pair(KeyFixture::public_pem(), KeyFixture::private_pem());

    let mut transport =
        SshTransport::with_options(source, SshOptions::default().with_home_dir(temp.path()))
            .unwrap();

    assert!(transport.is_started());
    assert!(transport.transient_key_path().is_none());
    assert_eq!(transport.stop(), StopOutcome::Stopped);
}

#[test]
fn test_stop_twice() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join(".ssh")).unwrap();
    let mut transport = SshTransport::with_options(
        CredentialSource::DefaultDirectory,
        SshOptions::default().with_home_dir(temp.path()),
    )
    .unwrap();
    let config = transport.transport_config().unwrap();

    assert_eq!(transport.stop(), StopOutcome::Stopped);
    assert_eq!(transport.stop(), StopOutcome::NotStarted);
    assert!(!transport.is_started());
    assert!(!config.is_live());
    assert!(matches!(
        transport.transport_config(),
        Err(SessionFactoryError::Stopped)
    ));
}

#[test]
fn test_missing_default_directory() {
    let temp = TempDir::new().unwrap();
    let result = SshTransport::with_options(
        CredentialSource::DefaultDirectory,
        SshOptions::default().with_home_dir(temp.path()),
    );

    assert!(matches!(
        result,
        Err(SessionFactoryError::SshDirectoryMissing { .. })
    ));
}

#[test]
fn test_inline_key_files_written_and_deleted() {
    let temp = TempDir::new().unwrap();
    let ssh_dir = temp.path().join("deploy-ssh");
    let key_text = KeyFixture::private_key_text();
    let source = CredentialSource::inline_key_text(Some(ssh_dir.clone()), key_text.clone());

    let mut transport = SshTransport::with_options(
        source,
        SshOptions::default()
            .with_home_dir(temp.path())
            .with_config_host("github.com"),
    )
    .unwrap();

    let key_path = ssh_dir.join("id_rsa");
    let config_path = ssh_dir.join("config");
    assert_eq!(transport.transient_key_path(), Some(key_path.as_path()));
    assert_eq!(std::fs::read_to_string(&key_path).unwrap(), key_text);
    assert_eq!(
        std::fs::read_to_string(&config_path).unwrap(),
        transient_config_contents("github.com")
    );
    assert_eq!(
        transient_config_contents("github.com"),
        "Host github.com\n  AddKeysToAgent no\n  StrictHostKeyChecking no"
    );

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&key_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    transport.delete_transient_key_file().unwrap();
    transport.delete_transient_key_file().unwrap();
    transport.delete_transient_config_file().unwrap();
    assert!(!key_path.exists());
    assert!(!config_path.exists());
    assert!(ssh_dir.exists());
}

#[test]
fn test_inline_key_files_removed_on_drop() {
    let temp = TempDir::new().unwrap();
    let ssh_dir = temp.path().join("deploy-ssh");
    let source =
        CredentialSource::inline_key_text(Some(ssh_dir.clone()), KeyFixture::private_key_text());

    {
        let _transport =
            SshTransport::with_options(source, SshOptions::default().with_home_dir(temp.path()))
                .unwrap();
        assert!(ssh_dir.join("id_rsa").exists());
    }

    assert!(!ssh_dir.join("id_rsa").exists());
    assert!(!ssh_dir.join("config").exists());
}

#[test]
fn test_inline_key_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    let ssh_dir = temp.path().join(".ssh");
    std::fs::create_dir(&ssh_dir).unwrap();
    std::fs::write(ssh_dir.join("config"), "Host *\n  User deploy\n").unwrap();

    // ssh_dir省略時は ~/.ssh に書き出す
    let source = CredentialSource::inline_key_text(None, KeyFixture::private_key_text());
    let result =
        SshTransport::with_options(source, SshOptions::default().with_home_dir(temp.path()));

    assert!(matches!(
        result,
        Err(SessionFactoryError::WouldOverwrite { .. })
    ));
    // 既存の設定は残し、先に書いた鍵は削除する
    assert_eq!(
        std::fs::read_to_string(ssh_dir.join("config")).unwrap(),
        "Host *\n  User deploy\n"
    );
    assert!(!ssh_dir.join("id_rsa").exists());
}

#[test]
fn test_unsupported_authentication_method() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join(".ssh")).unwrap();
    let mut options = SshOptions::default().with_home_dir(temp.path());
    options.preferred_authentications = "publickey,password".to_string();

    let result = SshTransport::with_options(CredentialSource::DefaultDirectory, options);
    assert!(matches!(
        result,
        Err(SessionFactoryError::UnsupportedAuthentication { method }) if method == "password"
    ));
}
