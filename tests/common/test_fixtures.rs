//! テストデータ作成用のフィクスチャ
//!
//! PEM鍵は `tests/fixtures` に置く。リモートはローカルのベアリポジトリで、
//! libgit2はネットワークなしでクローン・プッシュできる。

use git2::{Oid, Repository, Signature};
use std::path::{Path, PathBuf};

/// Default branch of the fixture remotes
pub const REMOTE_BRANCH: &str = "main";

/// `SHA256:` fingerprint of `test_rsa_public.pem` as printed by `ssh-keygen -l`
pub const TEST_RSA_FINGERPRINT: &str = "SHA256:b+MuxRZclu+i89Zy3h/jozZ3FAtNiASDodEfCaXjOWU";

/// Path of a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Contents of a file under `tests/fixtures`
pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("Failed to read fixture")
}

/// Fixture key pair paths
pub struct KeyFixture;

impl KeyFixture {
    pub fn public_pem() -> PathBuf {
        fixture_path("test_rsa_public.pem")
    }

    pub fn private_pem() -> PathBuf {
        fixture_path("test_rsa_private.pem")
    }

    pub fn other_public_pem() -> PathBuf {
        fixture_path("other_rsa_public.pem")
    }

    pub fn ed25519_public_pem() -> PathBuf {
        fixture_path("test_ed25519_public.pem")
    }

    pub fn ed25519_private_pem() -> PathBuf {
        fixture_path("test_ed25519_private.pem")
    }

    /// `ssh-rsa AAAA...` line of the test key (no comment)
    pub fn openssh_public_line() -> String {
        read_fixture("test_rsa_openssh.pub")
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// PKCS#8 private key text for the inline-key credential
    pub fn private_key_text() -> String {
        read_fixture("test_rsa_private.pem")
    }
}

/// Bare remote repository with one commit on `main`
pub struct BareRemote {
    pub path: PathBuf,
    pub initial_commit: Oid,
}

impl BareRemote {
    /// Create `<dir>/<name>.git` containing `README.md`
    pub fn create(dir: &Path, name: &str) -> Self {
        let path = dir.join(format!("{}.git", name));
        let repo = Repository::init_bare(&path).expect("Failed to init bare remote");

        let blob = repo.blob(b"# widgets\n").unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("README.md", blob, 0o100644).unwrap();
        let tree_id = builder.write().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let signature = Signature::now("Fixture", "fixture@example.com").unwrap();
        let reference = format!("refs/heads/{}", REMOTE_BRANCH);
        let initial_commit = repo
            .commit(
                Some(&reference),
                &signature,
                &signature,
                "Initial commit",
                &tree,
                &[],
            )
            .unwrap();
        repo.set_head(&reference).unwrap();

        Self {
            path,
            initial_commit,
        }
    }

    /// Empty bare remote (no commits)
    pub fn create_empty(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{}.git", name));
        Repository::init_bare(&path).expect("Failed to init bare remote");
        path
    }

    pub fn url(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Commit the branch currently points at
    pub fn head_of(&self, branch: &str) -> Oid {
        let repo = Repository::open_bare(&self.path).unwrap();
        let reference = repo
            .find_reference(&format!("refs/heads/{}", branch))
            .unwrap();
        reference.target().unwrap()
    }

    /// Number of commits reachable from the branch
    pub fn commit_count(&self, branch: &str) -> usize {
        let repo = Repository::open_bare(&self.path).unwrap();
        let mut walk = repo.revwalk().unwrap();
        walk.push(self.head_of(branch)).unwrap();
        walk.count()
    }

    /// Parent ids of a commit
    pub fn parents_of(&self, commit: Oid) -> Vec<Oid> {
        let repo = Repository::open_bare(&self.path).unwrap();
        let commit = repo.find_commit(commit).unwrap();
        commit.parent_ids().collect()
    }

    /// Whether `path` exists in the tree of `commit`
    pub fn tree_contains(&self, commit: Oid, path: &str) -> bool {
        let repo = Repository::open_bare(&self.path).unwrap();
        let tree = repo.find_commit(commit).unwrap().tree().unwrap();
        tree.get_path(Path::new(path)).is_ok()
    }
}
