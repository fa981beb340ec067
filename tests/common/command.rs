use crate::common::file::{FileSpec, remove_file, write_file};
use assert_cmd::Command;
use assert_fs::TempDir;
use derive_new::new;
use rstest::fixture;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, new)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

pub fn alice() -> CommitAuthor {
    CommitAuthor::new("Alice".to_string(), "alice@example.com".to_string())
}

pub fn bob() -> CommitAuthor {
    CommitAuthor::new("Bob".to_string(), "bob@example.org".to_string())
}

pub fn random_author() -> CommitAuthor {
    use fake::Fake;
    use fake::faker::internet::en::FreeEmail;
    use fake::faker::name::en::Name;

    CommitAuthor::new(Name().fake::<String>(), FreeEmail().fake::<String>())
}

/// A repository with three commits on `main`, newest last:
///
/// 1. 2024-01-01 10:00 Alice adds `a.txt` and `src/lib.rs`
/// 2. 2024-01-02 10:00 Bob changes `a.txt` and adds executable `run.sh`
/// 3. 2024-01-03 10:00 Alice deletes `src/lib.rs`
pub struct HistoryRepository {
    pub root: TempDir,
    pub output: TempDir,
}

impl HistoryRepository {
    pub fn path(&self) -> PathBuf {
        self.root.path().join("project")
    }

    pub fn rev_parse(&self, revision: &str) -> String {
        rev_parse(&self.path(), revision)
    }
}

#[fixture]
pub fn history_repository() -> HistoryRepository {
    let root = TempDir::new().expect("Failed to create temp dir");
    let output = TempDir::new().expect("Failed to create temp dir");
    let dir = root.path().join("project");
    std::fs::create_dir_all(&dir).expect("Failed to create repository dir");

    run_git_command(&dir, &["init", "-q"]).assert().success();

    write_file(FileSpec::new(dir.join("a.txt"), "one\n".to_string()));
    write_file(FileSpec::new(dir.join("src").join("lib.rs"), "lib\n".to_string()));
    git_commit(&dir, "first", &alice(), "2024-01-01 10:00:00 +0000");

    write_file(FileSpec::new(dir.join("a.txt"), "one\ntwo\n".to_string()));
    write_file(FileSpec::new(dir.join("run.sh"), "#!/bin/sh\n".to_string()));
    run_git_command(&dir, &["add", "run.sh"]).assert().success();
    run_git_command(&dir, &["update-index", "--chmod=+x", "run.sh"])
        .assert()
        .success();
    git_commit(&dir, "second", &bob(), "2024-01-02 10:00:00 +0000");

    remove_file(&dir.join("src").join("lib.rs"));
    git_commit(&dir, "third", &alice(), "2024-01-03 10:00:00 +0000");

    HistoryRepository { root, output }
}

pub fn run_report_command(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("gitreport").expect("Failed to find gitreport binary");
    cmd.env_remove("GITREPORT_LOG");
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    // keep the user's configuration out of fixtures
    cmd.envs(vec![
        ("GIT_CONFIG_NOSYSTEM", "1"),
        ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ]);
    cmd.args(["-c", "init.defaultBranch=main", "-c", "commit.gpgsign=false"]);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Stage everything and commit with fixed author and committer identity
pub fn git_commit(dir: &Path, message: &str, author: &CommitAuthor, date: &str) {
    run_git_command(dir, &["add", "-A"]).assert().success();

    let mut cmd = run_git_command(dir, &["commit", "-q", "--allow-empty", "-m", message]);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", author.name.as_str()),
        ("GIT_AUTHOR_EMAIL", author.email.as_str()),
        ("GIT_AUTHOR_DATE", date), // %Y-%m-%d %H:%M:%S %z
        ("GIT_COMMITTER_NAME", author.name.as_str()),
        ("GIT_COMMITTER_EMAIL", author.email.as_str()),
        ("GIT_COMMITTER_DATE", date),
    ]);
    cmd.assert().success();
}

pub fn rev_parse(dir: &Path, revision: &str) -> String {
    let output = run_git_command(dir, &["rev-parse", revision])
        .output()
        .expect("Failed to run git rev-parse");

    String::from_utf8(output.stdout)
        .expect("git rev-parse printed invalid UTF-8")
        .trim()
        .to_string()
}
