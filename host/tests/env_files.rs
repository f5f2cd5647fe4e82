//! `.env` handling. These tests mutate the process environment, so they live
//! in their own test binary and take `ENV_LOCK` to run one at a time.

use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use microfeed_host::cli::Cli;
use microfeed_host::config::{env_bool, load_dotenv};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn existing_variables_are_not_overridden() {
    let _guard = lock_env();
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join(".env"),
        "MICROFEED_TEST_DOTENV_KEEP=file\nMICROFEED_TEST_DOTENV_NEW=file\n",
    )
    .unwrap();
    env::set_var("MICROFEED_TEST_DOTENV_KEEP", "process");

    let loaded = load_dotenv(tmp.path());

    assert_eq!(loaded, 1);
    assert_eq!(env::var("MICROFEED_TEST_DOTENV_KEEP").unwrap(), "process");
    assert_eq!(env::var("MICROFEED_TEST_DOTENV_NEW").unwrap(), "file");
}

#[test]
fn bool_parsing_falls_back_on_garbage() {
    let _guard = lock_env();
    env::set_var("MICROFEED_TEST_BOOL", "Yes");
    assert!(env_bool("MICROFEED_TEST_BOOL", false));
    env::set_var("MICROFEED_TEST_BOOL", "off");
    assert!(!env_bool("MICROFEED_TEST_BOOL", true));
    env::set_var("MICROFEED_TEST_BOOL", "maybe");
    assert!(env_bool("MICROFEED_TEST_BOOL", true));
    assert!(!env_bool("MICROFEED_TEST_BOOL_UNSET", false));
}

#[test]
fn workdir_dotenv_feeds_flag_fallbacks() {
    let _guard = lock_env();
    env::remove_var("MICROFEED_REQUIREMENTS");
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join(".env"), "MICROFEED_REQUIREMENTS=deps.txt\n").unwrap();

    let cli = Cli::parse_with_env_files([
        "microfeed-host".into(),
        "--workdir".into(),
        tmp.path().as_os_str().to_os_string(),
    ])
    .unwrap();

    assert_eq!(cli.requirements, Some(PathBuf::from("deps.txt")));
    env::remove_var("MICROFEED_REQUIREMENTS");
}

#[test]
fn explicit_flag_beats_workdir_dotenv() {
    let _guard = lock_env();
    env::remove_var("MICROFEED_ENTRY");
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join(".env"), "MICROFEED_ENTRY=from_env.py\n").unwrap();

    let cli = Cli::parse_with_env_files([
        "microfeed-host".into(),
        "--workdir".into(),
        tmp.path().as_os_str().to_os_string(),
        "--entry".into(),
        "from_flag.py".into(),
    ])
    .unwrap();

    assert_eq!(cli.entry, Some(PathBuf::from("from_flag.py")));
    env::remove_var("MICROFEED_ENTRY");
}
