mod common;

use common::{FakeGenerator, ScriptedPrompter, TestProject};
use kodegen_bundler_unity::SetupError;
use kodegen_bundler_unity::config::KeystoreConfig;
use kodegen_bundler_unity::env::{Settings, SourceFormat, source::parse_assignments};
use kodegen_bundler_unity::keystore::ProvisioningFlow;
use std::fs;

/// Path, alias, then the six subject fields (all defaults).
const ANSWERS: [&str; 8] = ["keys/release.keystore", "upload", "Jane Doe", "", "", "", "", ""];

fn answers_then<'a>(confirm: &[&'a str]) -> Vec<&'a str> {
    ANSWERS.iter().chain(confirm).copied().collect()
}

#[tokio::test]
async fn declined_persistence_leaves_env_untouched() {
    let project = TestProject::new();
    let env = project.write(".env", "# signing\nCOMPANY=Kodegen\n");
    let before = fs::read(&env).unwrap();

    let mut prompter = ScriptedPrompter::new(&answers_then(&["n"]), &["storepass", "storepass", "keypass1", "keypass1"]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let outcome = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .expect("flow succeeds");

    assert!(outcome.persisted.is_none());
    assert_eq!(outcome.alias, "upload");
    assert_eq!(outcome.keystore_path, project.root.join("keys/release.keystore"));
    assert!(outcome.keystore_path.exists());

    assert_eq!(fs::read(&env).unwrap(), before);
    assert!(!project.root.join(".env.backup").exists());
}

#[tokio::test]
async fn generator_receives_collected_request() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(&ANSWERS, &["storepass", "storepass", "keypass1", "keypass1"]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .expect("flow succeeds");

    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.alias, "upload");
    assert_eq!(call.keystore_password, "storepass");
    assert_eq!(call.key_password, "keypass1");
    assert_eq!(
        call.dname,
        "CN=Jane Doe, OU=Mobile, O=Unknown, L=Unknown, ST=Unknown, C=US"
    );
    assert_eq!(call.params.algorithm, "RSA");
    assert_eq!(call.params.size, 2048);
    assert_eq!(call.params.validity_days, 10_000);
}

#[cfg(unix)]
#[tokio::test]
async fn keystore_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(&ANSWERS, &["storepass", "storepass", "keypass1", "keypass1"]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let outcome = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap();

    let mode = fs::metadata(&outcome.keystore_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn short_password_reprompts_and_mismatch_restarts() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(
        &ANSWERS,
        &[
            "abc", // too short, no confirmation asked
            "abcdef", "abcdeg", // mismatch, start over
            "abcdef", "abcdef", // accepted
            "keypass1", "keypass1",
        ],
    );
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .expect("flow succeeds after retries");

    assert_eq!(
        prompter.secret_prompts(),
        vec![
            "Keystore password: ",
            "Keystore password: ",
            "Confirm Keystore password: ",
            "Keystore password: ",
            "Confirm Keystore password: ",
            "Key password: ",
            "Confirm Key password: ",
        ]
    );
    assert_eq!(generator.calls()[0].keystore_password, "abcdef");
}

#[tokio::test]
async fn bounded_retries_are_exhausted() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(&ANSWERS, &["short", "abcdef", "ghijkl", "never-read"]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig {
        password_attempts: 2,
        ..KeystoreConfig::default()
    };

    let err = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::RetriesExhausted(2)), "got {err:?}");
    assert!(generator.calls().is_empty());
    assert!(!project.root.join("keys").exists());
}

#[tokio::test]
async fn existing_keystore_fails_before_passwords() {
    let project = TestProject::new();
    project.write("release.keystore", "existing");

    // Empty answer takes the default path
    let mut prompter = ScriptedPrompter::new(&[""], &["storepass", "storepass"]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let err = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap_err();

    match err {
        SetupError::KeystoreExists(path) => assert_eq!(path, project.root.join("release.keystore")),
        other => panic!("expected KeystoreExists, got {other:?}"),
    }
    assert!(prompter.secret_prompts().is_empty());
    assert!(generator.calls().is_empty());
    assert_eq!(fs::read_to_string(project.root.join("release.keystore")).unwrap(), "existing");
}

#[tokio::test]
async fn end_of_input_cancels_without_generating() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(&["keys/release.keystore"], &[]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let err = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::Cancelled), "got {err:?}");
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn confirmed_persistence_backs_up_and_writes_entries() {
    let project = TestProject::new();
    let original = "# signing\nCOMPANY=Kodegen\nexport ANDROID_KEY_ALIAS=old\n";
    let env = project.write(".env", original);

    let mut prompter = ScriptedPrompter::new(
        &answers_then(&["maybe", "y"]),
        &["store pass!", "store pass!", "keypass1", "keypass1"],
    );
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let outcome = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .expect("flow succeeds");

    let persisted = outcome.persisted.expect("credentials saved");
    assert_eq!(persisted.backup, project.root.join(".env.backup"));
    assert_eq!(fs::read_to_string(&persisted.backup).unwrap(), original);

    let updated = fs::read_to_string(&env).unwrap();
    assert!(updated.starts_with("# signing\nCOMPANY=Kodegen\nexport ANDROID_KEY_ALIAS=upload\n"));

    let values = parse_assignments(&updated, SourceFormat::EnvFile, &env, &Settings::default());
    let keystore_path = outcome.keystore_path.to_string_lossy();
    assert_eq!(values["ANDROID_KEYSTORE_PATH"], keystore_path);
    assert_eq!(values["ANDROID_KEYSTORE_PASSWORD"], "store pass!");
    assert_eq!(values["ANDROID_KEY_ALIAS"], "upload");
    assert_eq!(values["ANDROID_KEY_PASSWORD"], "keypass1");
    assert_eq!(values["COMPANY"], "Kodegen");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&env).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    // The invalid answer was asked again
    let confirms = prompter.prompts.iter().filter(|p| p.ends_with("(y/n): ")).count();
    assert_eq!(confirms, 2);
}

#[tokio::test]
async fn missing_target_skips_persistence_prompt() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(&ANSWERS, &["storepass", "storepass", "keypass1", "keypass1"]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let outcome = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap();

    assert!(outcome.persisted.is_none());
    assert!(!prompter.prompts.iter().any(|p| p.ends_with("(y/n): ")));
    assert!(!project.root.join(".env").exists());
}

#[tokio::test]
async fn generator_failure_is_fatal_and_skips_persistence() {
    let project = TestProject::new();
    let env = project.write(".env", "COMPANY=Kodegen\n");
    let mut prompter = ScriptedPrompter::new(&answers_then(&["y"]), &["storepass", "storepass", "keypass1", "keypass1"]);
    let generator = FakeGenerator::failing();
    let config = KeystoreConfig::default();

    let err = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::KeyGeneration(_)), "got {err:?}");
    assert_eq!(fs::read_to_string(&env).unwrap(), "COMPANY=Kodegen\n");
    assert!(!prompter.prompts.iter().any(|p| p.ends_with("(y/n): ")));
}

#[tokio::test]
async fn q_is_an_answer_after_the_path_prompt() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(
        &["keys/release.keystore", "Q", "Jane Doe", "q", "", "", "", ""],
        &["storepass", "storepass", "keypass1", "keypass1"],
    );
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let outcome = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .expect("flow succeeds");

    assert_eq!(outcome.alias, "Q");
    assert_eq!(
        generator.calls()[0].dname,
        "CN=Jane Doe, OU=q, O=Unknown, L=Unknown, ST=Unknown, C=US"
    );
}

#[tokio::test]
async fn q_at_the_path_prompt_cancels() {
    let project = TestProject::new();
    let mut prompter = ScriptedPrompter::new(&["q"], &[]);
    let generator = FakeGenerator::default();
    let config = KeystoreConfig::default();

    let err = ProvisioningFlow::new(&mut prompter, &generator, &project.root, &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::Cancelled), "got {err:?}");
    assert_eq!(prompter.prompts.len(), 1);
    assert!(!project.root.join("q").exists());
}
