// file: src/installer/prompt.rs
// version: 1.0.0
// guid: ff20597a-581b-4992-861a-619f58b298cb

//! Interactive collection of installation settings
//!
//! The questions are asked through the [`Prompter`] collaborator so the
//! collection logic stays independent of the terminal.

use crate::config::{ConfigSource, OsSettings, DEFAULT_USERNAME};
use crate::disk::{pick_default_disk, validate_data_device, validate_device, DiskSnapshot};
use crate::Result;
use colored::Colorize;
use dialoguer::{Input, Password};

pub const EMPTY_PLACEHOLDER: &str = "Unset";
pub const YES_OR_NO: &str = "[Y]es/[n]o";
pub const KEYS_PLACEHOLDER: &str = "github:user1,github:user2";

/// A single question put to the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub default: String,
    pub hint: String,
    pub optional: bool,
    pub secret: bool,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// Prompt rendering collaborator
pub trait Prompter: Send + Sync {
    /// Ask `question`; an empty answer yields the default
    fn ask(&self, question: &Question) -> Result<String>;

    /// Informational line shown to the operator
    fn info(&self, _message: &str) {}

    /// Error shown to the operator before re-prompting
    fn error(&self, _message: &str) {}
}

/// Terminal prompter built on `dialoguer`
#[derive(Debug, Default, Clone)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn ask(&self, question: &Question) -> Result<String> {
        let prompt = if question.hint.is_empty() {
            question.text.clone()
        } else {
            format!("{} ({})", question.text, question.hint)
        };

        let answer = if question.secret {
            Password::new()
                .with_prompt(prompt)
                .allow_empty_password(question.optional)
                .interact()?
        } else {
            let mut input = Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(question.optional || !question.default.is_empty());
            if !question.default.is_empty() {
                input = input.default(question.default.clone());
            }
            input.interact_text()?
        };

        let answer = answer.trim().to_string();
        if answer.is_empty() {
            Ok(question.default.clone())
        } else {
            Ok(answer)
        }
    }

    fn info(&self, message: &str) {
        println!("{} {}", "INFO".cyan().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "ERROR".red().bold(), message);
    }
}

/// Answers starting with `y` (any case) are affirmative
pub fn is_yes(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

/// Ask for the installation disk, defaulting to the largest one
pub fn ask_install_device(prompter: &dyn Prompter, disks: &DiskSnapshot) -> Result<String> {
    prompter.info("Available Disks:");
    for disk in disks.disks() {
        prompter.info(&disk.label);
    }

    let default = pick_default_disk(disks)
        .map(|d| d.path.clone())
        .unwrap_or_default();
    let device = prompter.ask(
        &Question::new("Choose the installation disk:")
            .default_value(default)
            .hint("Cannot be empty"),
    )?;

    Ok(validate_device(&device, disks)?.path.clone())
}

/// Ask for the data disk; the installation disk (the default) means none
pub fn ask_data_device(
    prompter: &dyn Prompter,
    disks: &DiskSnapshot,
    root_device: &str,
) -> Result<Option<String>> {
    let answer = prompter.ask(
        &Question::new("Choose the data disk:")
            .default_value(root_device)
            .hint(format!("Use the installation disk({})", root_device))
            .optional(),
    )?;
    validate_data_device(&answer, root_device, disks)
}

/// Ask for the config file location unless one is already set
pub fn ask_config_url(prompter: &dyn Prompter, current: &str) -> Result<String> {
    if !current.is_empty() {
        return Ok(current.to_string());
    }

    let url = prompter.ask(
        &Question::new("LLMOS config file location (file path or http URL):").optional(),
    )?;
    if !url.is_empty() {
        ConfigSource::validate(&url)?;
    }
    Ok(url)
}

/// Ask for the login account unless keys and password are both configured.
///
/// Returns the updated OS settings, or `None` when nothing was asked.
pub fn ask_user_configs(prompter: &dyn Prompter, os: &OsSettings) -> Result<Option<OsSettings>> {
    if os.has_login_configured() {
        return Ok(None);
    }

    let username = prompter.ask(
        &Question::new("User to setup:")
            .default_value(DEFAULT_USERNAME)
            .hint(EMPTY_PLACEHOLDER),
    )?;
    let password = prompter.ask(
        &Question::new("Password:")
            .hint(EMPTY_PLACEHOLDER)
            .secret(),
    )?;
    let keys = prompter.ask(
        &Question::new("SSH authorized keys(optional):")
            .hint(KEYS_PLACEHOLDER)
            .optional(),
    )?;

    let mut updated = os.clone();
    updated.username = username;
    updated.password = password;
    updated.ssh_authorized_keys = if keys == KEYS_PLACEHOLDER {
        Vec::new()
    } else {
        keys.split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    };
    Ok(Some(updated))
}

/// Final confirmation of the collected settings
pub fn confirm_settings(prompter: &dyn Prompter) -> Result<bool> {
    let answer = prompter.ask(
        &Question::new("Are settings ok?")
            .default_value("n")
            .hint(YES_OR_NO)
            .optional(),
    )?;
    Ok(is_yes(&answer))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedPrompter;
    use super::*;
    use crate::disk::{enumerate_disks, GIB};
    use crate::error::InstallError;
    use crate::utils::disk::BlockDevice;

    fn disks() -> DiskSnapshot {
        enumerate_disks(&[
            BlockDevice::new("sda", 200 * GIB, Some("SSD")),
            BlockDevice::new("sdb", 500 * GIB, Some("HDD")),
        ])
    }

    #[test]
    fn test_is_yes() {
        for yes in ["y", "Y", "yes", "Yep", " YES "] {
            assert!(is_yes(yes), "{}", yes);
        }
        for no in ["", "n", "no", "sure"] {
            assert!(!is_yes(no), "{}", no);
        }
    }

    #[test]
    fn test_install_device_defaults_to_largest() {
        let prompter = ScriptedPrompter::new(&[""]);
        assert_eq!(ask_install_device(&prompter, &disks()).unwrap(), "/dev/sdb");
        assert_eq!(prompter.asked.lock().unwrap()[0].default, "/dev/sdb");
    }

    #[test]
    fn test_install_device_rejects_unknown() {
        let prompter = ScriptedPrompter::new(&["/dev/sdz"]);
        let err = ask_install_device(&prompter, &disks()).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_data_device_default_means_none() {
        let prompter = ScriptedPrompter::new(&[""]);
        assert_eq!(ask_data_device(&prompter, &disks(), "/dev/sda").unwrap(), None);

        let prompter = ScriptedPrompter::new(&["/dev/sdb"]);
        assert_eq!(
            ask_data_device(&prompter, &disks(), "/dev/sda").unwrap(),
            Some("/dev/sdb".to_string())
        );

        let prompter = ScriptedPrompter::new(&["/dev/sdq"]);
        assert!(matches!(
            ask_data_device(&prompter, &disks(), "/dev/sda"),
            Err(InstallError::InvalidDeviceError { .. })
        ));
    }

    #[test]
    fn test_config_url_kept_when_already_set() {
        let prompter = ScriptedPrompter::new(&[]);
        assert_eq!(
            ask_config_url(&prompter, "https://example.com/c.yaml").unwrap(),
            "https://example.com/c.yaml"
        );
        assert_eq!(prompter.asked_count(), 0);
    }

    #[test]
    fn test_config_url_validates_local_files() {
        let prompter = ScriptedPrompter::new(&["/nonexistent/llmos.yaml"]);
        assert!(ask_config_url(&prompter, "").is_err());

        let prompter = ScriptedPrompter::new(&[""]);
        assert_eq!(ask_config_url(&prompter, "").unwrap(), "");
    }

    #[test]
    fn test_user_configs_skipped_when_login_configured() {
        let os = OsSettings {
            password: "$6$x".to_string(),
            ssh_authorized_keys: vec!["github:alice".to_string()],
            ..OsSettings::default()
        };
        let prompter = ScriptedPrompter::new(&[]);
        assert_eq!(ask_user_configs(&prompter, &os).unwrap(), None);
        assert_eq!(prompter.asked_count(), 0);
    }

    #[test]
    fn test_user_configs_placeholder_keys_are_dropped() {
        let prompter = ScriptedPrompter::new(&["", "secret", KEYS_PLACEHOLDER]);
        let os = ask_user_configs(&prompter, &OsSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(os.username, DEFAULT_USERNAME);
        assert_eq!(os.password, "secret");
        assert!(os.ssh_authorized_keys.is_empty());
        assert!(prompter.asked.lock().unwrap()[1].secret);
    }

    #[test]
    fn test_user_configs_splits_keys() {
        let prompter = ScriptedPrompter::new(&["ops", "pw", "github:a, github:b,"]);
        let os = ask_user_configs(&prompter, &OsSettings::default())
            .unwrap()
            .unwrap();
        assert_eq!(os.username, "ops");
        assert_eq!(os.ssh_authorized_keys, vec!["github:a", "github:b"]);
    }

    #[test]
    fn test_confirm_defaults_to_no() {
        assert!(!confirm_settings(&ScriptedPrompter::new(&[""])).unwrap());
        assert!(confirm_settings(&ScriptedPrompter::new(&["yes"])).unwrap());
    }
}
