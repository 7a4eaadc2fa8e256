//! The work done on the action thread: init, build, upload, clean

use std::fs;

use super::Orchestrator;
use crate::config::AUTH_NOT_REQUIRED;
use crate::errors::{PioBrewError, Result};
use crate::models::port::is_serial_port;
use crate::models::{Action, SessionContext, is_wireless_mcu};
use crate::process::{args, run_checked};
use crate::project::programmer::apply_programmer;
use crate::project::source::{SOURCE_DIR, relocate_into_src};
use crate::project::{GLOBAL_SECTION, ProjectConfigFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The environment section already existed, nothing ran
    AlreadyInitialized,
    Initialized,
}

impl Orchestrator {
    /// Body of the action thread. Returns the success reported to the host.
    pub(crate) fn execute(&self, mut session: SessionContext) -> bool {
        let action = session.pending_action;
        let result = match action {
            Action::Init => self.init_project(&mut session).map(|_| true),
            Action::Build => self.build(&mut session),
            Action::Upload => self.upload(&mut session),
            Action::Clean => self.clean(&mut session),
        };

        let success = match result {
            Ok(completed) => completed && !session.last_run_failed,
            Err(e) => {
                if e.is_process_failure() {
                    session.last_run_failed = true;
                }
                self.reporter.error(e.to_string());
                false
            }
        };
        self.reporter.action_finished(action, success);
        success
    }

    /// Create the environment in `platformio.ini` unless it already exists
    pub fn init_project(&self, session: &mut SessionContext) -> Result<InitOutcome> {
        let environment = session.environment().to_string();
        if environment.is_empty() {
            return Err(PioBrewError::Config("No environment selected".to_string()));
        }

        let config = ProjectConfigFile::load(session.config_file_path())?;
        if config.has_environment(&environment) {
            log::debug!("{} already initialized", environment);
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let cwd = session.working_directory().clone();
        fs::create_dir_all(&cwd)?;
        crate::progress!(
            self.reporter,
            info,
            "Initializing {} for {}",
            session.file_name,
            environment
        );
        if let Err(e) = run_checked(
            self.runner.as_ref(),
            &cwd,
            &args(["init", "-b", environment.as_str()]),
            &self.reporter,
        ) {
            session.last_run_failed = true;
            return Err(e);
        }

        if session.is_native_layout {
            self.move_into_source_dir(session)?;
        } else {
            self.override_src(session)?;
        }
        Ok(InitOutcome::Initialized)
    }

    /// Native projects keep their sources in `src/`
    fn move_into_source_dir(&self, session: &mut SessionContext) -> Result<()> {
        let Some(path) = session.source_path.clone() else {
            return Ok(());
        };
        let in_source_dir = path
            .parent()
            .and_then(|dir| dir.file_name())
            .is_some_and(|name| name == SOURCE_DIR);
        if in_source_dir {
            return Ok(());
        }

        let moved = relocate_into_src(&path)?;
        self.host.open_file(&moved);
        session.source_path = Some(moved);
        Ok(())
    }

    /// Point `src_dir` at the sketch directory instead of moving the file
    fn override_src(&self, session: &SessionContext) -> Result<()> {
        let mut config = ProjectConfigFile::load(session.config_file_path())?;
        config.set_global("src_dir", session.sketch_dir.to_string_lossy().into_owned());
        config.write()?;
        log::debug!(
            "[{}] src_dir = {}",
            GLOBAL_SECTION,
            session.sketch_dir.display()
        );
        Ok(())
    }

    pub fn build(&self, session: &mut SessionContext) -> Result<bool> {
        if !session.is_eligible {
            return Ok(false);
        }
        self.banner(session);

        self.init_project(session)?;

        let environment = session.environment().to_string();
        let result = run_checked(
            self.runner.as_ref(),
            session.working_directory(),
            &args(["run", "-e", environment.as_str()]),
            &self.reporter,
        );
        session.last_run_failed = result.is_err();
        result?;
        Ok(true)
    }

    pub fn upload(&self, session: &mut SessionContext) -> Result<bool> {
        if !session.is_eligible {
            return Ok(false);
        }

        if !self.ota_eligible(session, true) {
            return Ok(false);
        }

        if self.host.stop_serial_monitors() {
            self.prefs.set_autorun_monitor(true)?;
        }

        self.banner(session);
        self.init_project(session)?;

        if !session.auth_required {
            self.prefs.set_auth(AUTH_NOT_REQUIRED)?;
        }

        let programmer = self.prefs.programmer();
        match programmer.as_deref() {
            Some(choice) => self.programmer(session, Some(choice))?,
            None => self.apply_auth_flag(session)?,
        }

        let command = upload_command(session.environment(), session.port(), programmer.is_some());
        let result = run_checked(
            self.runner.as_ref(),
            session.working_directory(),
            &command,
            &self.reporter,
        );
        session.last_run_failed = result.is_err();
        result?;

        if self.prefs.autorun_monitor() {
            self.host.start_serial_monitor(session.port());
            self.prefs.set_autorun_monitor(false)?;
        }
        Ok(true)
    }

    pub fn clean(&self, session: &mut SessionContext) -> Result<bool> {
        if !session.is_eligible {
            return Ok(false);
        }

        let environment = session.environment().to_string();
        let result = run_checked(
            self.runner.as_ref(),
            session.working_directory(),
            &args(["run", "-t", "clean", "-e", environment.as_str()]),
            &self.reporter,
        );
        session.last_run_failed = result.is_err();
        result?;
        Ok(true)
    }

    /// Whether the persisted target can take an upload at all.
    ///
    /// Network ports only work for wireless-capable (Espressif) parts.
    pub fn ota_eligible(&self, session: &SessionContext, feedback: bool) -> bool {
        let native = session.is_native_layout;
        let (Some(environment), Some(port)) = (self.prefs.environment(native), self.prefs.port())
        else {
            return false;
        };

        let config = ProjectConfigFile::load(session.config_file_path()).ok();
        let mcu = self
            .catalog()
            .mcu_for(&environment, config.as_ref())
            .unwrap_or_default();

        if !is_serial_port(&port) && !is_wireless_mcu(&mcu) {
            if feedback {
                self.diagnostic(
                    &session.file_name,
                    &format!(
                        "cannot be uploaded to {}: over-the-air uploads need an Espressif board ({} is {})",
                        port,
                        environment,
                        if mcu.is_empty() { "unknown" } else { mcu.as_str() }
                    ),
                );
            }
            return false;
        }
        true
    }

    /// Replace the upload flags of the selected environment with `choice`
    pub fn programmer(&self, session: &SessionContext, choice: Option<&str>) -> Result<()> {
        let mut config = ProjectConfigFile::load(session.config_file_path())?;
        apply_programmer(&mut config, session.environment(), choice, session.port())
    }

    /// Write `--auth=<password>` when the target asked for one
    fn apply_auth_flag(&self, session: &SessionContext) -> Result<()> {
        let Some(password) = session.auth_value.as_deref() else {
            return Ok(());
        };
        if !session.auth_required {
            return Ok(());
        }

        let mut config = ProjectConfigFile::load(session.config_file_path())?;
        if let Some(section) = config.env_section_mut(session.environment()) {
            section.set("upload_flags", format!("--auth={}", password));
            config.write()?;
        }
        Ok(())
    }

    fn banner(&self, session: &SessionContext) {
        crate::progress!(
            self.reporter,
            info,
            "[ {} {} ] {}",
            crate::APP_NAME,
            crate::VERSION,
            session.file_name
        );
    }
}

/// Arguments for the upload step, by target family and programmer
pub fn upload_command(environment: &str, port: &str, has_programmer: bool) -> Vec<String> {
    if environment.contains("teensy") {
        args(["run", "-t", "upload", "-e", environment])
    } else if has_programmer {
        args(["run", "-t", "program", "-e", environment])
    } else {
        args(["run", "-t", "upload", "--upload-port", port, "-e", environment])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_command_forms() {
        assert_eq!(
            upload_command("teensy31", "COM3", true),
            args(["run", "-t", "upload", "-e", "teensy31"])
        );
        assert_eq!(
            upload_command("uno", "COM3", true),
            args(["run", "-t", "program", "-e", "uno"])
        );
        assert_eq!(
            upload_command("uno", "COM3", false),
            args(["run", "-t", "upload", "--upload-port", "COM3", "-e", "uno"])
        );
    }
}
