//! Loading the session and resolving preconditions

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::{FlowState, Orchestrator, Precondition, RunningGuard, lock};
use crate::config::AuthState;
use crate::errors::PioBrewError;
use crate::models::port::{MANUAL_ADDRESS_INDEX, PortList, is_serial_port};
use crate::models::selection::{CANCELLED, SelectionItem, SelectionRequest};
use crate::models::{Action, SessionContext, is_wireless_mcu};
use crate::ports::add_manual_address;
use crate::project::ProjectConfigFile;
use crate::project::source::{has_native_layout, is_firmware_source, save_buffer, working_directory};

impl Orchestrator {
    /// One pass of the flow toward `action`; re-entered by every callback
    pub fn process(self: &Arc<Self>, action: Action) -> FlowState {
        let state = match self.load_session(action) {
            Ok(mut session) => match self.check_preconditions(&mut session) {
                Some(state) => state,
                None => self.start(session),
            },
            Err(state) => state,
        };
        match state {
            // Recorded before the request went out, a synchronous answer may
            // already have recorded a later pass
            FlowState::Suspended(_) => state,
            _ => self.record(state),
        }
    }

    /// Rebuild the session from the host and the preferences.
    ///
    /// `Err` carries the state to stop in when the file cannot be processed.
    pub fn load_session(&self, action: Action) -> Result<SessionContext, FlowState> {
        let feedback = self.config.feedback;
        let file = self.host.active_file();
        let mut session = SessionContext::new(action);
        session.source_size = file.size();

        if file.is_monitor_view() {
            return Err(self.reject(feedback, PioBrewError::IneligibleFile(file.view_name)));
        }

        if file.size() == 0 {
            return Err(self.reject(feedback, PioBrewError::EmptyBuffer));
        }

        let path = match file.path {
            Some(path) => {
                if !is_firmware_source(&path) {
                    let error = PioBrewError::IneligibleFile(display_name(&path));
                    return Err(self.reject(feedback, error));
                }
                if file.is_dirty {
                    if let Err(e) = self.host.save_active() {
                        self.reporter.warning(format!("Could not save {}: {}", path.display(), e));
                    }
                }
                path
            }
            None => {
                let saved = match save_buffer(&self.config.temp_dir, &file.contents) {
                    Ok(saved) => saved,
                    Err(e) => {
                        self.reporter.error(format!("Could not save the sketch: {}", e));
                        return Err(FlowState::Rejected);
                    }
                };
                self.host.open_file(&saved);
                if !is_firmware_source(&saved) {
                    let error = PioBrewError::IneligibleFile(display_name(&saved));
                    return Err(self.reject(true, error));
                }
                saved
            }
        };

        session.is_eligible = true;
        session.file_name = display_name(&path);
        session.sketch_dir = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
        session.is_native_layout = self.prefs.is_native() || has_native_layout(&path);
        session.set_working_directory(working_directory(
            &path,
            session.is_native_layout,
            &self.config.build_dir,
        ));
        session.source_path = Some(path);

        self.sync_environments(&session);

        session.selected_environment = self.prefs.environment(session.is_native_layout);
        session.selected_port = self.prefs.port();
        if let AuthState::Password(password) = self.prefs.auth() {
            session.auth_value = Some(password);
        }

        log::debug!(
            "Session for {}: env={:?} port={:?} native={} cwd={}",
            session.file_name,
            session.selected_environment,
            session.selected_port,
            session.is_native_layout,
            session.working_directory().display()
        );
        Ok(session)
    }

    /// Record the environments of an existing `platformio.ini` as selectable.
    ///
    /// Only done for projects marked `protected`.
    pub fn sync_environments(&self, session: &SessionContext) {
        if !self.prefs.is_protected() || !session.config_file_path().exists() {
            return;
        }
        let config = match ProjectConfigFile::load(session.config_file_path()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Could not read {}: {}", session.config_file_path().display(), e);
                return;
            }
        };

        let native = session.is_native_layout;
        let mut environments = config.environments();
        if native {
            for known in self.prefs.boards(true) {
                if !environments.contains(&known) {
                    environments.push(known);
                }
            }
        }
        if environments != self.prefs.boards(native) {
            if let Err(e) = self.prefs.set_boards(native, environments) {
                log::warn!("{}", e);
            }
        }
    }

    /// First unmet precondition, after issuing its request
    fn check_preconditions(self: &Arc<Self>, session: &mut SessionContext) -> Option<FlowState> {
        let action = session.pending_action;
        let native = session.is_native_layout;

        if self.prefs.boards(native).is_empty() {
            return Some(self.request_board(action, native));
        }

        if session.selected_environment.is_none() {
            return Some(self.request_environment(action, native));
        }

        if !action.needs_port() {
            return None;
        }

        let list = match self.discovered_ports(session.selected_port.as_deref()) {
            Some(list) => list,
            None => return Some(FlowState::Aborted),
        };

        if !list.contains_port(session.port()) {
            return Some(self.request_port(Some(action), list));
        }

        let port = session.port().to_string();
        if !is_serial_port(&port) && self.mcu_is_wireless(session) {
            session.auth_required = self.ports.auth_required(&port);
            let has_password = matches!(self.prefs.auth(), AuthState::Password(_));
            if session.auth_required && !has_password {
                return Some(self.request_auth(action));
            }
        }

        None
    }

    /// Hand the action to a worker thread unless one is already running
    fn start(self: &Arc<Self>, session: SessionContext) -> FlowState {
        let action = session.pending_action;
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            crate::progress!(
                self.reporter,
                warning,
                "Cannot {} now, another action is still running",
                action
            );
            return FlowState::Busy;
        }

        let this = Arc::clone(self);
        let guard = RunningGuard(Arc::clone(&self.running));
        let spawned = self.executor.spawn(action.name(), move || {
            let _guard = guard;
            this.execute(session)
        });

        match spawned {
            Ok(handle) => {
                *lock(&self.active) = Some(handle);
                FlowState::Started(action)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.reporter.error(e.to_string());
                FlowState::Aborted
            }
        }
    }

    /// Port list of this flow, discovering it on a joined worker when missing
    fn discovered_ports(&self, current_port: Option<&str>) -> Option<PortList> {
        if let Some(list) = lock(&self.chain).port_list.clone() {
            return Some(list);
        }

        let ports = Arc::clone(&self.ports);
        let current = current_port.map(str::to_string);
        match self
            .executor
            .run_blocking("ports", move || ports.list_serial_ports(current.as_deref()))
        {
            Ok(list) => {
                lock(&self.chain).port_list = Some(list.clone());
                Some(list)
            }
            Err(e) => {
                self.reporter.error(e.to_string());
                None
            }
        }
    }

    /// Discover ports and ask for one, without a pending action
    pub fn select_port(self: &Arc<Self>) -> FlowState {
        *lock(&self.chain) = Default::default();
        match self.discovered_ports(self.prefs.port().as_deref()) {
            Some(list) => self.request_port(None, list),
            None => self.record(FlowState::Aborted),
        }
    }

    fn mcu_is_wireless(&self, session: &SessionContext) -> bool {
        let config = ProjectConfigFile::load(session.config_file_path()).ok();
        self.catalog()
            .mcu_for(session.environment(), config.as_ref())
            .map(|mcu| is_wireless_mcu(&mcu))
            .unwrap_or(false)
    }

    fn request_board(self: &Arc<Self>, action: Action, native: bool) -> FlowState {
        let request = self.catalog().board_menu();
        if request.items.is_empty() {
            self.reporter.error(
                "The board list is empty, run `piobrew refresh-boards` first".to_string(),
            );
            return FlowState::Aborted;
        }

        let state = self.suspend(Precondition::Board);
        let this = Arc::clone(self);
        let pending = request.clone();
        self.host.select(
            request,
            Box::new(move |index| {
                let Some(item) = pending.item(index) else {
                    log::debug!("Board selection cancelled");
                    return;
                };
                let saved = this
                    .prefs
                    .select_board(native, &item.value)
                    .and_then(|_| this.prefs.set_environment(native, &item.value));
                match saved {
                    Ok(()) => {
                        this.process(action);
                    }
                    Err(e) => this.reporter.error(e.to_string()),
                }
            }),
        );
        state
    }

    fn request_environment(self: &Arc<Self>, action: Action, native: bool) -> FlowState {
        let catalog = self.catalog();
        let current = self.prefs.environment(native);
        let boards = self.prefs.boards(native);

        let items = boards
            .iter()
            .map(|id| {
                let label = catalog
                    .get(id)
                    .map(|b| b.menu_label())
                    .unwrap_or_else(|| id.clone());
                SelectionItem::new(label, id.clone())
            })
            .collect();
        let default = current
            .and_then(|env| boards.iter().position(|b| *b == env))
            .unwrap_or(0);
        let request = SelectionRequest::new("Select an environment", items).with_default(default);

        let state = self.suspend(Precondition::Environment);
        let this = Arc::clone(self);
        let pending = request.clone();
        self.host.select(
            request,
            Box::new(move |index| {
                let Some(item) = pending.item(index) else {
                    log::debug!("Environment selection cancelled");
                    return;
                };
                match this.prefs.set_environment(native, &item.value) {
                    Ok(()) => {
                        this.process(action);
                    }
                    Err(e) => this.reporter.error(e.to_string()),
                }
            }),
        );
        state
    }

    fn request_port(self: &Arc<Self>, action: Option<Action>, list: PortList) -> FlowState {
        let items = list
            .entries
            .iter()
            .map(|entry| {
                let label = if entry.metadata().is_empty() {
                    entry.label().to_string()
                } else {
                    format!("{} | {}", entry.label(), entry.metadata())
                };
                SelectionItem::new(label, entry.label())
            })
            .collect();
        let request =
            SelectionRequest::new("Select a port", items).with_default(list.selected_index);

        let state = self.suspend(Precondition::Port);
        let this = Arc::clone(self);
        let pending = request.clone();
        self.host.select(
            request,
            Box::new(move |index| {
                // Row 0 is the "select a port" header
                if index == CANCELLED || index == 0 {
                    log::debug!("Port selection cancelled");
                    return;
                }
                if index as usize == MANUAL_ADDRESS_INDEX {
                    this.request_manual_address(action);
                    return;
                }
                let Some(item) = pending.item(index) else {
                    return;
                };
                match this.prefs.set_port(&item.value) {
                    Ok(()) => {
                        if let Some(action) = action {
                            this.process(action);
                        }
                    }
                    Err(e) => this.reporter.error(e.to_string()),
                }
            }),
        );
        state
    }

    fn request_manual_address(self: &Arc<Self>, action: Option<Action>) {
        let this = Arc::clone(self);
        self.host.prompt_input(
            "Network address of the board",
            Box::new(move |input| {
                let Some(address) = input.map(|a| a.trim().to_string()).filter(|a| !a.is_empty())
                else {
                    log::debug!("Manual address cancelled");
                    return;
                };
                if let Err(e) = this.prefs.set_port(&address) {
                    this.reporter.error(e.to_string());
                    return;
                }

                let updated = {
                    let mut chain = lock(&this.chain);
                    chain.port_list.as_mut().map(|list| {
                        add_manual_address(list, &address);
                        list.clone()
                    })
                };
                if let Some(list) = updated {
                    if let Err(e) = this.ports.save_cache(&list) {
                        log::warn!("Could not cache port list: {}", e);
                    }
                }

                if let Some(action) = action {
                    this.process(action);
                }
            }),
        );
    }

    fn request_auth(self: &Arc<Self>, action: Action) -> FlowState {
        let state = self.suspend(Precondition::Auth);
        let this = Arc::clone(self);
        self.host.prompt_input(
            "OTA password",
            Box::new(move |input| {
                let Some(password) = input.filter(|p| !p.is_empty()) else {
                    log::debug!("Password prompt cancelled");
                    return;
                };
                match this.prefs.set_auth(&password) {
                    Ok(()) => {
                        this.process(action);
                    }
                    Err(e) => this.reporter.error(e.to_string()),
                }
            }),
        );
        state
    }

    fn suspend(&self, precondition: Precondition) -> FlowState {
        self.record(FlowState::Suspended(precondition))
    }

    /// Stop for a file that cannot be processed
    fn reject(&self, feedback: bool, error: PioBrewError) -> FlowState {
        if !feedback {
            return FlowState::Ignored;
        }
        self.diagnostic("", &error.to_string());
        FlowState::Rejected
    }

    pub(crate) fn diagnostic(&self, file_name: &str, message: &str) {
        let time = chrono::Local::now().format("%H:%M:%S");
        let text = if file_name.is_empty() {
            format!("[{}] {}", time, message)
        } else {
            format!("[{}] {} {}", time, file_name, message)
        };
        self.reporter.error(text);
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

