//! Test fixtures and mocks for piobrew testing
//!
//! Provides a scripted editor host, a recording `pio` runner, a fixed port
//! scanner and a temporary environment wiring them into an orchestrator.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use piobrew::config::{AppConfig, Preferences};
use piobrew::errors::Result;
use piobrew::models::selection::{InputCallback, SelectionCallback, SelectionRequest};
use piobrew::models::{NetworkService, ProgressEvent};
use piobrew::orchestrator::{ActiveFile, Host};
use piobrew::ports::{PortResolver, PortScanner};
use piobrew::process::{ProcessRunner, RunOutcome};
use piobrew::utils::logging::{EventReceiver, ProgressReporter};
use piobrew::{Collaborators, Orchestrator};
use serde_json::json;
use tempfile::TempDir;

/// A scripted answer to the next request of the matching kind
#[derive(Debug, Clone)]
pub enum Answer {
    Select(i32),
    Input(Option<String>),
}

/// Host that answers from a script, synchronously.
///
/// Requests without a scripted answer are recorded and left unanswered.
#[derive(Default)]
pub struct MockHost {
    file: Mutex<ActiveFile>,
    answers: Mutex<VecDeque<Answer>>,
    selections: Mutex<Vec<SelectionRequest>>,
    prompts: Mutex<Vec<String>>,
    opened: Mutex<Vec<PathBuf>>,
    saves: AtomicUsize,
    monitor_running: AtomicBool,
    monitors_started: Mutex<Vec<String>>,
}

impl MockHost {
    pub fn set_file(&self, file: ActiveFile) {
        *self.file.lock().unwrap() = file;
    }

    /// Make a file on disk the active one
    pub fn open_path(&self, path: &Path) {
        let contents = fs::read_to_string(path).unwrap_or_default();
        self.set_file(ActiveFile {
            path: Some(path.to_path_buf()),
            view_name: path.file_name().unwrap().to_string_lossy().into_owned(),
            contents,
            is_dirty: false,
        });
    }

    pub fn answer(&self, answer: Answer) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn selections(&self) -> Vec<SelectionRequest> {
        self.selections.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_monitor_running(&self, running: bool) {
        self.monitor_running.store(running, Ordering::SeqCst);
    }

    pub fn monitors_started(&self) -> Vec<String> {
        self.monitors_started.lock().unwrap().clone()
    }

    fn next_select(&self) -> Option<i32> {
        let mut answers = self.answers.lock().unwrap();
        match answers.front() {
            Some(Answer::Select(index)) => {
                let index = *index;
                answers.pop_front();
                Some(index)
            }
            _ => None,
        }
    }

    fn next_input(&self) -> Option<Option<String>> {
        let mut answers = self.answers.lock().unwrap();
        match answers.front() {
            Some(Answer::Input(text)) => {
                let text = text.clone();
                answers.pop_front();
                Some(text)
            }
            _ => None,
        }
    }
}

impl Host for MockHost {
    fn active_file(&self) -> ActiveFile {
        self.file.lock().unwrap().clone()
    }

    fn save_active(&self) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.file.lock().unwrap().is_dirty = false;
        Ok(())
    }

    fn open_file(&self, path: &Path) {
        self.opened.lock().unwrap().push(path.to_path_buf());
        let mut file = self.file.lock().unwrap();
        file.path = Some(path.to_path_buf());
        file.is_dirty = false;
    }

    fn select(&self, request: SelectionRequest, on_done: SelectionCallback) {
        self.selections.lock().unwrap().push(request);
        // Locks are released before re-entering the flow
        if let Some(index) = self.next_select() {
            on_done(index);
        }
    }

    fn prompt_input(&self, caption: &str, on_done: InputCallback) {
        self.prompts.lock().unwrap().push(caption.to_string());
        if let Some(text) = self.next_input() {
            on_done(text);
        }
    }

    fn stop_serial_monitors(&self) -> bool {
        self.monitor_running.swap(false, Ordering::SeqCst)
    }

    fn start_serial_monitor(&self, port: &str) {
        self.monitors_started.lock().unwrap().push(port.to_string());
    }
}

/// One recorded invocation of the external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCall {
    pub cwd: PathBuf,
    pub args: Vec<String>,
}

impl RunnerCall {
    pub fn command(&self) -> String {
        self.args.join(" ")
    }
}

/// Runner that records calls and imitates `pio init` and `pio boards`
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<RunnerCall>>,
    failing: Mutex<Vec<String>>,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
}

impl MockRunner {
    /// Fail every command whose argument line starts with `prefix`
    pub fn fail_on(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    /// Block the next command until the returned sender fires
    pub fn hold(&self) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(RunnerCall::command).collect()
    }

    /// Number of calls whose first argument is `subcommand`
    pub fn count(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.args.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    fn write_init(cwd: &Path, args: &[String]) -> std::io::Result<()> {
        let board = args
            .iter()
            .position(|a| a == "-b")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_default();
        fs::create_dir_all(cwd.join("src"))?;
        let ini = cwd.join("platformio.ini");
        let mut content = fs::read_to_string(&ini).unwrap_or_default();
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!(
            "[env:{board}]\nplatform = {}\nboard = {board}\nframework = arduino\n",
            platform_for(&board)
        ));
        fs::write(ini, content)
    }
}

impl ProcessRunner for MockRunner {
    fn run(&self, cwd: &Path, args: &[String], reporter: &ProgressReporter) -> Result<RunOutcome> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(rx) = gate {
            let _ = rx.recv();
        }

        self.calls.lock().unwrap().push(RunnerCall {
            cwd: cwd.to_path_buf(),
            args: args.to_vec(),
        });

        let line = args.join(" ");
        if self.failing.lock().unwrap().iter().any(|p| line.starts_with(p)) {
            reporter.output("Compiling .pio/build/main.cpp.o".to_string());
            reporter.output("error: 'LED_BUILTIN' was not declared in this scope".to_string());
            return Ok(RunOutcome {
                success: false,
                output: vec![
                    "Compiling .pio/build/main.cpp.o".to_string(),
                    "error: 'LED_BUILTIN' was not declared in this scope".to_string(),
                ],
            });
        }

        let output = match args.first().map(String::as_str) {
            Some("init") => {
                Self::write_init(cwd, args)?;
                vec!["Project has been successfully initialized!".to_string()]
            }
            Some("boards") => vec![
                "Fetching boards...".to_string(),
                board_table_json().to_string(),
            ],
            _ => vec!["[SUCCESS]".to_string()],
        };
        for line in &output {
            reporter.output(line.clone());
        }
        Ok(RunOutcome {
            success: true,
            output,
        })
    }
}

/// Scanner returning fixed serial ports and network services
#[derive(Default)]
pub struct MockScanner {
    pub serial: Vec<String>,
    pub services: Vec<NetworkService>,
}

impl MockScanner {
    pub fn serial(ports: &[&str]) -> Self {
        Self {
            serial: ports.iter().map(|p| p.to_string()).collect(),
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, address: &str, board: &str, auth_upload: bool) -> Self {
        self.services.push(NetworkService {
            address: address.parse::<IpAddr>().unwrap(),
            hostname: format!("{}.local", board),
            board: board.to_string(),
            auth_upload,
        });
        self
    }
}

impl PortScanner for MockScanner {
    fn serial_ports(&self) -> Result<Vec<String>> {
        Ok(self.serial.clone())
    }

    fn network_services(&self) -> Result<Vec<NetworkService>> {
        Ok(self.services.clone())
    }
}

fn platform_for(board: &str) -> &'static str {
    match board {
        "esp32dev" => "espressif32",
        "nodemcuv2" => "espressif8266",
        "teensy31" => "teensy",
        _ => "atmelavr",
    }
}

/// Board table in the `pio boards --json-output` array form
pub fn board_table_json() -> serde_json::Value {
    json!([
        {"id": "uno", "name": "Arduino Uno", "platform": "atmelavr", "mcu": "ATMEGA328P", "vendor": "Arduino", "frameworks": ["arduino"]},
        {"id": "esp32dev", "name": "Espressif ESP32 Dev Module", "platform": "espressif32", "mcu": "ESP32", "vendor": "Espressif", "frameworks": ["arduino", "espidf"]},
        {"id": "nodemcuv2", "name": "NodeMCU 1.0 (ESP-12E Module)", "platform": "espressif8266", "mcu": "ESP8266", "vendor": "NodeMCU", "frameworks": ["arduino"]},
        {"id": "teensy31", "name": "Teensy 3.1 / 3.2", "platform": "teensy", "mcu": "MK20DX256", "vendor": "Teensy", "frameworks": ["arduino"]}
    ])
}

pub const BLINK_SKETCH: &str = "void setup() {\n  pinMode(LED_BUILTIN, OUTPUT);\n}\n\nvoid loop() {\n  digitalWrite(LED_BUILTIN, HIGH);\n}\n";

/// Temporary directory with an orchestrator wired to the mocks
pub struct TestEnvironment {
    pub dir: TempDir,
    pub config: AppConfig,
    pub host: Arc<MockHost>,
    pub runner: Arc<MockRunner>,
    pub preferences: Arc<Preferences>,
    pub orchestrator: Arc<Orchestrator>,
    events: EventReceiver,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::build(MockScanner::default(), false)
    }

    pub fn with_scanner(scanner: MockScanner) -> Self {
        Self::build(scanner, false)
    }

    pub fn with_feedback() -> Self {
        Self::build(MockScanner::default(), true)
    }

    fn build(scanner: MockScanner, feedback: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::rooted_at(dir.path());
        config.feedback = feedback;

        fs::create_dir_all(&config.cache_dir).unwrap();
        fs::write(
            config.board_cache_path(),
            board_table_json().to_string(),
        )
        .unwrap();

        let host = Arc::new(MockHost::default());
        let runner = Arc::new(MockRunner::default());
        let preferences = Arc::new(Preferences::load(config.preferences_path()).unwrap());
        let (reporter, events) = ProgressReporter::channel();
        let scanner: Arc<dyn PortScanner> = Arc::new(scanner);

        let orchestrator = Orchestrator::new(
            Collaborators {
                host: host.clone(),
                preferences: preferences.clone(),
                runner: runner.clone(),
                ports: Arc::new(PortResolver::new(scanner, config.port_cache_path())),
                reporter,
            },
            config.clone(),
        );

        Self {
            dir,
            config,
            host,
            runner,
            preferences,
            orchestrator,
            events,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<root>/sketches/<name>/<name>.ino` and make it active
    pub fn sketch(&self, name: &str) -> PathBuf {
        let dir = self.root().join("sketches").join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.ino", name));
        fs::write(&path, BLINK_SKETCH).unwrap();
        self.host.open_path(&path);
        path
    }

    /// Native project with `src/main.cpp` and the given environments, active
    pub fn native_project(&self, name: &str, environments: &[&str]) -> PathBuf {
        let root = self.root().join("projects").join(name);
        fs::create_dir_all(root.join("src")).unwrap();
        let mut ini = String::from("[platformio]\ndefault_envs = ");
        ini.push_str(&environments.join(", "));
        ini.push('\n');
        for env in environments {
            ini.push_str(&format!(
                "\n[env:{env}]\nplatform = {}\nboard = {env}\nframework = arduino\n",
                platform_for(env)
            ));
        }
        fs::write(root.join("platformio.ini"), ini).unwrap();

        let path = root.join("src").join("main.cpp");
        fs::write(&path, BLINK_SKETCH).unwrap();
        self.host.open_path(&path);
        path
    }

    /// Persist `board` as the only board and the selected environment
    pub fn select_board(&self, native: bool, board: &str) {
        self.preferences.select_board(native, board).unwrap();
        self.preferences.set_environment(native, board).unwrap();
    }

    /// Events reported so far
    pub fn events(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn errors(&mut self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}
