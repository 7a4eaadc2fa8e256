//! Terminal implementation of the orchestrator host

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::Result;
use crate::models::selection::{CANCELLED, InputCallback, SelectionCallback, SelectionRequest};
use crate::orchestrator::{ActiveFile, Host};

type Input = Box<dyn BufRead + Send>;

/// Answers selections with numbered prompts and reads the answers line by line.
///
/// Without input (non-interactive) every selection takes its default row and
/// every text prompt is dismissed.
pub struct TerminalHost {
    file: Mutex<ActiveFile>,
    input: Mutex<Option<Input>>,
}

impl TerminalHost {
    /// Host for a file on disk, prompting on stdin when `interactive`
    pub fn for_path(path: &Path, interactive: bool) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let input: Option<Input> = if interactive {
            Some(Box::new(BufReader::new(io::stdin())))
        } else {
            None
        };
        Ok(Self::new(
            ActiveFile {
                path: Some(path.to_path_buf()),
                view_name: file_name(path),
                contents,
                is_dirty: false,
            },
            input,
        ))
    }

    /// Host for an unsaved buffer read from stdin; prompts are not possible
    pub fn for_stdin_buffer() -> Result<Self> {
        let mut contents = String::new();
        io::stdin().read_to_string(&mut contents)?;
        Ok(Self::new(
            ActiveFile {
                path: None,
                view_name: "untitled".to_string(),
                contents,
                is_dirty: true,
            },
            None,
        ))
    }

    /// Host without an active file, for commands that only ask questions
    pub fn prompts_only(interactive: bool) -> Self {
        let input: Option<Input> = if interactive {
            Some(Box::new(BufReader::new(io::stdin())))
        } else {
            None
        };
        Self::new(ActiveFile::default(), input)
    }

    pub fn new(file: ActiveFile, input: Option<Input>) -> Self {
        Self {
            file: Mutex::new(file),
            input: Mutex::new(input),
        }
    }

    /// Path of the active file, which changes when the buffer is saved or moved
    pub fn current_path(&self) -> Option<PathBuf> {
        self.file.lock().ok().and_then(|f| f.path.clone())
    }

    /// Next answer line; `None` when non-interactive or at end of input
    fn read_answer(&self) -> Option<String> {
        let mut guard = self.input.lock().ok()?;
        let input = guard.as_mut()?;
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn is_interactive(&self) -> bool {
        self.input.lock().map(|i| i.is_some()).unwrap_or(false)
    }
}

impl Host for TerminalHost {
    fn active_file(&self) -> ActiveFile {
        self.file.lock().map(|f| f.clone()).unwrap_or_default()
    }

    fn save_active(&self) -> Result<()> {
        // Files given on the command line are read from disk, never dirty
        Ok(())
    }

    fn open_file(&self, path: &Path) {
        log::info!("Now working on {}", path.display());
        if let Ok(mut file) = self.file.lock() {
            file.path = Some(path.to_path_buf());
            file.view_name = file_name(path);
            file.is_dirty = false;
        }
    }

    fn select(&self, request: SelectionRequest, on_done: SelectionCallback) {
        if !self.is_interactive() {
            log::debug!(
                "{}: taking default {:?}",
                request.title,
                request.item(request.default_index as i32)
            );
            on_done(request.default_index as i32);
            return;
        }

        println!("{}", request.title);
        for (index, item) in request.items.iter().enumerate() {
            let marker = if index == request.default_index { '*' } else { ' ' };
            println!("{} {:>3}) {}", marker, index, item.label);
        }
        print!("Choice [{}] (q to cancel): ", request.default_index);
        let _ = io::stdout().flush();

        let index = match self.read_answer() {
            None => CANCELLED,
            Some(answer) => parse_choice(&answer, request.default_index, request.items.len()),
        };
        on_done(index);
    }

    fn prompt_input(&self, caption: &str, on_done: InputCallback) {
        if !self.is_interactive() {
            log::warn!("{} is needed but prompting is disabled", caption);
            on_done(None);
            return;
        }

        print!("{}: ", caption);
        let _ = io::stdout().flush();
        on_done(self.read_answer().filter(|a| !a.is_empty()));
    }

    fn stop_serial_monitors(&self) -> bool {
        false
    }

    fn start_serial_monitor(&self, port: &str) {
        log::info!("Serial monitor requested for {}", port);
    }
}

/// Map an answer to a row index; empty takes the default
fn parse_choice(answer: &str, default_index: usize, len: usize) -> i32 {
    if answer.is_empty() {
        return default_index as i32;
    }
    match answer.parse::<usize>() {
        Ok(index) if index < len => index as i32,
        _ => CANCELLED,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
