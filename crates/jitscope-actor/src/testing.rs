//! An in-memory [`Host`] for exercising the actor without a real runtime.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{CompilationHook, DebuggeeScript, DebuggerSession, Host, RawCompilation};

#[derive(Default)]
struct HostState {
    hook: Option<CompilationHook>,
    enabled: bool,
    debuggees: bool,
    sessions_opened: usize,
    live_sessions: usize,
}

/// A host whose compilations are triggered by hand with [`ScriptedHost::compile`].
///
/// Clones share state, so a test can keep one handle while the actor owns
/// another.
#[derive(Clone, Default)]
pub struct ScriptedHost {
    state: Arc<Mutex<HostState>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the installed hook as if the compiler had just finished.
    /// Returns `false` when nothing is listening.
    pub fn compile(&self, scripts: Vec<ScriptedScript>, json: &str) -> bool {
        let hook = {
            let state = self.state.lock();
            if !state.enabled {
                return false;
            }
            state.hook.clone()
        };
        let Some(hook) = hook else {
            return false;
        };
        hook.fire(RawCompilation {
            scripts: scripts
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn DebuggeeScript>)
                .collect(),
            json: json.to_owned(),
        })
    }

    pub fn hook_installed(&self) -> bool {
        self.state.lock().hook.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn has_debuggees(&self) -> bool {
        self.state.lock().debuggees
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().sessions_opened
    }

    pub fn live_sessions(&self) -> usize {
        self.state.lock().live_sessions
    }
}

impl Host for ScriptedHost {
    type Session = ScriptedSession;

    fn make_debugger(&self) -> ScriptedSession {
        let mut state = self.state.lock();
        state.sessions_opened += 1;
        state.live_sessions += 1;
        ScriptedSession {
            state: Arc::clone(&self.state),
        }
    }
}

pub struct ScriptedSession {
    state: Arc<Mutex<HostState>>,
}

impl DebuggerSession for ScriptedSession {
    fn set_compilation_hook(&mut self, hook: Option<CompilationHook>) {
        self.state.lock().hook = hook;
    }

    fn add_debuggees(&mut self) {
        self.state.lock().debuggees = true;
    }

    fn remove_all_debuggees(&mut self) {
        self.state.lock().debuggees = false;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.live_sessions = state.live_sessions.saturating_sub(1);
    }
}

/// Script metadata with builder-style setters.
#[derive(Debug, Clone, Default)]
pub struct ScriptedScript {
    pub display_name: Option<String>,
    pub url: String,
    pub start_line: u32,
    pub line_count: u32,
    pub source_start: u32,
    pub source_length: u32,
}

impl ScriptedScript {
    pub fn named(name: &str) -> Self {
        Self {
            display_name: Some(name.to_owned()),
            url: String::from("file:///scripted.js"),
            start_line: 1,
            line_count: 1,
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self {
            url: String::from("file:///scripted.js"),
            start_line: 1,
            line_count: 1,
            ..Self::default()
        }
    }

    pub fn at(mut self, url: &str, start_line: u32) -> Self {
        self.url = url.to_owned();
        self.start_line = start_line;
        self
    }
}

impl DebuggeeScript for ScriptedScript {
    fn display_name(&self) -> Option<String> {
        self.display_name.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn start_line(&self) -> u32 {
        self.start_line
    }

    fn line_count(&self) -> u32 {
        self.line_count
    }

    fn source_start(&self) -> u32 {
        self.source_start
    }

    fn source_length(&self) -> u32 {
        self.source_length
    }
}
