use std::sync::Arc;

use jitscope_types::Script;
use tokio::sync::mpsc;

/// The instrumented runtime, as seen by the actor.
pub trait Host: Send + 'static {
    type Session: DebuggerSession;

    /// Opens a fresh debugger session. The actor holds it for as long as it
    /// stays attached and drops it on detach.
    fn make_debugger(&self) -> Self::Session;
}

/// A debugger session inside the runtime.
pub trait DebuggerSession: Send + 'static {
    /// Installs (`Some`) or removes (`None`) the compilation-complete hook.
    fn set_compilation_hook(&mut self, hook: Option<CompilationHook>);
    fn add_debuggees(&mut self);
    fn remove_all_debuggees(&mut self);
    fn set_enabled(&mut self, enabled: bool);
}

/// A live script handle owned by the runtime.
///
/// Only the plain metadata is read out of it; the handle itself never
/// leaves the actor.
pub trait DebuggeeScript: Send + Sync {
    fn display_name(&self) -> Option<String>;
    fn url(&self) -> String;
    fn start_line(&self) -> u32;
    fn line_count(&self) -> u32;
    fn source_start(&self) -> u32;
    fn source_length(&self) -> u32;
}

/// What the runtime reports when a compilation completes.
pub struct RawCompilation {
    pub scripts: Vec<Arc<dyn DebuggeeScript>>,
    /// The compiler's serialized graph for this compilation.
    pub json: String,
}

impl RawCompilation {
    /// Copies the script metadata out of the live handles.
    pub fn registered_scripts(&self) -> Vec<Script> {
        self.scripts
            .iter()
            .map(|script| register_script(script.as_ref()))
            .collect()
    }
}

pub fn register_script(script: &dyn DebuggeeScript) -> Script {
    Script {
        display_name: script.display_name(),
        url: script.url(),
        start_line: script.start_line(),
        line_count: script.line_count(),
        source_start: script.source_start(),
        source_length: script.source_length(),
    }
}

/// Handle the runtime fires once per completed compilation.
///
/// Compilations are queued in firing order. Once the actor that installed
/// the hook has detached, firing is a no-op and returns `false`.
#[derive(Clone)]
pub struct CompilationHook {
    tx: mpsc::UnboundedSender<RawCompilation>,
}

impl CompilationHook {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<RawCompilation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn fire(&self, compilation: RawCompilation) -> bool {
        self.tx.send(compilation).is_ok()
    }
}
