//! Typed, defaulting access to server objects for streaming-server modules.
//!
//! [`ModuleUtils`] carries the state the helpers share: the text message
//! table, the server object, the log sink, the missing-preference verbosity
//! and this host's address. Build it once during module initialization and
//! hand out `&ModuleUtils`; all operations take `&self`.

use std::fmt;
use std::fs::File;
use std::io::{IoSlice, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ipcomp::{IpComponents, LocalAddress};
use crate::log::TracingSink;
use crate::{AttrId, GateCode, GateError, LogSink, ObjectRef, UtilsConfig, Verbosity};

mod attr;
mod profile;

pub use attr::Fill;

/// Well-known attribute names on server-managed objects.
pub mod names {
    pub const USER_NAME: &str = "qtssUserName";
    pub const USER_GROUPS: &str = "qtssUserGroups";
    pub const USER_RIGHTS: &str = "qtssUserRights";
    pub const USER_EXTENDED_RIGHTS: &str = "qtssUserExtendedRights";

    pub const SERVER_MODULE_OBJECTS: &str = "qtssSvrModuleObjects";
    pub const MODULE_NAME: &str = "qtssModName";
    pub const MODULE_PREFS: &str = "qtssModPrefs";
    pub const MODULE_ATTRIBUTES: &str = "qtssModAttributes";

    pub const MSG_NO_MESSAGE: &str = "qtssMsgNoMessage";
    pub const MSG_PREF_MISSING: &str = "qtssServerPrefMissing";
    pub const MSG_PREF_WRONG_TYPE: &str = "qtssServerPrefWrongType";
}

pub struct ModuleUtils {
    messages: Option<ObjectRef>,
    server: Option<ObjectRef>,
    sink: Arc<dyn LogSink>,
    missing_pref_verbosity: AtomicU8,
    local: LocalAddress,
}

impl fmt::Debug for ModuleUtils {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleUtils")
            .field("messages", &self.messages.is_some())
            .field("server", &self.server.is_some())
            .field("missing_pref_verbosity", &self.missing_pref_log_verbosity())
            .field("local", &self.local)
            .finish()
    }
}

impl Default for ModuleUtils {
    fn default() -> Self { Self::new() }
}

impl ModuleUtils {
    pub fn new() -> Self { Self::with_config(UtilsConfig::default(), Arc::new(TracingSink)) }

    pub fn with_config(cfg: UtilsConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            messages: None,
            server: None,
            sink,
            missing_pref_verbosity: AtomicU8::new(cfg.missing_pref_verbosity as u8),
            local: LocalAddress::new(cfg.local_address),
        }
    }

    /// Attaches the text message table used by [`ModuleUtils::log_error`].
    pub fn with_messages(mut self, messages: ObjectRef) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Attaches the server object used by the module lookups.
    pub fn with_server(mut self, server: ObjectRef) -> Self {
        self.server = Some(server);
        self
    }

    pub fn config(&self) -> UtilsConfig {
        UtilsConfig {
            missing_pref_verbosity: self.missing_pref_log_verbosity(),
            local_address: self.local.as_str().to_string(),
        }
    }

    pub fn set_missing_pref_log_verbosity(&self, verbosity: Verbosity) {
        self.missing_pref_verbosity.store(verbosity as u8, Ordering::Relaxed);
    }

    pub fn missing_pref_log_verbosity(&self) -> Verbosity {
        Verbosity::from_u8(self.missing_pref_verbosity.load(Ordering::Relaxed)).unwrap_or(Verbosity::Message)
    }

    pub fn local_address(&self) -> &LocalAddress { &self.local }

    /// True when `address` matches this context's local address.
    pub fn is_local(&self, address: &IpComponents<'_>) -> bool {
        address.is_local_to(&self.local)
    }

    /// Logs the message `message` from the text table, substituting up to two
    /// `%s` arguments. Falls back to the table's "no message" entry prefixed
    /// with the error number, then to the bare error number.
    pub fn log_error(
        &self,
        verbosity: Verbosity,
        message: AttrId,
        err_number: u32,
        arg1: Option<&str>,
        arg2: Option<&str>,
    ) {
        let args = [arg1.unwrap_or(""), arg2.unwrap_or("")];
        let text = match self.message_by_id(message) {
            Some(t) => format_template(&t, &args),
            None => match self.message_by_name(names::MSG_NO_MESSAGE) {
                Some(t) => format!("{err_number}: {}", format_template(&t, &args)),
                None => err_number.to_string(),
            },
        };
        self.sink.log(verbosity, &text);
    }

    pub fn log_error_str(&self, verbosity: Verbosity, message: &str) {
        self.sink.log(verbosity, message);
    }

    pub fn log_pref_error_str(&self, verbosity: Verbosity, preference: &str, message: &str) {
        self.sink.log(verbosity, &format!("Server preference {preference} {message}"));
    }

    fn message_by_id(&self, id: AttrId) -> Option<String> {
        let messages = self.messages.as_ref()?;
        messages.value_as_string(id, 0).ok().filter(|t| !t.is_empty())
    }

    fn message_by_name(&self, name: &str) -> Option<String> {
        let id = self.messages.as_ref()?.attr_id(name)?;
        self.message_by_id(id)
    }

    /// Logs a table message looked up by name, or `fallback` when the table lacks it.
    fn log_named(&self, verbosity: Verbosity, name: &str, fallback: &str, args: &[&str]) {
        let template = self.message_by_name(name);
        let text = format_template(template.as_deref().unwrap_or(fallback), args);
        self.sink.log(verbosity, &text);
    }
}

/// Replaces successive `%s` markers with `args`; missing args become empty.
fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut pieces = template.split("%s");
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }
    for piece in pieces {
        out.push_str(args.next().copied().unwrap_or(""));
        out.push_str(piece);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRead {
    Data { bytes: Vec<u8>, modified: SystemTime },
    /// The file was not modified after the given time; nothing was read.
    NotModified { modified: SystemTime },
}

impl FileRead {
    pub fn modified(&self) -> SystemTime {
        match self {
            Self::Data { modified, .. } | Self::NotModified { modified } => *modified,
        }
    }
}

/// Reads a whole file. With `mod_since`, a file whose modification time is not
/// newer (at one second granularity) is reported as `NotModified` unread.
pub fn read_entire_file(path: impl AsRef<Path>, mod_since: Option<SystemTime>) -> Result<FileRead, GateError> {
    let path = path.as_ref();
    let with_path = |e: std::io::Error| {
        let ctx = format!("{}: {e}", path.display());
        GateError::io(e).ctx(ctx)
    };

    let mut file = File::open(path).map_err(with_path)?;
    let meta = file.metadata().map_err(with_path)?;
    let modified = meta.modified().map_err(with_path)?;

    if let Some(since) = mod_since {
        if whole_secs(modified) <= whole_secs(since) {
            return Ok(FileRead::NotModified { modified });
        }
    }

    let len = file_len(meta.len())?;
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len).map_err(|_| GateError::alloc(len))?;
    file.read_to_end(&mut bytes).map_err(with_path)?;
    Ok(FileRead::Data { bytes, modified })
}

fn file_len(len: u64) -> Result<usize, GateError> {
    usize::try_from(len).map_err(|_| GateError::new(GateCode::Alloc).ctx(format_args!("{len} bytes")))
}

fn whole_secs(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Copies discontiguous spans into one buffer of exactly `total_len` bytes.
pub fn coalesce_vectors(vectors: &[IoSlice<'_>], total_len: usize) -> Result<Vec<u8>, GateError> {
    let sum: usize = vectors.iter().map(|v| v.len()).sum();
    if sum != total_len {
        return Err(GateError::new(GateCode::BadArgument).ctx(format_args!("spans hold {sum} bytes, expected {total_len}")));
    }

    let mut out = Vec::new();
    out.try_reserve_exact(total_len).map_err(|_| GateError::alloc(total_len))?;
    for v in vectors {
        out.extend_from_slice(v);
    }
    Ok(out)
}
